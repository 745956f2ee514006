//! Index store lifecycles over real storage roots.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use smartyls::index::{IndexStore, bucket_name_for};
use tempfile::tempdir;

/// Stand-in for harvested plugin metadata, the store's real consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PluginMeta {
    name: String,
    attrs: Vec<String>,
}

fn tooltip_meta() -> PluginMeta {
    PluginMeta {
        name: "tooltip".to_string(),
        attrs: vec!["text".to_string(), "delay".to_string()],
    }
}

const FLUSH: Duration = Duration::from_millis(50);
const TTL: Duration = Duration::from_secs(300);

async fn open_store(root: &Path) -> IndexStore<PluginMeta> {
    crate::init_tracing();
    IndexStore::with_timing(root, 1, FLUSH, TTL).await
}

fn bucket_file(root: &Path, source: &Path) -> PathBuf {
    root.join("index").join(format!("{}.json", bucket_name_for(source)))
}

#[tokio::test]
async fn test_round_trip_across_store_instances() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("storage");
    let source = temp.path().join("function.tooltip.php");
    std::fs::write(&source, "<?php function smarty_function_tooltip() {}").unwrap();

    let store = open_store(&root).await;
    let mut node = store.get_entry(&source).await;
    assert!(node.data.is_none());
    node.data = Some(tooltip_meta());
    let signal = store.put_entry(&source, node.clone()).await;
    assert!(signal.outcome().await);

    // A fresh instance over the same root sees the persisted node as long
    // as the file's modification time is unchanged.
    let reopened = open_store(&root).await;
    let cached = reopened.get_entry(&source).await;
    assert_eq!(cached.data, Some(tooltip_meta()));
    assert_eq!(cached.bucket_name, node.bucket_name);
}

#[tokio::test]
async fn test_modified_file_invalidates_node() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("storage");
    let source = temp.path().join("modifier.escape.php");
    std::fs::write(&source, "<?php").unwrap();

    let store = open_store(&root).await;
    let mut node = store.get_entry(&source).await;
    node.data = Some(tooltip_meta());
    assert!(store.put_entry(&source, node).await.outcome().await);

    // Move the file's modification time forward; the stale node must not
    // be returned even though it still sits in the bucket.
    let file = std::fs::File::options().write(true).open(&source).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(5)).unwrap();

    let cached = store.get_entry(&source).await;
    assert!(cached.data.is_none());
}

#[tokio::test]
async fn test_schema_version_bump_wipes_buckets() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("storage");
    let source = temp.path().join("block.panel.php");
    std::fs::write(&source, "<?php").unwrap();

    let store = open_store(&root).await;
    let mut node = store.get_entry(&source).await;
    node.data = Some(tooltip_meta());
    assert!(store.put_entry(&source, node).await.outcome().await);
    assert!(bucket_file(&root, &source).exists());

    let upgraded: IndexStore<PluginMeta> =
        IndexStore::with_timing(&root, 2, FLUSH, TTL).await;
    assert_eq!(upgraded.version(), 2);

    let remaining: Vec<_> = std::fs::read_dir(root.join("index")).unwrap().collect();
    assert!(remaining.is_empty());
    let meta = std::fs::read_to_string(root.join("meta.json")).unwrap();
    assert_eq!(meta, "{\"version\":2}");

    let cached = upgraded.get_entry(&source).await;
    assert!(cached.data.is_none());
}

#[tokio::test]
async fn test_rapid_writes_coalesce_into_one_flush() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("storage");
    let source = temp.path().join("function.nav.php");
    std::fs::write(&source, "<?php").unwrap();

    // Generous quiet interval so all writes land in one window.
    let store: IndexStore<PluginMeta> =
        IndexStore::with_timing(&root, 1, Duration::from_millis(300), TTL).await;

    let template = store.get_entry(&source).await;
    let mut signals = Vec::new();
    for revision in 0..5 {
        let mut node = template.clone();
        node.data = Some(PluginMeta {
            name: format!("rev{revision}"),
            attrs: Vec::new(),
        });
        signals.push(store.put_entry(&source, node).await);
    }

    // Nothing hits the disk inside the quiet window.
    assert!(!bucket_file(&root, &source).exists());

    // Every writer in the window shares the single flush's outcome.
    for signal in signals {
        assert!(signal.outcome().await);
    }

    let json = std::fs::read_to_string(bucket_file(&root, &source)).unwrap();
    assert!(json.contains("rev4"));
    assert!(!json.contains("rev0"));
}

#[tokio::test]
async fn test_eviction_drops_memory_only_and_reloads_from_disk() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("storage");
    let source = temp.path().join("compiler.widget.php");
    std::fs::write(&source, "<?php").unwrap();

    let store: IndexStore<PluginMeta> =
        IndexStore::with_timing(&root, 1, Duration::from_millis(20), Duration::from_millis(100))
            .await;

    let mut node = store.get_entry(&source).await;
    node.data = Some(tooltip_meta());
    assert!(store.put_entry(&source, node).await.outcome().await);

    // Doctor the persisted bucket behind the store's back, then wait for
    // the in-memory copy to be evicted.
    let path = bucket_file(&root, &source);
    let doctored = std::fs::read_to_string(&path).unwrap().replace("tooltip", "patched");
    std::fs::write(&path, doctored).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The next access reloads from disk, proving the eviction dropped the
    // bucket from memory without touching the file.
    let cached = store.get_entry(&source).await;
    assert_eq!(cached.data.unwrap().name, "patched");
}

#[tokio::test]
async fn test_missing_file_is_a_miss_not_an_error() {
    let temp = tempdir().unwrap();
    let store = open_store(&temp.path().join("storage")).await;

    let node = store.get_entry(Path::new("/definitely/not/here.php")).await;
    assert!(node.data.is_none());
    assert_eq!(node.bucket_name, bucket_name_for(Path::new("here.php")));
}

#[tokio::test]
async fn test_corrupt_bucket_file_treated_as_absent() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("storage");
    let source = temp.path().join("prefilter.trim.php");
    std::fs::write(&source, "<?php").unwrap();

    {
        let store = open_store(&root).await;
        let mut node = store.get_entry(&source).await;
        node.data = Some(tooltip_meta());
        assert!(store.put_entry(&source, node).await.outcome().await);
    }
    std::fs::write(bucket_file(&root, &source), "{ not json").unwrap();

    let reopened = open_store(&root).await;
    let cached = reopened.get_entry(&source).await;
    assert!(cached.data.is_none());
}
