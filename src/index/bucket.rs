//! Cache nodes, in-memory buckets, and the on-disk bucket format.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Length of a bucket name: a short digest prefix, giving a small, fixed
/// universe of bucket files regardless of project size.
pub const BUCKET_NAME_LEN: usize = 3;

/// The last known state for one file path inside one bucket.
///
/// `data` is the memoized payload; a node returned by the store with
/// `data: None` is a miss that the caller populates and writes back. The
/// node carries its own bucket name so a write-back lands in the bucket the
/// lookup came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheNode<T> {
    /// Modification time of the source file, in milliseconds since the
    /// Unix epoch, at the moment the node was produced.
    pub file_modified_time_ms: u64,
    /// Name of the bucket this node belongs to.
    #[serde(rename = "cacheBlockName")]
    pub bucket_name: String,
    /// Memoized payload, if the node has been populated.
    pub data: Option<T>,
}

/// One in-memory bucket: the path-to-node map plus its sliding eviction
/// timer. Shared behind an `Arc`; the pending-write machinery holds the
/// same allocation, so an eviction never loses state queued for flush.
pub(crate) struct Bucket<T> {
    pub(crate) nodes: Mutex<HashMap<String, CacheNode<T>>>,
    pub(crate) purge_timer: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Bucket<T> {
    pub(crate) fn new(nodes: HashMap<String, CacheNode<T>>) -> Self {
        Self {
            nodes: Mutex::new(nodes),
            purge_timer: Mutex::new(None),
        }
    }
}

/// On-disk shape of one bucket file: a plain list of path/node pairs, so
/// the persisted form stays an ordinary JSON document rather than a keyed
/// map with path-shaped keys.
#[derive(Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub(crate) struct BucketFile<T> {
    #[serde(rename = "fileNodes", default)]
    pub(crate) file_nodes: Vec<(String, CacheNode<T>)>,
}

/// Bucket name for a file path: the first [`BUCKET_NAME_LEN`] hex
/// characters of a digest of the *base name*. This is partitioning, not
/// content addressing - unrelated files routinely share a bucket, and the
/// same base name under different directories always does.
pub fn bucket_name_for(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let digest = Sha256::digest(base.as_bytes());
    hex::encode(digest)[..BUCKET_NAME_LEN].to_string()
}
