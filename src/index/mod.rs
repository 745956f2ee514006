//! Durable, bucketed index cache for per-file derived data.
//!
//! Editor features over a large template tree repeatedly need derived data
//! for files on disk - for example, plugin metadata harvested from
//! companion PHP sources. Recomputing that on every access is wasteful, so
//! the [`IndexStore`] memoizes it durably: keyed by file path, validated by
//! modification time, partitioned into bucket files so no single persisted
//! file grows with the whole project.
//!
//! # Storage Layout
//!
//! Under a caller-supplied root directory:
//!
//! ```text
//! <storage root>/
//! ├── meta.json          # { "version": <schema version> }
//! └── index/
//!     ├── a1f.json       # one bucket: { "fileNodes": [[path, node], ...] }
//!     └── 9c2.json
//! ```
//!
//! A bucket's name is a short digest prefix of the file's *base name* (see
//! [`bucket_name_for`]) - a partitioning scheme, not content addressing. If
//! the persisted schema version differs from the configured one, the whole
//! bucket directory is wiped and recreated before any bucket is trusted.
//!
//! # Coordination
//!
//! - **Load de-duplication**: at most one load is in flight per bucket
//!   name; concurrent requesters wait on the same load instead of issuing
//!   duplicate reads, and all observe the same bucket object.
//! - **Coalesced writes**: bucket writes are debounced behind a quiet
//!   interval. A new update before the timer fires supersedes the pending
//!   state and restarts the timer; every writer in one window shares the
//!   outcome of the single eventual flush.
//! - **Sliding eviction**: each loaded bucket sits under a TTL timer that
//!   resets on access. Expiry drops the in-memory copy only - the backing
//!   file is untouched and the bucket reloads transparently on next use.
//!
//! # Error Policy
//!
//! The store is an accelerator, not a system of record. Absence and error
//! are indistinguishable to callers: a missing file, an unreadable bucket,
//! or a failed stat all surface as a cache miss, never as a failure. A
//! failed flush resolves its [`FlushSignal`] as `false` and leaves the
//! in-memory state authoritative until a later flush succeeds.
//!
//! # Consumer Contract
//!
//! ```rust,no_run
//! use smartyls::index::IndexStore;
//! use std::path::Path;
//!
//! # async fn example() {
//! let store: IndexStore<Vec<String>> = IndexStore::open("/var/cache/smarty-ls", 1).await;
//!
//! let path = Path::new("plugins/modifier.escape.php");
//! let mut node = store.get_entry(path).await;
//! if node.data.is_none() {
//!     // Miss: compute fresh data, then write it back.
//!     node.data = Some(vec!["escape".to_string()]);
//!     let signal = store.put_entry(path, node).await;
//!     let _persisted = signal.outcome().await;
//! }
//! # }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{Notify, watch};

pub mod bucket;
pub mod error;

pub use bucket::{CacheNode, bucket_name_for};
pub use error::StoreError;

use bucket::{Bucket, BucketFile};

/// Quiet interval before a pending bucket write is flushed.
const DEFAULT_FLUSH_DELAY: Duration = Duration::from_secs(1);

/// Idle time before a loaded bucket is dropped from memory.
const DEFAULT_BUCKET_TTL: Duration = Duration::from_secs(300);

/// Persisted store metadata.
#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    version: u32,
}

/// A loaded-or-loading slot in the bucket map.
///
/// The `Loading` state carries the notifier the loading task triggers on
/// completion, so concurrent requesters wait instead of issuing duplicate
/// reads (and never misclassify a loading bucket as absent).
enum BucketSlot<T> {
    Loading(Arc<Notify>),
    Ready(Arc<Bucket<T>>),
}

impl<T> Clone for BucketSlot<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Loading(notify) => Self::Loading(Arc::clone(notify)),
            Self::Ready(bucket) => Self::Ready(Arc::clone(bucket)),
        }
    }
}

/// One pending coalesced write: the latest bucket state, the shared outcome
/// channel, and a generation counter. Each scheduled flush captures the
/// generation it was spawned for; a superseding update bumps the counter,
/// so a stale timer finds the mismatch and yields the flush to the newest
/// one. This is the only form of cancellation - there is no abort path that
/// could kill a write midway.
struct PendingWrite<T> {
    bucket: Arc<Bucket<T>>,
    done: watch::Sender<Option<bool>>,
    generation: u64,
}

/// Outcome handle for a scheduled bucket flush.
///
/// Every write that lands in the same coalescing window receives a signal
/// resolving to the same result. Dropping the signal is fine - the flush
/// happens regardless.
pub struct FlushSignal {
    rx: watch::Receiver<Option<bool>>,
}

impl FlushSignal {
    /// Wait for the flush this write was coalesced into and return whether
    /// it persisted successfully.
    pub async fn outcome(mut self) -> bool {
        match self.rx.wait_for(Option::is_some).await {
            Ok(value) => (*value).unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// Durable bucketed cache of per-file derived data.
///
/// See the [module docs](self) for layout, coordination, and the consumer
/// contract. The store is cheap to clone; clones share all state.
pub struct IndexStore<T> {
    storage_dir: PathBuf,
    index_dir: PathBuf,
    version: u32,
    flush_delay: Duration,
    bucket_ttl: Duration,
    buckets: Arc<DashMap<String, BucketSlot<T>>>,
    pending_writes: Arc<DashMap<String, PendingWrite<T>>>,
}

impl<T> Clone for IndexStore<T> {
    fn clone(&self) -> Self {
        Self {
            storage_dir: self.storage_dir.clone(),
            index_dir: self.index_dir.clone(),
            version: self.version,
            flush_delay: self.flush_delay,
            bucket_ttl: self.bucket_ttl,
            buckets: Arc::clone(&self.buckets),
            pending_writes: Arc::clone(&self.pending_writes),
        }
    }
}

impl<T> IndexStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Open a store over `storage_dir` with the default timing.
    ///
    /// Never fails: an initialization error is logged and the store
    /// degrades to a memory-only cache (reads miss, flushes report
    /// failure) rather than refusing to operate.
    pub async fn open(storage_dir: impl Into<PathBuf>, version: u32) -> Self {
        Self::with_timing(storage_dir, version, DEFAULT_FLUSH_DELAY, DEFAULT_BUCKET_TTL).await
    }

    /// Open a store with explicit flush-delay and eviction-TTL intervals.
    ///
    /// Embedders and tests use this to tighten the timing; semantics are
    /// identical to [`open`](Self::open).
    pub async fn with_timing(
        storage_dir: impl Into<PathBuf>,
        version: u32,
        flush_delay: Duration,
        bucket_ttl: Duration,
    ) -> Self {
        let storage_dir = storage_dir.into();
        let index_dir = storage_dir.join("index");
        let store = Self {
            storage_dir,
            index_dir,
            version,
            flush_delay,
            bucket_ttl,
            buckets: Arc::new(DashMap::new()),
            pending_writes: Arc::new(DashMap::new()),
        };
        match store.init_storage().await {
            Ok(()) => {
                tracing::debug!("Index storage ready at {}", store.storage_dir.display());
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to set up index storage at {}: {err:#}",
                    store.storage_dir.display()
                );
            }
        }
        store
    }

    /// The configured schema version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The storage root this store owns.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Look up the cache node for `file_path`.
    ///
    /// Stats the file first (a stat failure falls back to "now", which
    /// guarantees a miss rather than an error), then consults the file's
    /// bucket. An exact modification-time match returns the stored node;
    /// anything else returns a fresh empty node already carrying the right
    /// bucket name and current modification time, ready to be populated and
    /// passed to [`put_entry`](Self::put_entry).
    pub async fn get_entry(&self, file_path: &Path) -> CacheNode<T> {
        let mtime_ms = match fs::metadata(file_path).await.and_then(|meta| meta.modified()) {
            Ok(modified) => system_time_ms(modified),
            Err(err) => {
                tracing::warn!("Failed to stat {}: {err}", file_path.display());
                system_time_ms(SystemTime::now())
            }
        };

        let bucket_name = bucket_name_for(file_path);
        let bucket = self.bucket(&bucket_name).await;

        let key = node_key(file_path);
        {
            let nodes = bucket.nodes.lock().await;
            if let Some(node) = nodes.get(&key) {
                if node.file_modified_time_ms == mtime_ms {
                    return node.clone();
                }
            }
        }

        CacheNode {
            file_modified_time_ms: mtime_ms,
            bucket_name,
            data: None,
        }
    }

    /// Merge `node` into its bucket and schedule a coalesced write.
    ///
    /// The returned [`FlushSignal`] resolves with the outcome of the single
    /// flush shared by every write in the current quiet window.
    pub async fn put_entry(&self, file_path: &Path, node: CacheNode<T>) -> FlushSignal {
        let bucket_name = node.bucket_name.clone();
        let bucket = self.bucket(&bucket_name).await;
        bucket.nodes.lock().await.insert(node_key(file_path), node);
        self.queue_flush(bucket_name, bucket)
    }

    /// Ensure the storage root, bucket directory, and metadata exist and
    /// agree on the schema version. Absence, a mismatched version, or
    /// unreadable metadata all wipe and recreate the bucket directory.
    async fn init_storage(&self) -> Result<()> {
        fs::create_dir_all(&self.index_dir).await.with_context(|| {
            format!("failed to create index directory {}", self.index_dir.display())
        })?;

        let meta_path = self.meta_path();
        let persisted = match fs::read(&meta_path).await {
            Ok(bytes) => serde_json::from_slice::<StoreMeta>(&bytes).ok(),
            Err(_) => None,
        };

        match persisted {
            Some(meta) if meta.version == self.version => {}
            stale => {
                if stale.is_some() {
                    tracing::info!(
                        "Index schema version changed, rebuilding {}",
                        self.index_dir.display()
                    );
                }
                fs::remove_dir_all(&self.index_dir).await.with_context(|| {
                    format!("failed to clear index directory {}", self.index_dir.display())
                })?;
                fs::create_dir_all(&self.index_dir).await.with_context(|| {
                    format!("failed to recreate index directory {}", self.index_dir.display())
                })?;
                let json = serde_json::to_vec(&StoreMeta { version: self.version })
                    .context("failed to encode index metadata")?;
                fs::write(&meta_path, json)
                    .await
                    .with_context(|| format!("failed to write {}", meta_path.display()))?;
            }
        }

        Ok(())
    }

    fn meta_path(&self) -> PathBuf {
        self.storage_dir.join("meta.json")
    }

    fn bucket_path(&self, bucket_name: &str) -> PathBuf {
        self.index_dir.join(format!("{bucket_name}.json"))
    }

    /// Get the named bucket, loading it if necessary.
    ///
    /// At most one load runs per bucket name; every other requester waits
    /// on the loader's notifier and then observes the same bucket object.
    /// Every access (hit or fresh load) restarts the sliding eviction
    /// timer.
    async fn bucket(&self, name: &str) -> Arc<Bucket<T>> {
        loop {
            let slot = self.buckets.get(name).map(|entry| entry.value().clone());
            match slot {
                Some(BucketSlot::Ready(bucket)) => {
                    self.reset_purge_timer(name, &bucket).await;
                    return bucket;
                }
                Some(BucketSlot::Loading(notify)) => {
                    let notified = notify.notified();
                    tokio::pin!(notified);
                    notified.as_mut().enable();
                    // The load may have finished between the lookup and the
                    // wait registration; re-check before sleeping.
                    if let Some(BucketSlot::Ready(bucket)) =
                        self.buckets.get(name).map(|entry| entry.value().clone())
                    {
                        self.reset_purge_timer(name, &bucket).await;
                        return bucket;
                    }
                    notified.await;
                    continue;
                }
                None => {}
            }

            // Claim the load; if another task claimed it first, start over
            // and wait on that load instead.
            let notify = Arc::new(Notify::new());
            match self.buckets.entry(name.to_string()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(vacant) => {
                    vacant.insert(BucketSlot::Loading(Arc::clone(&notify)));
                }
            }

            let bucket = Arc::new(self.load_bucket(name).await);
            self.buckets
                .insert(name.to_string(), BucketSlot::Ready(Arc::clone(&bucket)));
            notify.notify_waiters();
            self.reset_purge_timer(name, &bucket).await;
            return bucket;
        }
    }

    /// Read a bucket file into memory. A missing, unreadable, or malformed
    /// file is an absent bucket, never an error.
    async fn load_bucket(&self, name: &str) -> Bucket<T> {
        let path = self.bucket_path(name);
        let nodes = match read_bucket_file::<T>(&path).await {
            Ok(nodes) => nodes,
            Err(StoreError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                HashMap::new()
            }
            Err(err) => {
                tracing::warn!("Treating bucket {name} as absent: {err}");
                HashMap::new()
            }
        };
        Bucket::new(nodes)
    }

    /// Restart the sliding eviction timer on `bucket`.
    async fn reset_purge_timer(&self, name: &str, bucket: &Arc<Bucket<T>>) {
        let mut timer = bucket.purge_timer.lock().await;
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        let buckets = Arc::clone(&self.buckets);
        let ttl = self.bucket_ttl;
        let name = name.to_string();
        let this_bucket = Arc::downgrade(bucket);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            // Drop the in-memory copy only if this bucket still owns the
            // slot; the backing file is untouched either way.
            buckets.remove_if(&name, |_, slot| match slot {
                BucketSlot::Ready(current) => this_bucket
                    .upgrade()
                    .is_some_and(|bucket| Arc::ptr_eq(current, &bucket)),
                BucketSlot::Loading(_) => false,
            });
        }));
    }

    /// Schedule a coalesced flush for `name`, superseding any pending one.
    fn queue_flush(&self, name: String, bucket: Arc<Bucket<T>>) -> FlushSignal {
        let generation;
        let rx;
        match self.pending_writes.entry(name.clone()) {
            Entry::Occupied(mut occupied) => {
                let pending = occupied.get_mut();
                // Last write wins: replace the held state and restart the
                // quiet window; all writers share one outcome.
                pending.bucket = bucket;
                pending.generation += 1;
                generation = pending.generation;
                rx = pending.done.subscribe();
            }
            Entry::Vacant(vacant) => {
                let (tx, first_rx) = watch::channel(None);
                vacant.insert(PendingWrite {
                    bucket,
                    done: tx,
                    generation: 0,
                });
                generation = 0;
                rx = first_rx;
            }
        }
        self.spawn_flush(name, generation);
        FlushSignal { rx }
    }

    fn spawn_flush(&self, name: String, generation: u64) {
        let pending_writes = Arc::clone(&self.pending_writes);
        let path = self.bucket_path(&name);
        let delay = self.flush_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A superseding update bumped the generation; the newest timer
            // owns the flush and this one stands down.
            let Some((_, pending)) =
                pending_writes.remove_if(&name, |_, pending| pending.generation == generation)
            else {
                return;
            };
            let outcome = flush_bucket(&path, &pending.bucket).await;
            if let Err(err) = &outcome {
                tracing::warn!("Failed to persist bucket {}: {err}", path.display());
            }
            let _ = pending.done.send(Some(outcome.is_ok()));
        });
    }
}

/// Path-to-key normalization for the in-memory and persisted node maps.
fn node_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn system_time_ms(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as u64
}

async fn read_bucket_file<T>(path: &Path) -> Result<HashMap<String, CacheNode<T>>, StoreError>
where
    T: DeserializeOwned,
{
    let bytes = fs::read(path).await.map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: BucketFile<T> =
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Format {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(file.file_nodes.into_iter().collect())
}

async fn flush_bucket<T>(path: &Path, bucket: &Bucket<T>) -> Result<(), StoreError>
where
    T: Serialize + Clone,
{
    let payload = {
        let nodes = bucket.nodes.lock().await;
        let file = BucketFile {
            file_nodes: nodes
                .iter()
                .map(|(path, node)| (path.clone(), node.clone()))
                .collect(),
        };
        serde_json::to_vec(&file).map_err(|source| StoreError::Format {
            path: path.to_path_buf(),
            source,
        })?
    };
    fs::write(path, payload).await.map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
