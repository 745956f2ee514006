//! Typed faults for index store internals.

use std::path::PathBuf;
use thiserror::Error;

/// Internal faults of the index store.
///
/// These are never surfaced to callers: the store resolves every fault to a
/// neutral outcome (an empty bucket, a failed flush signal, a degraded
/// initialization) and logs it. The typed variants keep those log lines
/// precise about what actually went wrong.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A bucket or metadata file could not be read.
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A bucket or metadata file could not be written.
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file held data that does not deserialize as index content.
    #[error("malformed index data in {path}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
