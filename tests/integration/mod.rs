//! Integration test suite for smartyls
//!
//! End-to-end scenarios that cross module boundaries or touch real storage
//! roots on disk:
//! - **analysis**: scanning a realistic template and querying the snapshot
//! - **store**: index store lifecycles across instances - round-trips,
//!   invalidation, schema bumps, write coalescing, eviction
//!
//! Run with:
//!
//! ```bash
//! cargo test --test integration
//! ```

mod analysis;
mod store;

/// Opt-in log output while debugging a test run:
/// `RUST_LOG=smartyls=debug cargo test --test integration`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
