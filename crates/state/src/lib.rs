pub mod cache;
pub mod error;
pub mod manager;
pub mod storage_tries;
pub mod trie;

pub use cache::{AccountCache, FlushOp};
pub use error::StateError;
pub use manager::StateManager;
pub use storage_tries::StorageTries;
pub use trie::{InMemoryTrie, Trie};

/// Installs a `tracing-subscriber` once per test binary, so the
/// checkpoint/commit/revert `debug!` events emitted by this crate show up
/// under `RUST_LOG=debug cargo test -- --nocapture` the way they would from
/// a real node's logs.
#[cfg(test)]
pub(crate) fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
