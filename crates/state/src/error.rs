use txcore_common::Address;

/// Errors surfaced by the cache/trie/storage-tries layers. Per spec §7,
/// these are storage-layer failures: they propagate and abort the
/// transaction, unlike frame exceptions which are absorbed locally.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// `get` was called on an address that was never warmed or loaded.
    /// Callers must use `get_or_load` or precede with `warm_cache`.
    #[error("cache miss for address {0:#x}: address was never warmed or loaded")]
    CacheMiss(Address),
    #[error("trie operation failed: {0}")]
    Trie(String),
}
