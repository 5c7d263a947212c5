//! The `Trie` collaborator contract (spec §6): an authenticated K/V store
//! with checkpoint/commit/revert and a cheap `copy`. The real
//! Merkle-Patricia implementation is out of scope for this crate (spec §1);
//! what lives here is the trait boundary plus an in-memory reference
//! implementation used by tests and by the storage-tries registry.

use std::collections::HashMap;

use txcore_common::H256;

use crate::error::StateError;

/// Authenticated K/V collaborator. Keys and values are opaque byte strings —
/// RLP encoding of accounts/storage words happens above this boundary.
pub trait Trie: std::fmt::Debug {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError>;
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StateError>;
    fn delete(&mut self, key: &[u8]) -> Result<(), StateError>;

    fn checkpoint(&mut self);
    fn commit(&mut self);
    fn revert(&mut self);

    /// A clone of this trie, diverging independently from this point
    /// forward. A real Merkle-Patricia trie shares unmodified subtrees by
    /// node hash, making this O(1)-ish; the in-memory reference
    /// implementation below pays an O(n) copy instead.
    fn copy(&self) -> Box<dyn Trie>;

    fn root(&self) -> H256;
}

/// Reference `Trie` used by tests: a plain map plus a checkpoint stack of
/// full snapshots, mirroring the Account Cache's "snapshot the whole table"
/// style rather than a fine-grained diff log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTrie {
    entries: HashMap<Vec<u8>, Vec<u8>>,
    checkpoints: Vec<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic "root" derived from the sorted key/value pairs —
    /// stands in for a real Merkle root (out of scope here) while still
    /// changing whenever the trie's contents change, which is all the
    /// invariants in spec §8 actually require.
    fn compute_root(&self) -> H256 {
        let mut pairs: Vec<_> = self.entries.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        let mut buf = Vec::new();
        for (k, v) in pairs {
            buf.extend_from_slice(&(k.len() as u32).to_be_bytes());
            buf.extend_from_slice(k);
            buf.extend_from_slice(&(v.len() as u32).to_be_bytes());
            buf.extend_from_slice(v);
        }
        txcore_common::keccak(&buf)
    }
}

impl Trie for InMemoryTrie {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StateError> {
        self.entries.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.entries.remove(key);
        Ok(())
    }

    fn checkpoint(&mut self) {
        self.checkpoints.push(self.entries.clone());
    }

    fn commit(&mut self) {
        // Always paired with a prior checkpoint(); an unmatched call is a
        // programming error and silently does nothing.
        self.checkpoints.pop();
    }

    fn revert(&mut self) {
        if let Some(snapshot) = self.checkpoints.pop() {
            self.entries = snapshot;
        }
    }

    fn copy(&self) -> Box<dyn Trie> {
        Box::new(self.clone())
    }

    fn root(&self) -> H256 {
        self.compute_root()
    }
}
