//! Storage Tries registry (spec §4.2): per-contract ephemeral tries keyed by
//! address. A trie is opened lazily, rooted at the account's current
//! `storageRoot`, on first mutation; later reads/writes under the same
//! address reuse it.

use std::collections::HashMap;

use tracing::debug;
use txcore_common::{Address, H256};

use crate::trie::Trie;

#[derive(Default)]
pub struct StorageTries {
    tries: HashMap<Address, Box<dyn Trie>>,
    checkpoints: Vec<HashMap<Address, Box<dyn Trie>>>,
}

impl std::fmt::Debug for StorageTries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageTries")
            .field("open_contracts", &self.tries.len())
            .finish()
    }
}

impl StorageTries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the per-contract trie for `addr`, opening one rooted at
    /// `storage_root` via `open` on first access.
    pub fn get_or_open(
        &mut self,
        addr: Address,
        storage_root: H256,
        open: impl FnOnce(H256) -> Box<dyn Trie>,
    ) -> &mut dyn Trie {
        self.tries.entry(addr).or_insert_with(|| open(storage_root)).as_mut()
    }

    pub fn get(&self, addr: Address) -> Option<&dyn Trie> {
        self.tries.get(&addr).map(|t| t.as_ref())
    }

    /// One nested savepoint across every currently-open storage trie,
    /// symmetric with `AccountCache::checkpoint`.
    pub fn checkpoint(&mut self) {
        let snapshot = self.tries.iter().map(|(a, t)| (*a, t.copy())).collect();
        self.checkpoints.push(snapshot);
    }

    pub fn commit(&mut self) {
        self.checkpoints.pop();
    }

    pub fn revert(&mut self) {
        if let Some(snapshot) = self.checkpoints.pop() {
            self.tries = snapshot;
        }
    }

    /// `commitContracts`: for every open contract trie, report its final
    /// root (so the caller can update `account.storageRoot` in the cache
    /// *before* committing the outer trie, preserving invariant 3), then
    /// drop the registry — storage tries live only until this is called.
    pub fn commit_contracts(&mut self, mut on_commit: impl FnMut(Address, H256)) {
        for (addr, trie) in self.tries.iter() {
            on_commit(*addr, trie.root());
        }
        debug!(contracts = self.tries.len(), "storage tries committed");
        self.tries.clear();
        self.checkpoints.clear();
    }

    /// `revertContracts`: discard every open trie without committing.
    pub fn revert_contracts(&mut self) {
        self.tries.clear();
        self.checkpoints.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::InMemoryTrie;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn get_or_open_opens_once_and_reuses() {
        let mut tries = StorageTries::new();
        let mut opens = 0;
        {
            let trie = tries.get_or_open(addr(1), H256::zero(), |_| {
                opens += 1;
                Box::new(InMemoryTrie::new())
            });
            trie.put(b"k".to_vec(), b"v".to_vec()).unwrap();
        }
        tries.get_or_open(addr(1), H256::zero(), |_| {
            opens += 1;
            Box::new(InMemoryTrie::new())
        });
        assert_eq!(opens, 1);
    }

    #[test]
    fn checkpoint_revert_restores_per_contract_contents() {
        let mut tries = StorageTries::new();
        tries
            .get_or_open(addr(1), H256::zero(), |_| Box::new(InMemoryTrie::new()))
            .put(b"k".to_vec(), b"1".to_vec())
            .unwrap();

        tries.checkpoint();
        tries
            .get_or_open(addr(1), H256::zero(), |_| Box::new(InMemoryTrie::new()))
            .put(b"k".to_vec(), b"2".to_vec())
            .unwrap();
        tries.revert();

        assert_eq!(
            tries.get(addr(1)).unwrap().get(b"k").unwrap(),
            Some(b"1".to_vec())
        );
    }

    #[test]
    fn commit_contracts_reports_each_root_and_clears_the_registry() {
        let mut tries = StorageTries::new();
        tries.get_or_open(addr(1), H256::zero(), |_| Box::new(InMemoryTrie::new()));
        tries.get_or_open(addr(2), H256::zero(), |_| Box::new(InMemoryTrie::new()));

        let mut committed = vec![];
        tries.commit_contracts(|a, root| committed.push((a, root)));
        committed.sort_by_key(|(a, _)| *a);

        assert_eq!(committed.len(), 2);
        assert!(tries.get(addr(1)).is_none());
    }

    #[test]
    fn revert_contracts_drops_everything_without_callback() {
        let mut tries = StorageTries::new();
        tries.get_or_open(addr(1), H256::zero(), |_| Box::new(InMemoryTrie::new()));
        tries.revert_contracts();
        assert!(tries.get(addr(1)).is_none());
    }
}
