//! State Manager (spec §4.3): the unified facade the Call Executor and
//! Transaction Executor talk to. Internally fans out to the Account Cache,
//! the outer trie, and the Storage Tries registry, and coordinates their
//! checkpoint/commit/revert as one "transactional memory" unit rather than
//! exposing each layer's own checkpoint call separately.

use tracing::debug;
use txcore_common::{Account, Address, BlockHashSource, H256, U256};

use crate::cache::{AccountCache, FlushOp};
use crate::error::StateError;
use crate::storage_tries::StorageTries;
use crate::trie::Trie;

pub struct StateManager {
    trie: Box<dyn Trie>,
    cache: AccountCache,
    storage_tries: StorageTries,
    /// Auxiliary code region, keyed by codeHash. Content-addressed, so
    /// writes are naturally idempotent and need no checkpoint/revert of
    /// their own.
    code: std::collections::HashMap<H256, Vec<u8>>,
    blockchain: Box<dyn BlockHashSource>,
    /// Depth of the checkpoint stack; used only for logging.
    depth: usize,
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("checkpoint_depth", &self.depth)
            .finish()
    }
}

fn account_key(addr: Address) -> Vec<u8> {
    addr.as_bytes().to_vec()
}

fn storage_key(key: H256) -> Vec<u8> {
    key.as_bytes().to_vec()
}

impl StateManager {
    pub fn new(trie: Box<dyn Trie>, blockchain: Box<dyn BlockHashSource>) -> Self {
        Self {
            trie,
            cache: AccountCache::new(),
            storage_tries: StorageTries::new(),
            code: std::collections::HashMap::new(),
            blockchain,
            depth: 0,
        }
    }

    /// Never fails on a missing key — yields a zero account (spec §4.3).
    pub fn get_account(&mut self, addr: Address) -> Account {
        let trie = &self.trie;
        self.cache.get_or_load(addr, || {
            trie.get(&account_key(addr))
                .ok()
                .flatten()
                .and_then(|bytes| rlp::decode::<Account>(&bytes).ok())
        })
    }

    pub fn put_account(&mut self, addr: Address, account: Account) {
        self.cache.put(addr, account, false);
    }

    /// Atomic read-modify-write of the nonce via the cache.
    pub fn increment_account_nonce(&mut self, addr: Address) -> Account {
        let mut account = self.get_account(addr);
        account.nonce += 1;
        self.put_account(addr, account);
        account
    }

    /// Updates only the balance field, preserving the rest. Callers must
    /// check sufficiency before calling; a negative result is a programming
    /// error, not something this layer defends against (spec §4.3).
    pub fn put_account_balance(&mut self, addr: Address, mut account: Account, new_balance: U256) {
        account.balance = new_balance;
        self.put_account(addr, account);
    }

    pub fn get_contract_code(&self, account: &Account) -> Vec<u8> {
        self.code.get(&account.code_hash).cloned().unwrap_or_default()
    }

    pub fn put_contract_code(&mut self, addr: Address, mut account: Account, bytes: Vec<u8>) {
        let hash = account.set_code_hash(&bytes);
        self.code.insert(hash, bytes);
        self.put_account(addr, account);
    }

    /// Reads from the per-contract storage trie rooted at the account's
    /// current `storageRoot`.
    pub fn get_contract_storage(&mut self, addr: Address, account: &Account, key: H256) -> U256 {
        let storage_root = account.storage_root;
        let trie = self
            .storage_tries
            .get_or_open(addr, storage_root, |_| Box::new(crate::trie::InMemoryTrie::new()));
        trie.get(&storage_key(key))
            .ok()
            .flatten()
            .map(|bytes| U256::from_big_endian(&bytes))
            .unwrap_or_else(U256::zero)
    }

    /// Writes to the per-contract storage trie and updates
    /// `account.storageRoot` in the cache. The account is always re-read
    /// fresh from the cache at the write site rather than trusting a
    /// caller-supplied copy, so the trie/cache storageRoot can never drift
    /// (spec §9: replaces the source's debug-log-on-mismatch pattern).
    pub fn put_contract_storage(&mut self, addr: Address, key: H256, value: U256) {
        let mut account = self.get_account(addr);
        let storage_root = account.storage_root;
        let trie = self
            .storage_tries
            .get_or_open(addr, storage_root, |_| Box::new(crate::trie::InMemoryTrie::new()));
        if value.is_zero() {
            trie.delete(&storage_key(key)).expect("in-memory trie delete is infallible");
        } else {
            let mut bytes = [0u8; 32];
            value.to_big_endian(&mut bytes);
            trie.put(storage_key(key), bytes.to_vec())
                .expect("in-memory trie put is infallible");
        }
        account.storage_root = trie.root();
        self.put_account(addr, account);
    }

    /// Removes an address from the cache outright (used both by the tx-end
    /// suicide sweep and by the Call Executor's zero-balance failed-creation
    /// cleanup, spec §4.4 step 7).
    pub fn delete_account(&mut self, addr: Address) {
        self.cache.delete(addr);
    }

    pub fn get_block_hash_by_number(&self, number: u64) -> H256 {
        self.blockchain.block_hash_by_number(number)
    }

    /// Swaps in a different blockchain collaborator, returning the
    /// previous one. Lets a single call override the handle configured at
    /// construction time (spec §6's `blockchain` configuration option).
    pub fn set_block_hash_source(
        &mut self,
        source: Box<dyn BlockHashSource>,
    ) -> Box<dyn BlockHashSource> {
        std::mem::replace(&mut self.blockchain, source)
    }

    /// Bulk pre-load a set of addresses into the cache as warm+clean.
    pub fn warm_cache(&mut self, addrs: &[Address]) {
        for addr in addrs {
            let account = self
                .trie
                .get(&account_key(*addr))
                .ok()
                .flatten()
                .and_then(|bytes| rlp::decode::<Account>(&bytes).ok())
                .unwrap_or_else(Account::zero);
            self.cache.warm(*addr, account);
        }
    }

    /// One nested savepoint spanning the cache, the outer trie, and the
    /// storage-tries registry.
    pub fn checkpoint(&mut self) {
        self.cache.checkpoint();
        self.trie.checkpoint();
        self.storage_tries.checkpoint();
        self.depth += 1;
        debug!(depth = self.depth, "state checkpoint");
    }

    pub fn commit(&mut self) {
        self.cache.commit();
        self.trie.commit();
        self.storage_tries.commit();
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn revert(&mut self) {
        self.cache.revert();
        self.trie.revert();
        self.storage_tries.revert();
        self.depth = self.depth.saturating_sub(1);
        debug!(depth = self.depth, "state reverted to checkpoint");
    }

    /// Flushes every open contract's storage trie, updating the account's
    /// `storageRoot` in the cache *before* the outer trie commit so
    /// invariant 3 (`cache.storageRoot == storageTries[addr].root`) always
    /// holds when the outer trie is read.
    pub fn commit_contracts(&mut self) {
        let mut roots = vec![];
        self.storage_tries.commit_contracts(|addr, root| roots.push((addr, root)));
        for (addr, root) in roots {
            if let Ok(mut account) = self.cache.get(addr) {
                account.storage_root = root;
                self.cache.put(addr, account, false);
            }
        }
    }

    pub fn revert_contracts(&mut self) {
        self.storage_tries.revert_contracts();
    }

    /// Flushes the cache to the outer trie, then returns its root.
    pub fn get_state_root(&mut self) -> Result<H256, StateError> {
        let trie = &mut self.trie;
        self.cache.flush(|addr, op| match op {
            FlushOp::Put(account) => trie.put(account_key(addr), rlp::encode(&account).to_vec()),
            FlushOp::Delete => trie.delete(&account_key(addr)),
        })?;
        Ok(self.trie.root())
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::InMemoryTrie;
    use txcore_common::ZeroBlockHashSource;

    fn manager() -> StateManager {
        StateManager::new(Box::new(InMemoryTrie::new()), Box::new(ZeroBlockHashSource))
    }

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn get_account_never_fails_on_a_missing_key() {
        let mut m = manager();
        assert_eq!(m.get_account(addr(1)), Account::zero());
    }

    #[test]
    fn put_then_get_round_trips_modulo_fields() {
        let mut m = manager();
        let account = Account::zero().with_balance(U256::from(42));
        m.put_account(addr(1), account);
        assert_eq!(m.get_account(addr(1)), account);
    }

    #[test]
    fn increment_nonce_is_read_modify_write() {
        let mut m = manager();
        m.increment_account_nonce(addr(1));
        m.increment_account_nonce(addr(1));
        assert_eq!(m.get_account(addr(1)).nonce, 2);
    }

    #[test]
    fn warm_cache_then_flush_leaves_the_trie_root_unchanged() {
        let mut m = manager();
        let root_before = m.get_state_root().unwrap();
        m.warm_cache(&[addr(1), addr(2)]);
        let root_after = m.get_state_root().unwrap();
        assert_eq!(root_before, root_after);
    }

    #[test]
    fn checkpoint_revert_restores_the_state_root() {
        crate::init_tracing();
        let mut m = manager();
        m.put_account(addr(1), Account::zero().with_balance(U256::from(1)));
        let root_before = m.get_state_root().unwrap();

        m.checkpoint();
        m.put_account(addr(1), Account::zero().with_balance(U256::from(999)));
        m.revert();

        assert_eq!(m.get_state_root().unwrap(), root_before);
    }

    #[test]
    fn contract_storage_round_trips_and_updates_storage_root() {
        let mut m = manager();
        m.put_account(addr(1), Account::zero());
        let root_before = m.get_account(addr(1)).storage_root;

        m.put_contract_storage(addr(1), H256::from_low_u64_be(7), U256::from(123));
        let account = m.get_account(addr(1));
        assert_ne!(account.storage_root, root_before);
        assert_eq!(
            m.get_contract_storage(addr(1), &account, H256::from_low_u64_be(7)),
            U256::from(123)
        );
    }

    #[test]
    fn writing_zero_deletes_the_storage_slot() {
        let mut m = manager();
        m.put_account(addr(1), Account::zero());
        m.put_contract_storage(addr(1), H256::from_low_u64_be(7), U256::from(123));
        m.put_contract_storage(addr(1), H256::from_low_u64_be(7), U256::zero());
        let account = m.get_account(addr(1));
        assert_eq!(
            m.get_contract_storage(addr(1), &account, H256::from_low_u64_be(7)),
            U256::zero()
        );
    }

    #[test]
    fn commit_contracts_syncs_storage_root_before_the_outer_trie_commit() {
        let mut m = manager();
        m.put_account(addr(1), Account::zero());
        m.put_contract_storage(addr(1), H256::from_low_u64_be(1), U256::from(5));
        let root_from_put = m.get_account(addr(1)).storage_root;

        m.commit_contracts();
        assert_eq!(m.get_account(addr(1)).storage_root, root_from_put);
        assert!(m.storage_tries.get(addr(1)).is_none());
    }

    #[test]
    fn contract_code_round_trips() {
        let mut m = manager();
        let account = Account::zero();
        m.put_contract_code(addr(1), account, vec![0x60, 0x00]);
        let account = m.get_account(addr(1));
        assert!(account.is_contract());
        assert_eq!(m.get_contract_code(&account), vec![0x60, 0x00]);
    }

    #[test]
    fn block_hash_delegates_to_the_blockchain_collaborator() {
        let m = manager();
        assert_eq!(m.get_block_hash_by_number(5), H256::zero());
    }
}
