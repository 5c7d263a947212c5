//! Write-back Account Cache (spec §4.1): a layer in front of the
//! authenticated trie that lets the Call Executor and Transaction Executor
//! read/write accounts many times within a tx without paying a trie
//! round-trip for each access, and that rolls back atomically on a frame
//! exception.

use std::collections::HashMap;

use tracing::{debug, trace};
use txcore_common::{Account, Address};

use crate::error::StateError;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    account: Account,
    dirty: bool,
    deleted: bool,
    #[allow(dead_code)] // kept for parity with spec §3's cache-entry shape; not read once cached
    warm: bool,
}

/// What `flush` should do with a dirty entry.
#[derive(Debug, Clone, Copy)]
pub enum FlushOp {
    Put(Account),
    Delete,
}

#[derive(Debug, Default)]
pub struct AccountCache {
    entries: HashMap<Address, CacheEntry>,
    checkpoints: Vec<HashMap<Address, CacheEntry>>,
}

impl AccountCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `get(addr)` — must already be warmed or loaded; see `get_or_load`.
    pub fn get(&self, addr: Address) -> Result<Account, StateError> {
        self.entries
            .get(&addr)
            .filter(|e| !e.deleted)
            .map(|e| e.account)
            .ok_or(StateError::CacheMiss(addr))
    }

    /// Loads from the trie via `load` (deserialising "not found" as a fresh
    /// zero account) if not already cached, then returns the cached value.
    /// The loaded entry is cached warm+clean, matching `warmCache`'s
    /// contract that loading alone does not dirty an entry.
    pub fn get_or_load(
        &mut self,
        addr: Address,
        load: impl FnOnce() -> Option<Account>,
    ) -> Account {
        if let Some(entry) = self.entries.get(&addr).filter(|e| !e.deleted) {
            return entry.account;
        }
        let account = load().unwrap_or_else(Account::zero);
        trace!(?addr, "account cache miss, loaded from trie");
        self.entries.insert(
            addr,
            CacheEntry {
                account,
                dirty: false,
                deleted: false,
                warm: true,
            },
        );
        account
    }

    pub fn put(&mut self, addr: Address, account: Account, warm: bool) {
        self.entries.insert(
            addr,
            CacheEntry {
                account,
                dirty: true,
                deleted: false,
                warm,
            },
        );
    }

    /// Bulk pre-load: caches each address as warm+clean without marking it
    /// dirty, per spec §4.3 `warmCache`.
    pub fn warm(&mut self, addr: Address, account: Account) {
        self.entries.entry(addr).or_insert(CacheEntry {
            account,
            dirty: false,
            deleted: false,
            warm: true,
        });
    }

    /// Marks the address for removal; `flush` will delete the trie key.
    pub fn delete(&mut self, addr: Address) {
        self.entries.insert(
            addr,
            CacheEntry {
                account: Account::zero(),
                dirty: true,
                deleted: true,
                warm: true,
            },
        );
    }

    pub fn checkpoint(&mut self) {
        self.checkpoints.push(self.entries.clone());
    }

    /// Callers always pair this with a prior `checkpoint()`; an unmatched
    /// call is a programming error and silently does nothing.
    pub fn commit(&mut self) {
        self.checkpoints.pop();
    }

    /// Callers always pair this with a prior `checkpoint()`; an unmatched
    /// call is a programming error and silently does nothing.
    pub fn revert(&mut self) {
        if let Some(snapshot) = self.checkpoints.pop() {
            self.entries = snapshot;
        }
    }

    /// Walks dirty entries: deleted entries are deleted from the trie,
    /// otherwise the account is written. Warm-only clean entries are never
    /// written, matching spec §4.1.
    pub fn flush(&mut self, mut write: impl FnMut(Address, FlushOp) -> Result<(), StateError>) -> Result<(), StateError> {
        let mut flushed = 0usize;
        for (addr, entry) in self.entries.iter_mut() {
            if !entry.dirty {
                continue;
            }
            if entry.deleted {
                write(*addr, FlushOp::Delete)?;
            } else {
                write(*addr, FlushOp::Put(entry.account))?;
            }
            entry.dirty = false;
            flushed += 1;
        }
        debug!(flushed, "account cache flushed");
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.checkpoints.clear();
    }
}
