//! The `Blockchain` collaborator contract (spec §6), used by the State
//! Manager's `getBlockHashByNumber` to service the BLOCKHASH opcode.

use crate::H256;

pub trait BlockHashSource: std::fmt::Debug {
    fn block_hash_by_number(&self, number: u64) -> H256;
}

/// "A stub implementation returning zero hashes is acceptable for tests"
/// (spec §6).
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroBlockHashSource;

impl BlockHashSource for ZeroBlockHashSource {
    fn block_hash_by_number(&self, _number: u64) -> H256 {
        H256::zero()
    }
}
