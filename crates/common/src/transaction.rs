use serde::{Deserialize, Serialize};

use crate::{Address, U256};

/// A signed transaction, with its sender already recovered upstream (ECDSA
/// recovery is out of scope here — see spec §1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub from: Address,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    /// `None` denotes contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
}

impl Transaction {
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// `tx.gasLimit · tx.gasPrice + tx.value`, spec §4.5 stage 5.
    pub fn upfront_cost(&self) -> U256 {
        U256::from(self.gas_limit)
            .saturating_mul(self.gas_price)
            .saturating_add(self.value)
    }
}

/// Read-only block context threaded through execution. Header parsing and
/// validation are out of scope here — this is just the subset of fields the
/// core reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeader {
    pub coinbase: Address,
    pub number: u64,
    pub gas_limit: u64,
    pub timestamp: u64,
    pub difficulty: U256,
}

impl BlockHeader {
    /// `2^52 - 1`: the synthetic gas limit used when the caller supplies no
    /// block (spec §4.5 stage 1) — a value exceeding any real transaction's.
    pub const SYNTHETIC_GAS_LIMIT: u64 = (1u64 << 52) - 1;

    pub fn synthesize() -> Self {
        Self {
            coinbase: Address::zero(),
            number: 0,
            gas_limit: Self::SYNTHETIC_GAS_LIMIT,
            timestamp: 0,
            difficulty: U256::zero(),
        }
    }
}
