use txcore_state::StateError;

use crate::interpreter::InterpreterFailure;

/// Errors surfaced while executing one CALL/CREATE frame. These are
/// storage-layer/collaborator failures (spec §7) — a reverted frame is
/// *not* an error, it's a normal `ExecutionReport` with `exception_error`
/// set.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Interpreter(#[from] InterpreterFailure),
}

/// The transaction-level error taxonomy from spec §7: validation errors
/// reported before any mutation, plus anything the frame or a hook
/// propagated unchanged.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("transaction gas limit {tx_gas_limit} exceeds block gas limit {block_gas_limit}")]
    GasExceedsBlock {
        tx_gas_limit: u64,
        block_gas_limit: u64,
    },
    #[error("insufficient funds: balance {balance} is less than upfront cost {upfront_cost}")]
    InsufficientFunds {
        balance: txcore_common::U256,
        upfront_cost: txcore_common::U256,
    },
    #[error("bad nonce: expected {expected}, got {actual}")]
    BadNonce { expected: u64, actual: u64 },
    #[error("before-tx hook failed: {0}")]
    BeforeTxHookFailed(String),
    #[error("after-tx hook failed: {0}")]
    AfterTxHookFailed(String),
    #[error(transparent)]
    Call(#[from] CallError),
}
