//! The `Interpreter` collaborator contract (spec §6): the actual opcode
//! execution engine is out of scope for this crate (spec §1) — what lives
//! here is the trait boundary the Call Executor dispatches through, plus a
//! small scriptable stub used by tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use txcore_common::{Account, Address, BlockHeader, H256, U256};

/// Shared, append-only suicide set threaded through every frame of one tx
/// (spec §5: "shared across all frames of one tx").
pub type SuicideSet = Rc<RefCell<HashSet<Address>>>;

#[derive(Debug, Clone)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

/// Input to one interpreter dispatch (spec §6).
#[derive(Debug, Clone)]
pub struct RunCodeOpts {
    pub code: Vec<u8>,
    pub data: Vec<u8>,
    pub gas_limit: u64,
    pub gas_price: U256,
    /// The target account as loaded before dispatch; the interpreter reads
    /// this as its starting point and hands back the final version in
    /// `ExecutionReport::account`.
    pub account: Account,
    pub address: Address,
    pub origin: Address,
    pub caller: Address,
    pub value: U256,
    pub block: BlockHeader,
    pub depth: usize,
    pub suicides: SuicideSet,
}

/// `{ account, gasUsed, gasRefund, return, logs, suicides, exceptionError }`
/// (spec §6). `exception_error` being `Some` means a *reverted frame*, not a
/// collaborator failure — see spec §7's distinction.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// The target account's final state as the interpreter sees it; the
    /// Call Executor is responsible for writing this back to the cache
    /// (spec §4.4 step 10).
    pub account: Account,
    pub gas_used: u64,
    pub gas_refund: u64,
    pub return_data: Vec<u8>,
    pub logs: Vec<Log>,
    pub exception_error: Option<String>,
}

impl ExecutionReport {
    pub fn is_exception(&self) -> bool {
        self.exception_error.is_some()
    }

    /// An empty, successful, no-op report — the baseline for a pure value
    /// transfer with no code to run (spec §4.4 step 4's "leave empty").
    pub fn empty_success(account: Account) -> Self {
        Self {
            account,
            gas_used: 0,
            gas_refund: 0,
            return_data: Vec::new(),
            logs: Vec::new(),
            exception_error: None,
        }
    }
}

/// A true collaborator failure: the interpreter itself could not run (e.g.
/// malformed opts), as opposed to a reverted frame. Per spec §6, a reverted
/// frame is a *successful* dispatch with `exception_error` set, not this.
#[derive(Debug, thiserror::Error)]
#[error("interpreter failure: {0}")]
pub struct InterpreterFailure(pub String);

pub trait Interpreter: std::fmt::Debug {
    fn run_code(&self, opts: RunCodeOpts) -> Result<ExecutionReport, InterpreterFailure>;
    fn run_precompiled(&self, opts: RunCodeOpts) -> Result<ExecutionReport, InterpreterFailure>;
}

/// Scriptable stub used by tests: returns a caller-supplied report,
/// ignoring `opts`, so a test can dictate exactly what "the interpreter"
/// did without a real opcode engine.
#[derive(Debug, Clone)]
pub struct ScriptedInterpreter {
    report: ExecutionReport,
}

impl ScriptedInterpreter {
    pub fn returning(report: ExecutionReport) -> Self {
        Self { report }
    }

    pub fn success(account: Account) -> Self {
        Self::returning(ExecutionReport::empty_success(account))
    }
}

impl Interpreter for ScriptedInterpreter {
    fn run_code(&self, _opts: RunCodeOpts) -> Result<ExecutionReport, InterpreterFailure> {
        Ok(self.report.clone())
    }

    fn run_precompiled(&self, _opts: RunCodeOpts) -> Result<ExecutionReport, InterpreterFailure> {
        Ok(self.report.clone())
    }
}
