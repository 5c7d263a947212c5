pub mod call_executor;
pub mod error;
pub mod interpreter;
pub mod transaction_executor;

pub use call_executor::{CallExecutor, CallInput, CallResult, VmRecord};
pub use error::{CallError, TxError};
pub use interpreter::{
    ExecutionReport, Interpreter, InterpreterFailure, Log, RunCodeOpts, ScriptedInterpreter,
    SuicideSet,
};
pub use transaction_executor::{
    ExecutionConfig, NoopObserver, TransactionExecutor, TxObserver, TxResults,
};

/// Installs a `tracing-subscriber` once per test binary, mirroring
/// `txcore_state::init_tracing`, so the frame-exception/stage `debug!`
/// events this crate emits show up under `RUST_LOG=debug`.
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
