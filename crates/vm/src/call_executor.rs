//! Call Executor (spec §4.4): executes one CALL or CREATE frame — balance
//! transfer, account materialisation, address derivation for contract
//! creation, code loading, nested checkpointing, and exceptional-halt
//! rollback.

use tracing::{debug, trace};
use txcore_common::{create_address, precompiles::is_precompile, Account, Address, BlockHeader, U256};

use crate::error::CallError;
use crate::interpreter::{ExecutionReport, Interpreter, RunCodeOpts, SuicideSet};
use txcore_common::constants::CREATE_DATA_GAS;
use txcore_state::StateManager;

#[derive(Debug, Clone)]
pub struct CallInput {
    pub caller: Address,
    /// The caller's account as already debited for gas by the Transaction
    /// Executor (spec §4.4 header).
    pub account: Account,
    /// Absent denotes contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
    /// Override for CALLCODE/DELEGATECALL semantics: execute this code
    /// against the target's account instead of the target's own code.
    pub code: Option<Vec<u8>>,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub origin: Address,
    pub block: BlockHeader,
    pub depth: usize,
    pub suicides: SuicideSet,
}

/// `vm` substructure of the result record (spec §6).
#[derive(Debug, Clone)]
pub struct VmRecord {
    pub logs: Vec<crate::interpreter::Log>,
    pub return_data: Vec<u8>,
    /// `1` means "no exception", `0` means "exception occurred" — this
    /// inverted polarity is the source convention spec §4.4 step 11 asks us
    /// to preserve, not a choice of ours.
    pub exception: u8,
    pub gas_refund: u64,
    pub gas_used: u64,
    pub exception_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CallResult {
    pub gas_used: u64,
    pub from_account: Account,
    pub to_account: Account,
    pub created_address: Option<Address>,
    pub vm: VmRecord,
}

pub struct CallExecutor<'a> {
    state: &'a mut StateManager,
    interpreter: &'a dyn Interpreter,
}

impl<'a> CallExecutor<'a> {
    pub fn new(state: &'a mut StateManager, interpreter: &'a dyn Interpreter) -> Self {
        Self { state, interpreter }
    }

    pub fn execute(&mut self, input: CallInput) -> Result<CallResult, CallError> {
        // Step 1: debit the caller. Balance sufficiency is the caller's
        // responsibility; an overdraw here is a programming error.
        let mut from_account = input.account;
        from_account.balance -= input.value;
        self.state.put_account_balance(input.caller, from_account, from_account.balance);
        trace!(caller = ?input.caller, value = ?input.value, "call executor: caller debited");

        // Step 2: resolve the target. For a creation, `data` carries the
        // init code, which becomes the code to run while `data` itself goes
        // empty.
        let (target, created_address, mut to_account, data, code) = match input.to {
            Some(to) => (to, None, self.state.get_account(to), input.data, input.code),
            None => {
                // The Transaction Executor bumps the sender's nonce before
                // invoking this frame (spec §4.5 stage 6 precedes stage 8),
                // so `from_account.nonce` is already post-increment; CREATE
                // addressing uses the nonce the tx itself carried.
                let creation_nonce = from_account.nonce.saturating_sub(1);
                let created = create_address(input.caller, creation_nonce);
                (created, Some(created), Account::zero(), Vec::new(), Some(input.data))
            }
        };

        // Step 3: credit the recipient.
        to_account.balance += input.value;
        self.state.put_account_balance(target, to_account, to_account.balance);

        // Step 4: select code.
        let mut compiled = false;
        let recipient_is_contract = to_account.is_contract();
        let code = match code {
            Some(code) => code,
            None if is_precompile(&target) => {
                compiled = true;
                Vec::new()
            }
            None if recipient_is_contract => self.state.get_contract_code(&to_account),
            None => Vec::new(),
        };

        // Step 5: nested checkpoint around the interpreter dispatch.
        self.state.checkpoint();

        // Step 6: dispatch. A plain value transfer to a non-contract, non-
        // precompile, non-creation target has nothing to run.
        let invoke_interpreter = created_address.is_some() || compiled || recipient_is_contract;
        let opts = RunCodeOpts {
            code,
            data,
            gas_limit: input.gas_limit,
            gas_price: input.gas_price,
            account: to_account,
            address: target,
            origin: input.origin,
            caller: input.caller,
            value: input.value,
            block: input.block,
            depth: input.depth,
            suicides: input.suicides,
        };
        let mut report = if invoke_interpreter {
            if compiled {
                self.interpreter.run_precompiled(opts)?
            } else {
                self.interpreter.run_code(opts)?
            }
        } else {
            ExecutionReport::empty_success(to_account)
        };

        // Step 7: contract-creation tail-processing.
        let mut install_code: Option<Vec<u8>> = None;
        let mut deleted_created_account = false;
        if created_address.is_some() {
            if report.exception_error.is_some() && report.account.balance.is_zero() {
                deleted_created_account = true;
            } else if report.exception_error.is_none() {
                let return_fee = report
                    .gas_used
                    .saturating_add((report.return_data.len() as u64).saturating_mul(CREATE_DATA_GAS));
                if return_fee <= input.gas_limit {
                    report.gas_used = return_fee;
                    if !report.return_data.is_empty() {
                        install_code = Some(report.return_data.clone());
                    }
                }
                // else: discard `return` — code not installed, gasUsed unchanged.
            }
        }

        // Step 8: commit or revert the nested checkpoint.
        if let Some(err) = &report.exception_error {
            debug!(depth = input.depth, error = %err, "call executor: frame exception, reverting");
            // `revert()` restores the cache to its pre-checkpoint snapshot,
            // which would also undo any compensating writes issued before
            // it; so the compensations for steps 1/3 (which predate the
            // checkpoint taken in step 5, and so are not themselves undone
            // by `revert()`) must be applied *after* it, not before.
            self.state.revert();
            from_account.balance += input.value;

            if input.caller == target {
                // Steps 1 and 3 wrote the *same* cache entry for a self-call:
                // step 3 re-read the account after step 1's debit, so its
                // credit already cancelled the debit before the checkpoint
                // was taken, and `revert()` alone already restored the true
                // balance. Compensating both ends independently here would
                // double-subtract `value`. Only a failed creation whose
                // address happens to equal the caller still needs a write,
                // to delete the account outright.
                if deleted_created_account {
                    self.state.delete_account(target);
                }
            } else {
                self.state.put_account_balance(input.caller, from_account, from_account.balance);
                if deleted_created_account {
                    self.state.delete_account(target);
                } else if created_address.is_none() {
                    let mut reverted_to = self.state.get_account(target);
                    reverted_to.balance -= input.value;
                    self.state.put_account_balance(target, reverted_to, reverted_to.balance);
                }
            }
        } else {
            self.state.commit();
        }

        // Steps 9 & 10: install newly created code and/or publish the
        // recipient's final account.
        if report.exception_error.is_none() {
            match (created_address, install_code.clone()) {
                (Some(addr), Some(code)) => self.state.put_contract_code(addr, report.account, code),
                _ => self.state.put_account(target, report.account),
            }
            to_account = report.account;
        }

        let exception = if report.exception_error.is_some() { 0 } else { 1 };
        Ok(CallResult {
            gas_used: report.gas_used,
            from_account,
            to_account,
            created_address,
            vm: VmRecord {
                logs: report.logs,
                return_data: report.return_data,
                exception,
                gas_refund: report.gas_refund,
                gas_used: report.gas_used,
                exception_error: report.exception_error,
            },
        })
    }
}
