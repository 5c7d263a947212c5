//! Transaction Executor (spec §4.5): the outer frame — validation, fee
//! pre-charge, Call Executor dispatch, refund, miner payment, suicide
//! sweep, and the before/after observer hooks.

use tracing::{debug, info};
use txcore_common::{
    constants::intrinsic_gas, Account, Address, BlockHashSource, BlockHeader, LogsBloom,
    Transaction, U256,
};

use crate::call_executor::{CallExecutor, CallInput, VmRecord};
use crate::error::TxError;
use crate::interpreter::Interpreter;
use txcore_state::StateManager;

/// `beforeTx`/`afterTx` (spec §6): presence is optional, hence the
/// default no-op bodies.
pub trait TxObserver {
    fn before_tx(&mut self, _tx: &Transaction) -> Result<(), String> {
        Ok(())
    }

    fn after_tx(&mut self, _results: &TxResults) -> Result<(), String> {
        Ok(())
    }
}

/// A `TxObserver` that does nothing, for callers with no hooks to run.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl TxObserver for NoopObserver {}

/// Configuration options consumed by `TransactionExecutor::execute`
/// (spec §6).
pub struct ExecutionConfig {
    pub tx: Transaction,
    pub block: Option<BlockHeader>,
    pub skip_nonce: bool,
    pub populate_cache: bool,
    pub blockchain: Option<Box<dyn BlockHashSource>>,
}

impl ExecutionConfig {
    pub fn new(tx: Transaction) -> Self {
        Self {
            tx,
            block: None,
            skip_nonce: false,
            populate_cache: true,
            blockchain: None,
        }
    }
}

/// `results` record (spec §4.5 stage 16).
#[derive(Debug, Clone)]
pub struct TxResults {
    pub gas_used: u64,
    pub amount_spent: U256,
    pub bloom: LogsBloom,
    pub from_account: Account,
    pub to_account: Account,
    pub created_address: Option<Address>,
    pub vm: VmRecord,
}

pub struct TransactionExecutor<'a> {
    state: &'a mut StateManager,
    interpreter: &'a dyn Interpreter,
}

impl<'a> TransactionExecutor<'a> {
    pub fn new(state: &'a mut StateManager, interpreter: &'a dyn Interpreter) -> Self {
        Self { state, interpreter }
    }

    pub fn execute(
        &mut self,
        config: ExecutionConfig,
        observer: &mut dyn TxObserver,
    ) -> Result<TxResults, TxError> {
        let tx = config.tx;

        // A supplied blockchain handle replaces whatever collaborator the
        // state manager was constructed with, for this call and onward.
        if let Some(source) = config.blockchain {
            self.state.set_block_hash_source(source);
        }

        // Stage 1: block default.
        let block = config.block.unwrap_or_else(BlockHeader::synthesize);

        // Stage 2: block gas-limit guard.
        if tx.gas_limit > block.gas_limit {
            return Err(TxError::GasExceedsBlock {
                tx_gas_limit: tx.gas_limit,
                block_gas_limit: block.gas_limit,
            });
        }

        // Stage 3: warm cache.
        if config.populate_cache {
            let mut addrs = vec![tx.from, block.coinbase];
            if let Some(to) = tx.to {
                addrs.push(to);
            }
            self.state.warm_cache(&addrs);
        }

        // Stage 4: before-tx hook.
        observer
            .before_tx(&tx)
            .map_err(TxError::BeforeTxHookFailed)?;

        // Stage 5: validate.
        let mut from_account = self.state.get_account(tx.from);
        let upfront_cost = tx.upfront_cost();
        if from_account.balance < upfront_cost {
            return Err(TxError::InsufficientFunds {
                balance: from_account.balance,
                upfront_cost,
            });
        }
        if !config.skip_nonce && from_account.nonce != tx.nonce {
            return Err(TxError::BadNonce {
                expected: from_account.nonce,
                actual: tx.nonce,
            });
        }

        // Stage 6: increment nonce.
        from_account = self.state.increment_account_nonce(tx.from);

        // Stage 7: pre-charge gas.
        let gas_cost = U256::from(tx.gas_limit).saturating_mul(tx.gas_price);
        from_account.balance -= gas_cost;
        self.state
            .put_account_balance(tx.from, from_account, from_account.balance);
        let basefee = intrinsic_gas(&tx.data, tx.is_contract_creation());
        let frame_gas_limit = tx.gas_limit.saturating_sub(basefee);
        debug!(basefee, frame_gas_limit, "transaction executor: gas pre-charged");

        // Stage 8: invoke the Call Executor.
        let suicides = std::rc::Rc::new(std::cell::RefCell::new(std::collections::HashSet::new()));
        let call_input = CallInput {
            caller: tx.from,
            account: from_account,
            to: tx.to,
            value: tx.value,
            data: tx.data.clone(),
            code: None,
            gas_limit: frame_gas_limit,
            gas_price: tx.gas_price,
            origin: tx.from,
            block: block.clone(),
            depth: 0,
            suicides: suicides.clone(),
        };
        let mut call_executor = CallExecutor::new(self.state, self.interpreter);
        let frame_result = call_executor.execute(call_input)?;

        // Stage 9: effective gas used, refund capped at half.
        let mut gas_used = frame_result.gas_used.saturating_add(basefee);
        let refund = frame_result.vm.gas_refund;
        gas_used = gas_used.saturating_sub(refund.min(gas_used / 2));

        // Stage 10: refund leftover gas to the sender.
        let mut from_account = self.state.get_account(tx.from);
        let leftover = U256::from(tx.gas_limit.saturating_sub(gas_used)).saturating_mul(tx.gas_price);
        from_account.balance += leftover;
        self.state
            .put_account_balance(tx.from, from_account, from_account.balance);

        // Stage 11: pay the miner.
        let mut coinbase_account = self.state.get_account(block.coinbase);
        let miner_fee = U256::from(gas_used).saturating_mul(tx.gas_price);
        coinbase_account.balance += miner_fee;
        self.state
            .put_account_balance(block.coinbase, coinbase_account, coinbase_account.balance);

        // Stage 12: sweep suicides.
        let suicide_addrs: Vec<Address> = suicides.borrow().iter().copied().collect();
        for addr in &suicide_addrs {
            self.state.delete_account(*addr);
        }

        // Stage 13: commit storage tries.
        self.state.commit_contracts();

        // Stage 16 (computed ahead of stage 14 so the hook sees final results).
        let mut bloom = LogsBloom::new();
        for log in &frame_result.vm.logs {
            bloom.insert(log.address.as_bytes());
            for topic in &log.topics {
                bloom.insert(topic.as_bytes());
            }
        }
        let results = TxResults {
            gas_used,
            amount_spent: miner_fee,
            bloom,
            from_account: self.state.get_account(tx.from),
            to_account: frame_result.to_account,
            created_address: frame_result.created_address,
            vm: frame_result.vm,
        };

        // Stage 14: after-tx hook.
        observer
            .after_tx(&results)
            .map_err(TxError::AfterTxHookFailed)?;

        // Stage 15: flush, optionally clearing the cache.
        self.state
            .get_state_root()
            .map_err(|e| TxError::Call(crate::error::CallError::State(e)))?;
        if config.populate_cache {
            self.state.clear();
        }

        info!(gas_used, amount_spent = %results.amount_spent, "transaction executed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{ExecutionReport, Log, ScriptedInterpreter};
    use txcore_common::ZeroBlockHashSource;
    use txcore_state::InMemoryTrie;

    fn state() -> StateManager {
        StateManager::new(Box::new(InMemoryTrie::new()), Box::new(ZeroBlockHashSource))
    }

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn plain_tx(from: Address, to: Address, value: U256, nonce: u64) -> Transaction {
        Transaction {
            from,
            nonce,
            gas_price: U256::from(1),
            gas_limit: 100_000,
            to: Some(to),
            value,
            data: vec![],
        }
    }

    #[test]
    fn plain_value_transfer_moves_balance_and_pays_the_miner() {
        crate::init_tracing();
        let mut state = state();
        let sender = addr(1);
        let recipient = addr(2);
        let coinbase = addr(9);
        state.put_account(sender, Account::zero().with_balance(U256::from(10_000_000)));

        let interpreter = ScriptedInterpreter::success(Account::zero());
        let mut executor = TransactionExecutor::new(&mut state, &interpreter);
        let mut block = BlockHeader::synthesize();
        block.coinbase = coinbase;
        let mut config = ExecutionConfig::new(plain_tx(sender, recipient, U256::from(1_000), 0));
        config.block = Some(block);
        let mut observer = NoopObserver;

        let results = executor.execute(config, &mut observer).unwrap();

        assert_eq!(state.get_account(recipient).balance, U256::from(1_000));
        assert!(state.get_account(coinbase).balance > U256::zero());
        assert_eq!(results.gas_used, 21_000);
    }

    #[test]
    fn bad_nonce_is_rejected_before_any_mutation() {
        let mut state = state();
        let sender = addr(1);
        state.put_account(sender, Account::zero().with_balance(U256::from(10_000_000)));
        let balance_before = state.get_account(sender).balance;

        let interpreter = ScriptedInterpreter::success(Account::zero());
        let mut executor = TransactionExecutor::new(&mut state, &interpreter);
        let config = ExecutionConfig::new(plain_tx(sender, addr(2), U256::zero(), 7));
        let mut observer = NoopObserver;

        let err = executor.execute(config, &mut observer).unwrap_err();
        assert!(matches!(err, TxError::BadNonce { expected: 0, actual: 7 }));
        assert_eq!(state.get_account(sender).balance, balance_before);
    }

    #[test]
    fn insufficient_funds_is_rejected_before_any_mutation() {
        let mut state = state();
        let sender = addr(1);
        state.put_account(sender, Account::zero().with_balance(U256::from(10)));

        let interpreter = ScriptedInterpreter::success(Account::zero());
        let mut executor = TransactionExecutor::new(&mut state, &interpreter);
        let config = ExecutionConfig::new(plain_tx(sender, addr(2), U256::from(1_000), 0));
        let mut observer = NoopObserver;

        let err = executor.execute(config, &mut observer).unwrap_err();
        assert!(matches!(err, TxError::InsufficientFunds { .. }));
        assert_eq!(state.get_account(sender).nonce, 0);
    }

    #[test]
    fn gas_limit_exceeding_the_block_is_rejected() {
        let mut state = state();
        let sender = addr(1);
        state.put_account(sender, Account::zero().with_balance(U256::from(10_000_000)));

        let interpreter = ScriptedInterpreter::success(Account::zero());
        let mut executor = TransactionExecutor::new(&mut state, &interpreter);
        let mut config = ExecutionConfig::new(plain_tx(sender, addr(2), U256::zero(), 0));
        config.tx.gas_limit = 1_000_000;
        let mut block = BlockHeader::synthesize();
        block.gas_limit = 500_000;
        config.block = Some(block);
        let mut observer = NoopObserver;

        let err = executor.execute(config, &mut observer).unwrap_err();
        assert!(matches!(err, TxError::GasExceedsBlock { .. }));
    }

    #[test]
    fn contract_creation_reports_created_address_and_installs_code() {
        let mut state = state();
        let sender = addr(1);
        state.put_account(sender, Account::zero().with_balance(U256::from(100_000_000)));

        let mut report = ExecutionReport::empty_success(Account::zero());
        report.return_data = vec![0x60, 0x00];
        report.gas_used = 10_000;
        let interpreter = ScriptedInterpreter::returning(report);
        let mut executor = TransactionExecutor::new(&mut state, &interpreter);
        let tx = Transaction {
            from: sender,
            nonce: 0,
            gas_price: U256::from(1),
            gas_limit: 200_000,
            to: None,
            value: U256::zero(),
            data: vec![0x60, 0x00],
        };
        let config = ExecutionConfig::new(tx);
        let mut observer = NoopObserver;

        let results = executor.execute(config, &mut observer).unwrap();
        let created = results.created_address.expect("creation sets created_address");
        assert!(state.get_account(created).is_contract());
    }

    #[test]
    fn gas_refund_is_capped_at_half_of_gas_used() {
        let mut state = state();
        let sender = addr(1);
        state.put_account(sender, Account::zero().with_balance(U256::from(100_000_000)));

        let mut report = ExecutionReport::empty_success(Account::zero());
        report.gas_used = 10_000;
        report.gas_refund = 100_000; // far larger than half of gas_used
        let interpreter = ScriptedInterpreter::returning(report);
        let mut executor = TransactionExecutor::new(&mut state, &interpreter);
        let config = ExecutionConfig::new(plain_tx(sender, addr(2), U256::zero(), 0));
        let mut observer = NoopObserver;

        let results = executor.execute(config, &mut observer).unwrap();
        let basefee = 21_000u64;
        let raw_gas_used = 10_000 + basefee;
        let expected = raw_gas_used - (raw_gas_used / 2);
        assert_eq!(results.gas_used, expected);
    }

    #[test]
    fn logs_accumulate_into_the_result_bloom() {
        let mut state = state();
        let sender = addr(1);
        let recipient = addr(2);
        state.put_account(sender, Account::zero().with_balance(U256::from(100_000_000)));

        let mut report = ExecutionReport::empty_success(Account::zero());
        report.logs = vec![Log {
            address: recipient,
            topics: vec![txcore_common::H256::repeat_byte(0x11)],
            data: vec![],
        }];
        let interpreter = ScriptedInterpreter::returning(report);
        let mut executor = TransactionExecutor::new(&mut state, &interpreter);
        let config = ExecutionConfig::new(plain_tx(sender, recipient, U256::zero(), 0));
        let mut observer = NoopObserver;

        let results = executor.execute(config, &mut observer).unwrap();
        assert!(results.bloom.might_contain(recipient.as_bytes()));
    }

    #[test]
    fn config_blockchain_override_replaces_the_collaborator() {
        #[derive(Debug)]
        struct FixedBlockHashSource(txcore_common::H256);
        impl BlockHashSource for FixedBlockHashSource {
            fn block_hash_by_number(&self, _number: u64) -> txcore_common::H256 {
                self.0
            }
        }

        let mut state = state();
        let sender = addr(1);
        state.put_account(sender, Account::zero().with_balance(U256::from(1_000_000)));

        let fixed_hash = txcore_common::H256::repeat_byte(0x77);
        let interpreter = ScriptedInterpreter::success(Account::zero());
        let mut executor = TransactionExecutor::new(&mut state, &interpreter);
        let mut config = ExecutionConfig::new(plain_tx(sender, addr(2), U256::zero(), 0));
        config.blockchain = Some(Box::new(FixedBlockHashSource(fixed_hash)));
        let mut observer = NoopObserver;

        executor.execute(config, &mut observer).unwrap();
        assert_eq!(state.get_block_hash_by_number(1), fixed_hash);
    }
}
