//! Block executor: applies a block of transactions to a world-state and
//! produces receipts, the rejected list and the post-state roots.

pub mod error;
pub mod validation;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use tracing::debug;

use tern_common::constants::GWEI_TO_WEI;
use tern_common::types::{
    AuthorizationTuple, BlockEnv, EMPTY_CODE_HASH, Fork, Log, Receipt, Transaction, TxKind,
    compute_receipts_root, compute_transactions_root,
};
use tern_vm::{
    Environment, VM, WorldState,
    errors::{ExecutionReport, TxResult, VMError},
    precompiles,
    utils::calculate_create_address,
};

use error::{ChainError, InvalidTransaction};
use validation::{PreparedTransaction, validate_transaction};

/// A transaction whose sender has been recovered from its signature.
#[derive(Debug, Clone)]
pub struct RecoveredTransaction {
    pub tx: Transaction,
    pub sender: Address,
    /// Position in the submitted list, for the rejected report.
    pub index: u64,
}

/// One rejected transaction: its submitted index and the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTransaction {
    pub index: u64,
    pub error: InvalidTransaction,
}

impl RejectedTransaction {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Everything one block execution produced.
#[derive(Debug)]
pub struct BlockExecutionResult {
    pub receipts: Vec<Receipt>,
    pub rejected: Vec<RejectedTransaction>,
    pub gas_used: u64,
    pub blob_gas_used: u64,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
}

/// Applies transactions to a world-state, one at a time, in order.
pub struct BlockExecutor<'a> {
    pub state: &'a mut WorldState,
    pub env: BlockEnv,
    pub chain_id: u64,
    pub fork: Fork,
    /// Coinbase reward in wei; `None` disables it.
    pub block_reward: Option<U256>,
}

impl<'a> BlockExecutor<'a> {
    pub fn new(state: &'a mut WorldState, env: BlockEnv, chain_id: u64, fork: Fork) -> Self {
        Self {
            state,
            env,
            chain_id,
            fork,
            block_reward: None,
        }
    }

    /// Splits the submitted transactions into sender-recovered ones and
    /// signature rejections.
    pub fn recover_senders(
        transactions: &[Transaction],
    ) -> (Vec<RecoveredTransaction>, Vec<RejectedTransaction>) {
        let mut recovered = Vec::with_capacity(transactions.len());
        let mut rejected = Vec::new();
        for (index, tx) in transactions.iter().enumerate() {
            match tx.sender() {
                Ok(sender) => recovered.push(RecoveredTransaction {
                    tx: tx.clone(),
                    sender,
                    index: index as u64,
                }),
                Err(_) => rejected.push(RejectedTransaction {
                    index: index as u64,
                    error: InvalidTransaction::InvalidSignature,
                }),
            }
        }
        (recovered, rejected)
    }

    /// Runs the whole block: validate and execute each transaction, apply
    /// withdrawals and the block reward, compute the final roots.
    pub fn execute_block(
        &mut self,
        transactions: &[Transaction],
    ) -> Result<BlockExecutionResult, ChainError> {
        let (recovered, mut rejected) = Self::recover_senders(transactions);

        let mut receipts = Vec::with_capacity(recovered.len());
        let mut included = Vec::with_capacity(recovered.len());
        let mut cumulative_gas = 0u64;
        let mut blob_gas_used = 0u64;

        for rtx in recovered {
            self.state.begin_transaction();
            self.warm_ambient_addresses();

            let prepared = match validate_transaction(
                self.state,
                &rtx,
                self.chain_id,
                self.fork,
                self.env.gas_limit,
                self.env.base_fee_per_gas,
                self.env.blob_base_fee,
                cumulative_gas,
            ) {
                Ok(prepared) => prepared,
                Err(error) => {
                    debug!(index = rtx.index, %error, "transaction rejected");
                    rejected.push(RejectedTransaction {
                        index: rtx.index,
                        error,
                    });
                    continue;
                }
            };

            let receipt = self.execute_transaction(&rtx, prepared, &mut cumulative_gas)?;
            blob_gas_used = blob_gas_used.saturating_add(rtx.tx.blob_gas());
            included.push(rtx.tx);
            receipts.push(receipt);
        }

        if self.fork.is_shanghai_activated() {
            self.process_withdrawals();
        }
        if let Some(reward) = self.block_reward {
            self.state.add_balance(self.env.coinbase, reward);
        }
        debug!(
            gas_used = cumulative_gas,
            receipts = receipts.len(),
            rejected = rejected.len(),
            "block executed"
        );

        Ok(BlockExecutionResult {
            transactions_root: compute_transactions_root(&included)?,
            receipts_root: compute_receipts_root(&receipts)?,
            state_root: self.state.state_root()?,
            receipts,
            rejected,
            gas_used: cumulative_gas,
            blob_gas_used,
        })
    }

    /// Runs one validated transaction: the fee and nonce bookkeeping around
    /// a single root call frame.
    fn execute_transaction(
        &mut self,
        rtx: &RecoveredTransaction,
        prepared: PreparedTransaction,
        cumulative_gas: &mut u64,
    ) -> Result<Receipt, ChainError> {
        let tx = &rtx.tx;
        let sender = rtx.sender;
        let gas_limit = tx.gas_limit();
        let gas_price = prepared.effective_gas_price;
        let value = tx.value();

        // Deduct the whole gas budget up front; unused gas comes back at the
        // end. The blob fee is burned outright.
        let max_gas_cost = U256::from(gas_limit) * U256::from(gas_price);
        if !self.state.sub_balance(sender, max_gas_cost + prepared.blob_fee) {
            return Err(ChainError::Custom(
                "gas cost deduction failed after validation".to_string(),
            ));
        }

        // The nonce before the bump derives a created contract's address.
        let sender_nonce = self.state.increment_nonce(sender);

        if let Some(authorizations) = tx.authorization_list() {
            self.apply_authorizations(authorizations);
        }

        let (is_create, target) = match tx.to() {
            TxKind::Create => (true, calculate_create_address(sender, sender_nonce)),
            TxKind::Call(to) => (false, to),
        };

        self.state.warm_address(sender);
        self.state.warm_address(target);
        for entry in tx.access_list() {
            self.state.warm_address(entry.address);
            for key in &entry.storage_keys {
                self.state
                    .warm_slot(entry.address, U256::from_big_endian(key.as_bytes()));
            }
        }

        // Creation onto an occupied address fails before running anything.
        if is_create
            && (self.state.get_nonce(target) != 0
                || self.state.get_code_hash(target) != *EMPTY_CODE_HASH)
        {
            return Ok(self.failed_receipt(rtx, gas_limit, gas_price, cumulative_gas));
        }

        let snapshot = self.state.snapshot();
        if is_create {
            self.state.create_contract(target);
        }
        if !value.is_zero() && !self.state.transfer(sender, target, value) {
            // A failed value transfer reverts and consumes the whole gas
            // limit.
            self.state.revert_to_snapshot(snapshot);
            return Ok(self.failed_receipt(rtx, gas_limit, gas_price, cumulative_gas));
        }

        let env = Environment {
            origin: sender,
            gas_price,
            chain_id: self.chain_id,
            fork: self.fork,
            blob_hashes: tx.blob_versioned_hashes().to_vec(),
            block: self.env.clone(),
        };
        let initial_gas = gas_limit - prepared.intrinsic_gas;
        let data = tx.data().clone();

        let report = if is_create {
            VM::new_create(env, self.state, target, initial_gas, value, data).execute()?
        } else if precompiles::is_precompile(&target) {
            // A direct transaction to a precompile never opens a frame.
            match precompiles::execute(&target, &data, initial_gas) {
                Some((output, gas_left)) => ExecutionReport {
                    result: TxResult::Success,
                    gas_used: initial_gas - gas_left,
                    gas_refunded: 0,
                    output,
                },
                None => ExecutionReport {
                    result: TxResult::Revert(VMError::OutOfGas),
                    gas_used: initial_gas,
                    gas_refunded: 0,
                    output: Bytes::new(),
                },
            }
        } else {
            VM::new_call(env, self.state, target, initial_gas, value, data).execute()?
        };

        let (succeeded, gas_used, logs) = if report.is_success() {
            self.state.commit_snapshot(snapshot);
            self.state.process_destroyed_accounts();
            let total_used = prepared.intrinsic_gas + report.gas_used;
            // EIP-3529 cap: refund at most a fifth of what was spent.
            let refund = report.gas_refunded.min(total_used / 5);
            (true, total_used - refund, self.state.take_logs())
        } else {
            self.state.revert_to_snapshot(snapshot);
            (false, gas_limit, Vec::new())
        };

        self.settle_fees(sender, gas_limit, gas_used, gas_price);
        *cumulative_gas += gas_used;

        Ok(Receipt {
            tx_type: tx.tx_type(),
            succeeded,
            cumulative_gas_used: *cumulative_gas,
            logs,
            tx_hash: tx.compute_hash(),
            gas_used,
            contract_address: (is_create && succeeded).then_some(target),
        })
    }

    /// Receipt for a transaction that failed without running: the whole gas
    /// limit burns, fees settle as usual.
    fn failed_receipt(
        &mut self,
        rtx: &RecoveredTransaction,
        gas_limit: u64,
        gas_price: u64,
        cumulative_gas: &mut u64,
    ) -> Receipt {
        self.settle_fees(rtx.sender, gas_limit, gas_limit, gas_price);
        *cumulative_gas += gas_limit;
        Receipt {
            tx_type: rtx.tx.tx_type(),
            succeeded: false,
            cumulative_gas_used: *cumulative_gas,
            logs: Vec::new(),
            tx_hash: rtx.tx.compute_hash(),
            gas_used: gas_limit,
            contract_address: None,
        }
    }

    /// Returns unused gas to the sender and pays the coinbase its priority
    /// fee; the base fee stays burned.
    fn settle_fees(&mut self, sender: Address, gas_limit: u64, gas_used: u64, gas_price: u64) {
        let gas_remaining = gas_limit - gas_used;
        if gas_remaining > 0 {
            self.state
                .add_balance(sender, U256::from(gas_remaining) * U256::from(gas_price));
        }
        let priority_fee = gas_price - self.env.base_fee_per_gas;
        let coinbase_payment = U256::from(gas_used) * U256::from(priority_fee);
        if !coinbase_payment.is_zero() {
            self.state.add_balance(self.env.coinbase, coinbase_payment);
        }
    }

    /// EIP-2929/EIP-3651 ambient warmth: precompiles and (Shanghai+) the
    /// coinbase start every transaction warm.
    fn warm_ambient_addresses(&mut self) {
        for precompile in 1u64..=9 {
            self.state.warm_address(Address::from_low_u64_be(precompile));
        }
        if self.fork.is_shanghai_activated() {
            self.state.warm_address(self.env.coinbase);
        }
    }

    /// EIP-7702: installs delegation designators for valid authorizations.
    /// Invalid tuples are skipped, never fatal.
    fn apply_authorizations(&mut self, authorizations: &[AuthorizationTuple]) {
        if !self.fork.is_prague_activated() {
            return;
        }
        for auth in authorizations {
            if !auth.chain_id.is_zero() && auth.chain_id != U256::from(self.chain_id) {
                continue;
            }
            let Ok(authority) = auth.recover_authority() else {
                continue;
            };
            self.state.warm_address(authority);

            // Only EOAs and already-delegated accounts may delegate.
            let has_plain_code = self.state.get_code_hash(authority) != *EMPTY_CODE_HASH
                && self.state.get_delegation(authority).is_none();
            if has_plain_code || self.state.get_nonce(authority) != auth.nonce {
                continue;
            }
            if self.state.account_exists(authority) {
                self.state.add_refund(
                    (tern_vm::gas_cost::TX_AUTHORIZATION_COST - 12500) as i64,
                );
            }
            let code = if auth.address.is_zero() {
                Bytes::new()
            } else {
                let mut designator = Vec::with_capacity(23);
                designator.extend_from_slice(&tern_vm::constants::DELEGATION_PREFIX);
                designator.extend_from_slice(auth.address.as_bytes());
                Bytes::from(designator)
            };
            self.state.set_code(authority, code);
            self.state.increment_nonce(authority);
        }
    }

    /// Shanghai withdrawals: credit each amount (gwei) to its address. A
    /// zero-amount withdrawal does not create an account (EIP-161).
    fn process_withdrawals(&mut self) {
        let withdrawals = self.env.withdrawals.clone();
        for withdrawal in withdrawals {
            if withdrawal.amount == 0 {
                continue;
            }
            let amount = U256::from(withdrawal.amount) * U256::from(GWEI_TO_WEI);
            self.state.add_balance(withdrawal.address, amount);
        }
    }
}

/// Collected logs of a block, flattened from its receipts.
pub fn block_logs(receipts: &[Receipt]) -> Vec<Log> {
    receipts
        .iter()
        .flat_map(|receipt| receipt.logs.iter().cloned())
        .collect()
}
