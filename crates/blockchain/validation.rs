//! Pre-execution transaction validation and intrinsic gas.

use ethereum_types::U256;
use tern_common::types::{Fork, Transaction};
use tern_vm::{WorldState, gas_cost};

use crate::{RecoveredTransaction, error::InvalidTransaction};

/// Everything validation derives that execution needs again.
#[derive(Debug, Clone, Copy)]
pub struct PreparedTransaction {
    pub intrinsic_gas: u64,
    pub effective_gas_price: u64,
    pub blob_fee: U256,
}

/// Gas charged before a single opcode runs: base cost, calldata, creation
/// and init-code cost, access list, authorization list.
pub fn intrinsic_gas(tx: &Transaction, fork: Fork) -> u64 {
    let mut gas = gas_cost::TX_BASE_COST;

    let data = tx.data();
    let zero_bytes = data.iter().filter(|byte| **byte == 0).count() as u64;
    let non_zero_bytes = data.len() as u64 - zero_bytes;
    gas += zero_bytes * gas_cost::TX_DATA_ZERO_BYTE_COST
        + non_zero_bytes * gas_cost::TX_DATA_NON_ZERO_BYTE_COST;

    if tx.is_contract_creation() {
        gas += gas_cost::CREATE_BASE_COST;
        if fork.is_shanghai_activated() {
            gas += gas_cost::words_for(data.len()) * gas_cost::INITCODE_WORD_COST;
        }
    }

    for entry in tx.access_list() {
        gas += gas_cost::TX_ACCESS_LIST_ADDRESS_COST;
        gas += entry.storage_keys.len() as u64 * gas_cost::TX_ACCESS_LIST_STORAGE_KEY_COST;
    }

    if let Some(authorizations) = tx.authorization_list() {
        gas += authorizations.len() as u64 * gas_cost::TX_AUTHORIZATION_COST;
    }

    gas
}

/// Validates one transaction against the current state, in the fixed order:
/// chain id, nonce, intrinsic gas, block gas budget, max fee, balance.
pub fn validate_transaction(
    state: &WorldState,
    rtx: &RecoveredTransaction,
    chain_id: u64,
    fork: Fork,
    block_gas_limit: u64,
    base_fee: u64,
    blob_base_fee: U256,
    cumulative_gas: u64,
) -> Result<PreparedTransaction, InvalidTransaction> {
    let tx = &rtx.tx;

    if let Some(tx_chain_id) = tx.chain_id() {
        if tx_chain_id != chain_id {
            return Err(InvalidTransaction::ChainIdMismatch);
        }
    }

    let sender_nonce = state.get_nonce(rtx.sender);
    if tx.nonce() < sender_nonce {
        return Err(InvalidTransaction::NonceTooLow);
    }
    if tx.nonce() > sender_nonce {
        return Err(InvalidTransaction::NonceTooHigh);
    }

    let intrinsic = intrinsic_gas(tx, fork);
    let gas_limit = tx.gas_limit();
    if gas_limit < intrinsic {
        return Err(InvalidTransaction::IntrinsicGas);
    }

    if gas_limit > block_gas_limit || cumulative_gas > block_gas_limit - gas_limit {
        return Err(InvalidTransaction::GasLimitExceeded);
    }

    if tx.max_fee_per_gas() < base_fee {
        return Err(InvalidTransaction::MaxFeeTooLow);
    }
    let effective_gas_price = tx
        .effective_gas_price(base_fee)
        .ok_or(InvalidTransaction::MaxFeeTooLow)?;

    // Balance must cover gas, value and the blob fee, overflow-safe.
    let blob_fee = U256::from(tx.blob_gas())
        .checked_mul(blob_base_fee)
        .ok_or(InvalidTransaction::InsufficientBalance)?;
    let gas_cost = U256::from(gas_limit)
        .checked_mul(U256::from(effective_gas_price))
        .ok_or(InvalidTransaction::InsufficientBalance)?;
    let total_cost = gas_cost
        .checked_add(tx.value())
        .and_then(|cost| cost.checked_add(blob_fee))
        .ok_or(InvalidTransaction::InsufficientBalance)?;
    if state.get_balance(rtx.sender) < total_cost {
        return Err(InvalidTransaction::InsufficientBalance);
    }

    Ok(PreparedTransaction {
        intrinsic_gas: intrinsic,
        effective_gas_price,
        blob_fee,
    })
}
