//! Gas schedule: the per-opcode static table and the dynamic cost
//! functions the handlers call.

use ethereum_types::U256;
use tern_common::types::Fork;

use crate::{errors::VMError, opcodes::Opcode};

// Dynamic-cost constants (EIP-2929 and friends).
pub const WARM_ACCESS_COST: u64 = 100;
pub const COLD_ACCOUNT_ACCESS_COST: u64 = 2600;
pub const COLD_SLOAD_COST: u64 = 2100;
pub const WARM_SLOAD_COST: u64 = 100;

pub const SSTORE_SET: u64 = 20000;
pub const SSTORE_RESET: u64 = 2900;
pub const SSTORE_SENTRY: u64 = 2300;
/// EIP-3529 refund for clearing a slot that was non-zero at tx start.
pub const SSTORE_CLEARS_REFUND: u64 = 4800;

pub const EXP_BYTE_COST: u64 = 50;
pub const KECCAK256_WORD_COST: u64 = 6;
pub const COPY_WORD_COST: u64 = 3;
pub const LOG_TOPIC_COST: u64 = 375;
pub const LOG_DATA_BYTE_COST: u64 = 8;

pub const CALL_VALUE_COST: u64 = 9000;
pub const CALL_NEW_ACCOUNT_COST: u64 = 25000;

pub const CREATE_BASE_COST: u64 = 32000;
pub const INITCODE_WORD_COST: u64 = 2;
pub const CODE_DEPOSIT_BYTE_COST: u64 = 200;

pub const SELFDESTRUCT_COST: u64 = 5000;
pub const SELFDESTRUCT_NEW_ACCOUNT_COST: u64 = 25000;

pub const ECRECOVER_COST: u64 = 3000;

// Transaction-level constants.
pub const TX_BASE_COST: u64 = 21000;
pub const TX_DATA_ZERO_BYTE_COST: u64 = 4;
pub const TX_DATA_NON_ZERO_BYTE_COST: u64 = 16;
pub const TX_ACCESS_LIST_ADDRESS_COST: u64 = 2400;
pub const TX_ACCESS_LIST_STORAGE_KEY_COST: u64 = 1900;
/// EIP-7702 per-authorization cost.
pub const TX_AUTHORIZATION_COST: u64 = 25000;

/// Builds the 256-entry static cost table for a fork.
///
/// Opcodes whose whole cost is dynamic (SLOAD, SSTORE, the CALL family,
/// BALANCE, the EXT* family, SELFDESTRUCT) keep a zero entry; their handlers
/// charge everything. Opcodes with a static base plus a dynamic part
/// (KECCAK256, EXP, LOG, the copies) keep the base here.
pub fn static_gas_table(fork: Fork) -> [u64; 256] {
    let mut table = [0u64; 256];

    table[Opcode::ADD as usize] = 3;
    table[Opcode::MUL as usize] = 5;
    table[Opcode::SUB as usize] = 3;
    table[Opcode::DIV as usize] = 5;
    table[Opcode::SDIV as usize] = 5;
    table[Opcode::MOD as usize] = 5;
    table[Opcode::SMOD as usize] = 5;
    table[Opcode::ADDMOD as usize] = 8;
    table[Opcode::MULMOD as usize] = 8;
    table[Opcode::EXP as usize] = 10;
    table[Opcode::SIGNEXTEND as usize] = 5;

    table[Opcode::LT as usize] = 3;
    table[Opcode::GT as usize] = 3;
    table[Opcode::SLT as usize] = 3;
    table[Opcode::SGT as usize] = 3;
    table[Opcode::EQ as usize] = 3;
    table[Opcode::ISZERO as usize] = 3;
    table[Opcode::AND as usize] = 3;
    table[Opcode::OR as usize] = 3;
    table[Opcode::XOR as usize] = 3;
    table[Opcode::NOT as usize] = 3;
    table[Opcode::BYTE as usize] = 3;
    table[Opcode::SHL as usize] = 3;
    table[Opcode::SHR as usize] = 3;
    table[Opcode::SAR as usize] = 3;

    table[Opcode::KECCAK256 as usize] = 30;

    table[Opcode::ADDRESS as usize] = 2;
    table[Opcode::ORIGIN as usize] = 2;
    table[Opcode::CALLER as usize] = 2;
    table[Opcode::CALLVALUE as usize] = 2;
    table[Opcode::CALLDATALOAD as usize] = 3;
    table[Opcode::CALLDATASIZE as usize] = 2;
    table[Opcode::CALLDATACOPY as usize] = 3;
    table[Opcode::CODESIZE as usize] = 2;
    table[Opcode::CODECOPY as usize] = 3;
    table[Opcode::GASPRICE as usize] = 2;
    table[Opcode::RETURNDATASIZE as usize] = 2;
    table[Opcode::RETURNDATACOPY as usize] = 3;

    table[Opcode::BLOCKHASH as usize] = 20;
    table[Opcode::COINBASE as usize] = 2;
    table[Opcode::TIMESTAMP as usize] = 2;
    table[Opcode::NUMBER as usize] = 2;
    table[Opcode::PREVRANDAO as usize] = 2;
    table[Opcode::GASLIMIT as usize] = 2;
    table[Opcode::CHAINID as usize] = 2;
    table[Opcode::SELFBALANCE as usize] = 5;
    table[Opcode::BASEFEE as usize] = 2;

    table[Opcode::POP as usize] = 2;
    table[Opcode::MLOAD as usize] = 3;
    table[Opcode::MSTORE as usize] = 3;
    table[Opcode::MSTORE8 as usize] = 3;
    table[Opcode::JUMP as usize] = 8;
    table[Opcode::JUMPI as usize] = 10;
    table[Opcode::PC as usize] = 2;
    table[Opcode::MSIZE as usize] = 2;
    table[Opcode::GAS as usize] = 2;
    table[Opcode::JUMPDEST as usize] = 1;

    for push in 0x60..=0x7f {
        table[push] = 3;
    }
    for dup in 0x80..=0x8f {
        table[dup] = 3;
    }
    for swap in 0x90..=0x9f {
        table[swap] = 3;
    }
    for log in 0xa0..=0xa4 {
        table[log] = LOG_TOPIC_COST;
    }

    table[Opcode::CREATE as usize] = CREATE_BASE_COST;
    table[Opcode::CREATE2 as usize] = CREATE_BASE_COST;

    if fork.is_shanghai_activated() {
        table[Opcode::PUSH0 as usize] = 2;
    }
    if fork.is_cancun_activated() {
        table[Opcode::TLOAD as usize] = 100;
        table[Opcode::TSTORE as usize] = 100;
        table[Opcode::MCOPY as usize] = 3;
        table[Opcode::BLOBHASH as usize] = 3;
        table[Opcode::BLOBBASEFEE as usize] = 2;
    }

    table
}

/// `3·w + w²/512` for a memory size of `w` words.
pub fn memory_cost(words: u64) -> Result<u64, VMError> {
    let words_squared = (words as u128) * (words as u128);
    let cost = 3u128 * words as u128 + words_squared / 512;
    u64::try_from(cost).map_err(|_| VMError::OutOfGas)
}

/// Per-word cost helper for KECCAK256 / copies / init code.
pub fn words_for(size: usize) -> u64 {
    (size as u64).div_ceil(32)
}

pub fn keccak256_cost(size: usize) -> Result<u64, VMError> {
    words_for(size)
        .checked_mul(KECCAK256_WORD_COST)
        .ok_or(VMError::OutOfGas)
}

pub fn copy_cost(size: usize) -> Result<u64, VMError> {
    words_for(size)
        .checked_mul(COPY_WORD_COST)
        .ok_or(VMError::OutOfGas)
}

/// `10 + 50 · byte_length(exponent)`; the 10 sits in the static table.
pub fn exp_dynamic_cost(exponent: U256) -> u64 {
    let exponent_bytes = (exponent.bits() as u64).div_ceil(8);
    EXP_BYTE_COST * exponent_bytes
}

pub fn log_dynamic_cost(topic_count: usize, data_size: usize) -> Result<u64, VMError> {
    let topics = LOG_TOPIC_COST
        .checked_mul(topic_count as u64)
        .ok_or(VMError::OutOfGas)?;
    let data = LOG_DATA_BYTE_COST
        .checked_mul(data_size as u64)
        .ok_or(VMError::OutOfGas)?;
    topics.checked_add(data).ok_or(VMError::OutOfGas)
}

pub fn address_access_cost(was_cold: bool) -> u64 {
    if was_cold {
        COLD_ACCOUNT_ACCESS_COST
    } else {
        WARM_ACCESS_COST
    }
}

pub fn sload_cost(was_cold: bool) -> u64 {
    if was_cold {
        COLD_SLOAD_COST
    } else {
        WARM_SLOAD_COST
    }
}

/// EIP-2200 + EIP-2929 SSTORE cost over (original, current, new).
pub fn sstore_cost(was_cold: bool, original: U256, current: U256, new: U256) -> u64 {
    let base = if current == new {
        WARM_SLOAD_COST
    } else if current == original {
        if original.is_zero() {
            SSTORE_SET
        } else {
            SSTORE_RESET
        }
    } else {
        WARM_SLOAD_COST
    };
    base + if was_cold { COLD_SLOAD_COST } else { 0 }
}

/// EIP-3529 SSTORE refund delta, possibly negative (undoing an earlier
/// refund within the same transaction).
pub fn sstore_refund(original: U256, current: U256, new: U256) -> i64 {
    if current == new {
        return 0;
    }
    let mut refund: i64 = 0;
    if current == original {
        if !original.is_zero() && new.is_zero() {
            refund += SSTORE_CLEARS_REFUND as i64;
        }
        return refund;
    }
    // Dirty slot.
    if !original.is_zero() {
        if current.is_zero() {
            refund -= SSTORE_CLEARS_REFUND as i64;
        } else if new.is_zero() {
            refund += SSTORE_CLEARS_REFUND as i64;
        }
    }
    if new == original {
        if original.is_zero() {
            refund += (SSTORE_SET - WARM_SLOAD_COST) as i64;
        } else {
            refund += (SSTORE_RESET - WARM_SLOAD_COST) as i64;
        }
    }
    refund
}

/// EIP-3860: 2 gas per init-code word.
pub fn init_code_cost(size: usize) -> Result<u64, VMError> {
    words_for(size)
        .checked_mul(INITCODE_WORD_COST)
        .ok_or(VMError::OutOfGas)
}

/// EIP-150: the caller keeps at least 1/64th of its remaining gas.
pub fn max_gas_for_call(remaining: u64) -> u64 {
    remaining - remaining / 64
}
