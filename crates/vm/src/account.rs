use std::collections::HashMap;

use bytes::Bytes;
use ethereum_types::{H256, U256};
use tern_common::types::EMPTY_CODE_HASH;
use tern_crypto::keccak::keccak_hash;

/// Core account fields, storage kept separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub nonce: u64,
    pub balance: U256,
    pub code_hash: H256,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            code_hash: *EMPTY_CODE_HASH,
        }
    }
}

/// An account as the world-state tracks it: info plus its flat storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub info: AccountInfo,
    /// Slot values. A missing key reads as zero.
    pub storage: HashMap<U256, U256>,
}

impl Account {
    pub fn new(nonce: u64, balance: U256, code: &Bytes) -> Self {
        let code_hash = if code.is_empty() {
            *EMPTY_CODE_HASH
        } else {
            keccak_hash(code)
        };
        Self {
            info: AccountInfo {
                nonce,
                balance,
                code_hash,
            },
            storage: HashMap::new(),
        }
    }

    pub fn has_code(&self) -> bool {
        self.info.code_hash != *EMPTY_CODE_HASH
    }

    /// EIP-161 emptiness: zero nonce, zero balance, no code.
    pub fn is_empty(&self) -> bool {
        self.info.nonce == 0 && self.info.balance.is_zero() && !self.has_code()
    }
}
