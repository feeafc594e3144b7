use ethereum_types::{Address, H256, U256};

use crate::account::Account;

/// One undoable world-state mutation.
///
/// Every write records the previous value here; a revert replays the journal
/// backward to the snapshot's watermark, a commit just drops the checkpoint
/// (the entries stay so an enclosing revert can still undo them).
#[derive(Debug, Clone)]
pub enum JournalEntry {
    BalanceChange {
        address: Address,
        prev: U256,
    },
    NonceChange {
        address: Address,
        prev: u64,
    },
    CodeChange {
        address: Address,
        prev_code_hash: H256,
    },
    StorageChange {
        address: Address,
        key: U256,
        /// `None` when the key was absent before the write.
        prev: Option<U256>,
    },
    TransientChange {
        address: Address,
        key: U256,
        prev: U256,
    },
    AccountCreated {
        address: Address,
    },
    AccountDestroyed {
        address: Address,
        account: Box<Account>,
    },
    WarmAddress {
        address: Address,
    },
    WarmSlot {
        address: Address,
        key: U256,
    },
}

/// Snapshot checkpoint: watermarks into the journal, the log buffer and the
/// refund counter.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    pub journal_len: usize,
    pub logs_len: usize,
    pub refund: u64,
}
