//! The world-state: accounts, storage, code, EIP-2929 access tracking and
//! the journal that makes every mutation revertable.

mod journal;

use std::collections::{BTreeMap, HashMap, HashSet};

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use tern_common::types::{AccountState, EMPTY_CODE_HASH, GenesisAccount, Log};
use tern_crypto::keccak::keccak_hash;
use tern_rlp::encode::RLPEncode;
use tern_trie::Trie;

use crate::{
    account::Account,
    constants::DELEGATION_PREFIX,
    errors::VMError,
};
pub use journal::{Checkpoint, JournalEntry};

/// In-memory journaled world-state for one block.
///
/// Reads go straight to the flat maps; writes record their previous value in
/// the journal first. Snapshots are watermarks into that journal, so a
/// revert undoes exactly the mutations made after the snapshot and nothing
/// else. The tries only come into play when a state root is requested.
#[derive(Debug, Default)]
pub struct WorldState {
    accounts: HashMap<Address, Account>,
    /// Contract code by hash. Entries are never removed; orphaned code from
    /// reverted deployments is unreachable and harmless.
    code: HashMap<H256, Bytes>,

    journal: Vec<JournalEntry>,
    checkpoints: Vec<Checkpoint>,

    // Per-transaction access and value tracking.
    warm_addresses: HashSet<Address>,
    warm_slots: HashSet<(Address, U256)>,
    original_storage: HashMap<(Address, U256), U256>,
    transient_storage: HashMap<(Address, U256), U256>,
    destroyed_accounts: HashSet<Address>,
    created_accounts: HashSet<Address>,
    logs: Vec<Log>,
    refund: u64,

    // Per-block dirty tracking for state-root computation.
    dirty_storage: HashSet<Address>,
    storage_roots: HashMap<Address, H256>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the pre-state. Not journaled; call before executing anything.
    pub fn from_genesis(alloc: &BTreeMap<Address, GenesisAccount>) -> Self {
        let mut state = Self::new();
        for (address, genesis) in alloc {
            let mut account = Account::new(genesis.nonce, genesis.balance, &genesis.code);
            account.storage = genesis
                .storage
                .iter()
                .filter(|(_, value)| !value.is_zero())
                .map(|(key, value)| (*key, *value))
                .collect();
            if !genesis.code.is_empty() {
                state
                    .code
                    .insert(account.info.code_hash, genesis.code.clone());
            }
            state.accounts.insert(*address, account);
        }
        state
    }

    // === Account lookups ===================================================

    pub fn account_exists(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    /// EIP-161: true for absent accounts too.
    pub fn account_is_empty(&self, address: Address) -> bool {
        self.accounts
            .get(&address)
            .map(|account| account.is_empty())
            .unwrap_or(true)
    }

    pub fn get_balance(&self, address: Address) -> U256 {
        self.accounts
            .get(&address)
            .map(|account| account.info.balance)
            .unwrap_or_default()
    }

    pub fn get_nonce(&self, address: Address) -> u64 {
        self.accounts
            .get(&address)
            .map(|account| account.info.nonce)
            .unwrap_or_default()
    }

    pub fn get_code_hash(&self, address: Address) -> H256 {
        self.accounts
            .get(&address)
            .map(|account| account.info.code_hash)
            .unwrap_or(*EMPTY_CODE_HASH)
    }

    pub fn get_code(&self, address: Address) -> Bytes {
        self.code
            .get(&self.get_code_hash(address))
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_code_size(&self, address: Address) -> usize {
        self.get_code(address).len()
    }

    /// EIP-7702: the target of the account's delegation designator, if its
    /// code is one.
    pub fn get_delegation(&self, address: Address) -> Option<Address> {
        let code = self.get_code(address);
        (code.len() == 23 && code.starts_with(&DELEGATION_PREFIX))
            .then(|| Address::from_slice(&code[3..]))
    }

    // === Account mutation ==================================================

    /// The mutable account at `address`, created (and journaled as created)
    /// if absent.
    fn account_entry(&mut self, address: Address) -> &mut Account {
        if !self.accounts.contains_key(&address) {
            self.journal.push(JournalEntry::AccountCreated { address });
            self.accounts.insert(address, Account::default());
        }
        self.accounts
            .get_mut(&address)
            .unwrap_or_else(|| unreachable!("account was just inserted"))
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) {
        let account = self.account_entry(address);
        let prev = account.info.balance;
        account.info.balance = balance;
        self.journal.push(JournalEntry::BalanceChange { address, prev });
    }

    /// Returns false on overflow.
    pub fn add_balance(&mut self, address: Address, amount: U256) -> bool {
        match self.get_balance(address).checked_add(amount) {
            Some(balance) => {
                self.set_balance(address, balance);
                true
            }
            None => false,
        }
    }

    /// Returns false if the balance cannot cover `amount`.
    pub fn sub_balance(&mut self, address: Address, amount: U256) -> bool {
        match self.get_balance(address).checked_sub(amount) {
            Some(balance) => {
                self.set_balance(address, balance);
                true
            }
            None => false,
        }
    }

    /// Moves `amount` from `from` to `to`; false (and no change) if the
    /// sender cannot cover it.
    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> bool {
        if self.get_balance(from) < amount {
            return false;
        }
        self.sub_balance(from, amount) && self.add_balance(to, amount)
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        let account = self.account_entry(address);
        let prev = account.info.nonce;
        account.info.nonce = nonce;
        self.journal.push(JournalEntry::NonceChange { address, prev });
    }

    /// Bumps the nonce and returns the value before the bump.
    pub fn increment_nonce(&mut self, address: Address) -> u64 {
        let prev = self.get_nonce(address);
        self.set_nonce(address, prev + 1);
        prev
    }

    pub fn set_code(&mut self, address: Address, code: Bytes) {
        let code_hash = if code.is_empty() {
            *EMPTY_CODE_HASH
        } else {
            keccak_hash(&code)
        };
        self.code.insert(code_hash, code);
        let account = self.account_entry(address);
        let prev_code_hash = account.info.code_hash;
        account.info.code_hash = code_hash;
        self.journal
            .push(JournalEntry::CodeChange {
                address,
                prev_code_hash,
            });
    }

    /// Sets up the account a CREATE lands on: nonce 1 per EIP-161, marked as
    /// created this transaction for EIP-6780. An existing account keeps its
    /// balance (collisions are the caller's problem).
    pub fn create_contract(&mut self, address: Address) {
        self.account_entry(address);
        self.set_nonce(address, 1);
        self.created_accounts.insert(address);
    }

    pub fn was_created_this_tx(&self, address: Address) -> bool {
        self.created_accounts.contains(&address)
    }

    /// SELFDESTRUCT: zeroes the balance and schedules removal at the end of
    /// the transaction. The account stays readable until then.
    pub fn destroy_account(&mut self, address: Address) {
        if let Some(account) = self.accounts.get(&address) {
            if self.destroyed_accounts.insert(address) {
                self.journal.push(JournalEntry::AccountDestroyed {
                    address,
                    account: Box::new(account.clone()),
                });
            }
        }
        self.set_balance(address, U256::zero());
    }

    // === Storage ===========================================================

    pub fn get_storage(&self, address: Address, key: U256) -> U256 {
        self.accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key).copied())
            .unwrap_or_default()
    }

    /// Value the slot had at the start of the transaction (EIP-2200).
    pub fn get_original_storage(&self, address: Address, key: U256) -> U256 {
        self.original_storage
            .get(&(address, key))
            .copied()
            .unwrap_or_else(|| self.get_storage(address, key))
    }

    pub fn set_storage(&mut self, address: Address, key: U256, value: U256) {
        let current = self.get_storage(address, key);
        // First write this transaction pins the original value.
        self.original_storage.entry((address, key)).or_insert(current);
        self.dirty_storage.insert(address);

        let account = self.account_entry(address);
        let prev = account.storage.insert(key, value);
        self.journal
            .push(JournalEntry::StorageChange { address, key, prev });
    }

    pub fn get_transient(&self, address: Address, key: U256) -> U256 {
        self.transient_storage
            .get(&(address, key))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_transient(&mut self, address: Address, key: U256, value: U256) {
        let prev = self
            .transient_storage
            .insert((address, key), value)
            .unwrap_or_default();
        self.journal
            .push(JournalEntry::TransientChange { address, key, prev });
    }

    // === EIP-2929 access tracking ==========================================

    pub fn is_address_warm(&self, address: Address) -> bool {
        self.warm_addresses.contains(&address)
    }

    /// Marks the address warm; true if it was cold.
    pub fn warm_address(&mut self, address: Address) -> bool {
        let was_cold = self.warm_addresses.insert(address);
        if was_cold {
            self.journal.push(JournalEntry::WarmAddress { address });
        }
        was_cold
    }

    /// Marks the slot warm; true if it was cold.
    pub fn warm_slot(&mut self, address: Address, key: U256) -> bool {
        let was_cold = self.warm_slots.insert((address, key));
        if was_cold {
            self.journal.push(JournalEntry::WarmSlot { address, key });
        }
        was_cold
    }

    // === Logs and refunds ==================================================

    pub fn add_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn take_logs(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.logs)
    }

    /// Adjusts the refund counter, clamping at zero.
    pub fn add_refund(&mut self, delta: i64) {
        self.refund = self.refund.saturating_add_signed(delta);
    }

    pub fn refund(&self) -> u64 {
        self.refund
    }

    // === Snapshots =========================================================

    /// Opens a snapshot; mutations after this point can be reverted.
    pub fn snapshot(&mut self) -> usize {
        self.checkpoints.push(Checkpoint {
            journal_len: self.journal.len(),
            logs_len: self.logs.len(),
            refund: self.refund,
        });
        self.checkpoints.len() - 1
    }

    /// Undoes every mutation made since the snapshot was taken. Inner
    /// snapshots (committed or not) are undone with it.
    pub fn revert_to_snapshot(&mut self, snapshot: usize) {
        let Some(checkpoint) = self.checkpoints.get(snapshot).copied() else {
            return;
        };
        self.checkpoints.truncate(snapshot);
        self.logs.truncate(checkpoint.logs_len);
        self.refund = checkpoint.refund;
        while self.journal.len() > checkpoint.journal_len {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            self.undo(entry);
        }
    }

    /// Drops the checkpoint, keeping the journal so an enclosing snapshot
    /// can still revert across it.
    pub fn commit_snapshot(&mut self, snapshot: usize) {
        self.checkpoints.truncate(snapshot);
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::BalanceChange { address, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.info.balance = prev;
                }
            }
            JournalEntry::NonceChange { address, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.info.nonce = prev;
                }
            }
            JournalEntry::CodeChange {
                address,
                prev_code_hash,
            } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.info.code_hash = prev_code_hash;
                }
            }
            JournalEntry::StorageChange { address, key, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    match prev {
                        Some(value) => account.storage.insert(key, value),
                        None => account.storage.remove(&key),
                    };
                }
            }
            JournalEntry::TransientChange { address, key, prev } => {
                self.transient_storage.insert((address, key), prev);
            }
            JournalEntry::AccountCreated { address } => {
                self.accounts.remove(&address);
                self.created_accounts.remove(&address);
            }
            JournalEntry::AccountDestroyed { address, account } => {
                self.destroyed_accounts.remove(&address);
                self.accounts.insert(address, *account);
            }
            JournalEntry::WarmAddress { address } => {
                self.warm_addresses.remove(&address);
            }
            JournalEntry::WarmSlot { address, key } => {
                self.warm_slots.remove(&(address, key));
            }
        }
    }

    // === Transaction boundary ==============================================

    /// Resets all per-transaction tracking: warm sets, original and
    /// transient storage, logs, refund, journal.
    pub fn begin_transaction(&mut self) {
        self.journal.clear();
        self.checkpoints.clear();
        self.warm_addresses.clear();
        self.warm_slots.clear();
        self.original_storage.clear();
        self.transient_storage.clear();
        self.created_accounts.clear();
        self.logs.clear();
        self.refund = 0;
    }

    /// Removes the accounts selfdestructed by a committed transaction.
    pub fn process_destroyed_accounts(&mut self) {
        for address in std::mem::take(&mut self.destroyed_accounts) {
            self.accounts.remove(&address);
            self.storage_roots.remove(&address);
            self.dirty_storage.remove(&address);
        }
    }

    // === State root and export =============================================

    /// Computes the state root: re-hashes the storage trie of every account
    /// with dirty storage, then the account trie. Empty accounts are absent
    /// (EIP-161).
    pub fn state_root(&mut self) -> Result<H256, VMError> {
        let dirty = std::mem::take(&mut self.dirty_storage);
        let storage_roots = &mut self.storage_roots;
        let mut account_trie = Trie::new();
        for (address, account) in &self.accounts {
            if account.is_empty() {
                continue;
            }
            let storage_root = match storage_roots.get(address) {
                Some(root) if !dirty.contains(address) => *root,
                _ => storage_root(account),
            };
            storage_roots.insert(*address, storage_root);

            let record = AccountState {
                nonce: account.info.nonce,
                balance: account.info.balance,
                storage_root,
                code_hash: account.info.code_hash,
            };
            account_trie
                .insert(
                    keccak_hash(address).as_bytes().to_vec(),
                    record.encode_to_vec(),
                )
                .map_err(|_| VMError::Internal("state trie insert failed"))?;
        }
        Ok(account_trie.hash())
    }

    /// Flattens the world-state into per-account records for the post-state
    /// channel.
    pub fn dump(&self) -> BTreeMap<Address, GenesisAccount> {
        self.accounts
            .iter()
            .filter(|(_, account)| !account.is_empty())
            .map(|(address, account)| {
                let storage = account
                    .storage
                    .iter()
                    .filter(|(_, value)| !value.is_zero())
                    .map(|(key, value)| (*key, *value))
                    .collect();
                let record = GenesisAccount {
                    code: self
                        .code
                        .get(&account.info.code_hash)
                        .cloned()
                        .unwrap_or_default(),
                    storage,
                    balance: account.info.balance,
                    nonce: account.info.nonce,
                };
                (*address, record)
            })
            .collect()
    }
}

/// Root of one account's storage trie: `keccak(slot) -> rlp(value)`, zero
/// slots omitted.
fn storage_root(account: &Account) -> H256 {
    let mut trie = Trie::new();
    for (key, value) in &account.storage {
        if value.is_zero() {
            continue;
        }
        let path = keccak_hash(key.to_big_endian()).as_bytes().to_vec();
        // Insertion into a fresh in-memory trie cannot fail.
        let _ = trie.insert(path, value.encode_to_vec());
    }
    trie.hash()
}
