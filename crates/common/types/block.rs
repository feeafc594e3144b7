use std::collections::BTreeMap;

use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use tern_rlp::encode::RLPEncode;
use tern_trie::{Trie, TrieError};

use crate::types::Transaction;

/// Execution environment for one block: the `env.json` side of the t8n
/// interface, everything the block-level opcodes and the fee logic read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockEnv {
    pub coinbase: Address,
    pub number: u64,
    pub timestamp: u64,
    pub gas_limit: u64,
    /// Zero before London; the burned per-gas floor after it.
    pub base_fee_per_gas: u64,
    /// PREVRANDAO value (the post-merge DIFFICULTY replacement).
    pub prev_randao: H256,
    pub difficulty: U256,
    /// Blob base fee for BLOBBASEFEE and blob fee charging (Cancun+).
    pub blob_base_fee: U256,
    /// Hashes of prior blocks, for BLOCKHASH.
    pub block_hashes: BTreeMap<u64, H256>,
    /// Withdrawals to apply after all transactions (Shanghai+).
    pub withdrawals: Vec<Withdrawal>,
}

/// A validator withdrawal; `amount` is in gwei.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub index: u64,
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub validator_index: u64,
    pub address: Address,
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub amount: u64,
}

/// Root of the ordered trie over `(rlp(index), canonical tx encoding)`.
pub fn compute_transactions_root(transactions: &[Transaction]) -> Result<H256, TrieError> {
    Trie::compute_hash_from_unsorted_iter(
        transactions
            .iter()
            .enumerate()
            .map(|(index, tx)| (index.encode_to_vec(), tx.encode_canonical_to_vec())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_trie::EMPTY_TRIE_HASH;

    #[test]
    fn empty_transactions_root() {
        assert_eq!(compute_transactions_root(&[]).unwrap(), *EMPTY_TRIE_HASH);
    }
}
