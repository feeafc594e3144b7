use bytes::Bytes;
use ethereum_types::{Address, Bloom, BloomInput, H256};
use serde::{Deserialize, Serialize};
use tern_crypto::keccak::keccak_hash;
use tern_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use tern_trie::{Trie, TrieError};

use crate::types::TxType;

/// A log emitted by a LOG0..LOG4 opcode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    #[serde(with = "crate::serde_utils::bytes")]
    pub data: Bytes,
}

impl RLPEncode for Log {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.topics)
            .encode_bytes(&self.data)
            .finish();
    }
}

impl RLPDecode for Log {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (topics, decoder) = decoder.decode_field("topics")?;
        let (data, decoder) = decoder.decode_field("data")?;
        Ok((
            Self {
                address,
                topics,
                data,
            },
            decoder.finish()?,
        ))
    }
}

/// Result of a transaction.
///
/// The consensus fields are the ones the receipts root commits to; the rest
/// (hash, per-tx gas, created address) travel to the result channel only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub succeeded: bool,
    /// Gas used by this and all previous transactions in the block.
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub cumulative_gas_used: u64,
    pub logs: Vec<Log>,
    pub tx_hash: H256,
    /// Gas this transaction used, refunds already deducted.
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub gas_used: u64,
    /// Address of the deployed contract, for create transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
}

impl Receipt {
    pub fn bloom(&self) -> Bloom {
        bloom_from_logs(&self.logs)
    }

    /// Consensus encoding: `rlp([succeeded, cumulative_gas, bloom, logs])`
    /// for legacy receipts, prefixed with the type byte otherwise.
    pub fn encode_inner(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if self.tx_type != TxType::Legacy {
            buf.push(self.tx_type as u8);
        }
        Encoder::new(&mut buf)
            .encode_field(&self.succeeded)
            .encode_field(&self.cumulative_gas_used)
            .encode_field(&self.bloom())
            .encode_field(&self.logs)
            .finish();
        buf
    }
}

pub fn bloom_from_logs(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::zero();
    for log in logs {
        bloom.accrue(BloomInput::Hash(&keccak_hash(log.address).0));
        for topic in &log.topics {
            bloom.accrue(BloomInput::Hash(&keccak_hash(topic).0));
        }
    }
    bloom
}

/// Root of the ordered trie over `(rlp(index), consensus encoding)`.
pub fn compute_receipts_root(receipts: &[Receipt]) -> Result<H256, TrieError> {
    Trie::compute_hash_from_unsorted_iter(
        receipts
            .iter()
            .enumerate()
            .map(|(index, receipt)| (index.encode_to_vec(), receipt.encode_inner())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_trie::EMPTY_TRIE_HASH;

    fn receipt_with_logs(logs: Vec<Log>) -> Receipt {
        Receipt {
            tx_type: TxType::Legacy,
            succeeded: true,
            cumulative_gas_used: 21000,
            logs,
            tx_hash: H256::zero(),
            gas_used: 21000,
            contract_address: None,
        }
    }

    #[test]
    fn empty_receipt_list_root() {
        assert_eq!(compute_receipts_root(&[]).unwrap(), *EMPTY_TRIE_HASH);
    }

    #[test]
    fn log_free_receipt_has_zero_bloom() {
        assert_eq!(receipt_with_logs(vec![]).bloom(), Bloom::zero());
    }

    #[test]
    fn bloom_covers_address_and_topics() {
        let log = Log {
            address: Address::repeat_byte(0x42),
            topics: vec![H256::repeat_byte(0x01)],
            data: Bytes::new(),
        };
        let bloom = bloom_from_logs(std::slice::from_ref(&log));
        assert_ne!(bloom, Bloom::zero());
        assert!(bloom.contains_input(BloomInput::Hash(&keccak_hash(log.address).0)));
        assert!(bloom.contains_input(BloomInput::Hash(&keccak_hash(log.topics[0]).0)));
    }

    #[test]
    fn typed_receipt_encoding_is_prefixed() {
        let mut receipt = receipt_with_logs(vec![]);
        receipt.tx_type = TxType::EIP1559;
        let encoded = receipt.encode_inner();
        assert_eq!(encoded[0], 0x02);

        receipt.tx_type = TxType::Legacy;
        let legacy = receipt.encode_inner();
        assert_eq!(&encoded[1..], legacy.as_slice());
    }

    #[test]
    fn log_rlp_roundtrip() {
        let log = Log {
            address: Address::repeat_byte(0x42),
            topics: vec![H256::repeat_byte(0x01), H256::repeat_byte(0x02)],
            data: Bytes::from_static(b"payload"),
        };
        let encoded = log.encode_to_vec();
        assert_eq!(Log::decode(&encoded).unwrap(), log);
    }
}
