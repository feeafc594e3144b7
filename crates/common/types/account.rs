use ethereum_types::{H256, U256};
use lazy_static::lazy_static;
use tern_crypto::keccak::keccak_hash;
use tern_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use tern_trie::EMPTY_TRIE_HASH;

lazy_static! {
    /// keccak256 of the empty byte string, the code hash of codeless accounts.
    pub static ref EMPTY_CODE_HASH: H256 = keccak_hash(b"");
}

/// The account record stored in the state trie:
/// `rlp([nonce, balance, storage_root, code_hash])`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            storage_root: *EMPTY_TRIE_HASH,
            code_hash: *EMPTY_CODE_HASH,
        }
    }
}

impl AccountState {
    /// EIP-161: an account is empty iff it has zero nonce, zero balance and
    /// no code. Empty accounts are absent from the state trie.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == *EMPTY_CODE_HASH
    }
}

impl RLPEncode for AccountState {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.balance)
            .encode_field(&self.storage_root)
            .encode_field(&self.code_hash)
            .finish();
    }
}

impl RLPDecode for AccountState {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (balance, decoder) = decoder.decode_field("balance")?;
        let (storage_root, decoder) = decoder.decode_field("storage_root")?;
        let (code_hash, decoder) = decoder.decode_field("code_hash")?;
        Ok((
            Self {
                nonce,
                balance,
                storage_root,
                code_hash,
            },
            decoder.finish()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn empty_code_hash_constant() {
        assert_eq!(
            EMPTY_CODE_HASH.0,
            hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn default_account_is_empty() {
        assert!(AccountState::default().is_empty());
        let funded = AccountState {
            balance: U256::one(),
            ..Default::default()
        };
        assert!(!funded.is_empty());
    }

    #[test]
    fn rlp_roundtrip() {
        let account = AccountState {
            nonce: 7,
            balance: U256::from(1_000_000_000u64),
            ..Default::default()
        };
        let encoded = account.encode_to_vec();
        assert_eq!(AccountState::decode(&encoded).unwrap(), account);
    }
}
