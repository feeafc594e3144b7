use ethereum_types::{Address, H256, U256};
use tern_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};

pub type AccessList = Vec<AccessListItem>;

/// EIP-2930 access list entry: an address and the storage keys to pre-warm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<H256>,
}

impl RLPEncode for AccessListItem {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.storage_keys)
            .finish();
    }
}

impl RLPDecode for AccessListItem {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (storage_keys, decoder) = decoder.decode_field("storage_keys")?;
        Ok((
            Self {
                address,
                storage_keys,
            },
            decoder.finish()?,
        ))
    }
}

pub type AuthorizationList = Vec<AuthorizationTuple>;

/// EIP-7702 authorization: lets `address`'s code be set as the authority's
/// delegation target.
#[derive(Debug, Clone, Default, Copy, PartialEq, Eq)]
pub struct AuthorizationTuple {
    pub chain_id: U256,
    pub address: Address,
    pub nonce: u64,
    pub y_parity: U256,
    pub r_signature: U256,
    pub s_signature: U256,
}

impl RLPEncode for AuthorizationTuple {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.address)
            .encode_field(&self.nonce)
            .encode_field(&self.y_parity)
            .encode_field(&self.r_signature)
            .encode_field(&self.s_signature)
            .finish();
    }
}

impl RLPDecode for AuthorizationTuple {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (chain_id, decoder) = decoder.decode_field("chain_id")?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (y_parity, decoder) = decoder.decode_field("y_parity")?;
        let (r_signature, decoder) = decoder.decode_field("r_signature")?;
        let (s_signature, decoder) = decoder.decode_field("s_signature")?;
        Ok((
            Self {
                chain_id,
                address,
                nonce,
                y_parity,
                r_signature,
                s_signature,
            },
            decoder.finish()?,
        ))
    }
}
