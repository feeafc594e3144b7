use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use tern_crypto::{CryptoError, ecdsa::recover_address, keccak::keccak_hash};
use tern_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};

use crate::constants::GAS_PER_BLOB;
use crate::types::{AccessList, AuthorizationList, AuthorizationTuple};

/// EIP-2718 transaction type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum TxType {
    Legacy = 0x00,
    EIP2930 = 0x01,
    EIP1559 = 0x02,
    EIP4844 = 0x03,
    EIP7702 = 0x04,
}

impl TxType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Legacy),
            0x01 => Some(Self::EIP2930),
            0x02 => Some(Self::EIP1559),
            0x03 => Some(Self::EIP4844),
            0x04 => Some(Self::EIP7702),
            _ => None,
        }
    }
}

/// The destination of a transaction: a message call or a contract creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TxKind {
    Call(Address),
    #[default]
    Create,
}

impl RLPEncode for TxKind {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        match self {
            TxKind::Call(address) => address.encode(buf),
            TxKind::Create => [].encode(buf),
        }
    }
}

impl RLPDecode for TxKind {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = tern_rlp::decode::decode_bytes(rlp)?;
        match bytes.len() {
            0 => Ok((TxKind::Create, rest)),
            20 => Ok((TxKind::Call(Address::from_slice(bytes)), rest)),
            _ => Err(RLPDecodeError::WrongSize),
        }
    }
}

/// `[nonce, gas_price, gas_limit, to, value, data, v, r, s]`, with EIP-155
/// chain-id recovery out of `v`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u64,
    pub gas: u64,
    pub to: TxKind,
    pub value: U256,
    pub data: Bytes,
    pub v: U256,
    pub r: U256,
    pub s: U256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EIP2930Transaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_limit: u64,
    pub to: TxKind,
    pub value: U256,
    pub data: Bytes,
    pub access_list: AccessList,
    pub signature_y_parity: bool,
    pub signature_r: U256,
    pub signature_s: U256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EIP1559Transaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u64,
    pub max_fee_per_gas: u64,
    pub gas_limit: u64,
    pub to: TxKind,
    pub value: U256,
    pub data: Bytes,
    pub access_list: AccessList,
    pub signature_y_parity: bool,
    pub signature_r: U256,
    pub signature_s: U256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EIP4844Transaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u64,
    pub max_fee_per_gas: u64,
    pub gas: u64,
    /// Blob transactions cannot create contracts.
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub access_list: AccessList,
    pub max_fee_per_blob_gas: U256,
    pub blob_versioned_hashes: Vec<H256>,
    pub signature_y_parity: bool,
    pub signature_r: U256,
    pub signature_s: U256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EIP7702Transaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u64,
    pub max_fee_per_gas: u64,
    pub gas_limit: u64,
    /// Set-code transactions cannot create contracts.
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub access_list: AccessList,
    pub authorization_list: AuthorizationList,
    pub signature_y_parity: bool,
    pub signature_r: U256,
    pub signature_s: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    LegacyTransaction(LegacyTransaction),
    EIP2930Transaction(EIP2930Transaction),
    EIP1559Transaction(EIP1559Transaction),
    EIP4844Transaction(EIP4844Transaction),
    EIP7702Transaction(EIP7702Transaction),
}

impl Transaction {
    pub fn tx_type(&self) -> TxType {
        match self {
            Transaction::LegacyTransaction(_) => TxType::Legacy,
            Transaction::EIP2930Transaction(_) => TxType::EIP2930,
            Transaction::EIP1559Transaction(_) => TxType::EIP1559,
            Transaction::EIP4844Transaction(_) => TxType::EIP4844,
            Transaction::EIP7702Transaction(_) => TxType::EIP7702,
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            Transaction::LegacyTransaction(tx) => tx.nonce,
            Transaction::EIP2930Transaction(tx) => tx.nonce,
            Transaction::EIP1559Transaction(tx) => tx.nonce,
            Transaction::EIP4844Transaction(tx) => tx.nonce,
            Transaction::EIP7702Transaction(tx) => tx.nonce,
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            Transaction::LegacyTransaction(tx) => tx.gas,
            Transaction::EIP2930Transaction(tx) => tx.gas_limit,
            Transaction::EIP1559Transaction(tx) => tx.gas_limit,
            Transaction::EIP4844Transaction(tx) => tx.gas,
            Transaction::EIP7702Transaction(tx) => tx.gas_limit,
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            Transaction::LegacyTransaction(tx) => tx.value,
            Transaction::EIP2930Transaction(tx) => tx.value,
            Transaction::EIP1559Transaction(tx) => tx.value,
            Transaction::EIP4844Transaction(tx) => tx.value,
            Transaction::EIP7702Transaction(tx) => tx.value,
        }
    }

    pub fn to(&self) -> TxKind {
        match self {
            Transaction::LegacyTransaction(tx) => tx.to,
            Transaction::EIP2930Transaction(tx) => tx.to,
            Transaction::EIP1559Transaction(tx) => tx.to,
            Transaction::EIP4844Transaction(tx) => TxKind::Call(tx.to),
            Transaction::EIP7702Transaction(tx) => TxKind::Call(tx.to),
        }
    }

    pub fn is_contract_creation(&self) -> bool {
        matches!(self.to(), TxKind::Create)
    }

    pub fn data(&self) -> &Bytes {
        match self {
            Transaction::LegacyTransaction(tx) => &tx.data,
            Transaction::EIP2930Transaction(tx) => &tx.data,
            Transaction::EIP1559Transaction(tx) => &tx.data,
            Transaction::EIP4844Transaction(tx) => &tx.data,
            Transaction::EIP7702Transaction(tx) => &tx.data,
        }
    }

    pub fn access_list(&self) -> &[crate::types::AccessListItem] {
        match self {
            Transaction::LegacyTransaction(_) => &[],
            Transaction::EIP2930Transaction(tx) => &tx.access_list,
            Transaction::EIP1559Transaction(tx) => &tx.access_list,
            Transaction::EIP4844Transaction(tx) => &tx.access_list,
            Transaction::EIP7702Transaction(tx) => &tx.access_list,
        }
    }

    pub fn authorization_list(&self) -> Option<&AuthorizationList> {
        match self {
            Transaction::EIP7702Transaction(tx) => Some(&tx.authorization_list),
            _ => None,
        }
    }

    pub fn blob_versioned_hashes(&self) -> &[H256] {
        match self {
            Transaction::EIP4844Transaction(tx) => &tx.blob_versioned_hashes,
            _ => &[],
        }
    }

    pub fn max_fee_per_blob_gas(&self) -> Option<U256> {
        match self {
            Transaction::EIP4844Transaction(tx) => Some(tx.max_fee_per_blob_gas),
            _ => None,
        }
    }

    /// Blob gas consumed by this transaction (EIP-4844).
    pub fn blob_gas(&self) -> u64 {
        GAS_PER_BLOB * self.blob_versioned_hashes().len() as u64
    }

    /// The chain id the transaction commits to, if any. Legacy transactions
    /// only carry one through EIP-155 `v` values.
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Transaction::LegacyTransaction(tx) => tx.chain_id(),
            Transaction::EIP2930Transaction(tx) => Some(tx.chain_id),
            Transaction::EIP1559Transaction(tx) => Some(tx.chain_id),
            Transaction::EIP4844Transaction(tx) => Some(tx.chain_id),
            Transaction::EIP7702Transaction(tx) => Some(tx.chain_id),
        }
    }

    /// The fee ceiling: gas price for pre-1559 types, max fee otherwise.
    pub fn max_fee_per_gas(&self) -> u64 {
        match self {
            Transaction::LegacyTransaction(tx) => tx.gas_price,
            Transaction::EIP2930Transaction(tx) => tx.gas_price,
            Transaction::EIP1559Transaction(tx) => tx.max_fee_per_gas,
            Transaction::EIP4844Transaction(tx) => tx.max_fee_per_gas,
            Transaction::EIP7702Transaction(tx) => tx.max_fee_per_gas,
        }
    }

    pub fn max_priority_fee_per_gas(&self) -> Option<u64> {
        match self {
            Transaction::LegacyTransaction(_) | Transaction::EIP2930Transaction(_) => None,
            Transaction::EIP1559Transaction(tx) => Some(tx.max_priority_fee_per_gas),
            Transaction::EIP4844Transaction(tx) => Some(tx.max_priority_fee_per_gas),
            Transaction::EIP7702Transaction(tx) => Some(tx.max_priority_fee_per_gas),
        }
    }

    /// The gas price actually paid under `base_fee`:
    /// `base_fee + min(max_priority_fee, max_fee − base_fee)` for EIP-1559
    /// types, the fixed gas price before that. `None` if the max fee cannot
    /// cover the base fee.
    pub fn effective_gas_price(&self, base_fee: u64) -> Option<u64> {
        match self.max_priority_fee_per_gas() {
            None => Some(self.max_fee_per_gas()),
            Some(max_priority) => {
                let max_fee = self.max_fee_per_gas();
                let priority = max_priority.min(max_fee.checked_sub(base_fee)?);
                base_fee.checked_add(priority)
            }
        }
    }

    /// keccak256 of the canonical (wire) encoding.
    pub fn compute_hash(&self) -> H256 {
        keccak_hash(self.encode_canonical_to_vec())
    }
}

// === Canonical (wire) encoding =============================================

impl Transaction {
    /// Encodes the transaction envelope: the bare RLP list for legacy
    /// transactions, `type_byte || RLP(fields)` for typed ones.
    pub fn encode_canonical(&self, buf: &mut dyn bytes::BufMut) {
        if let Transaction::LegacyTransaction(tx) = self {
            tx.encode(buf);
            return;
        }
        buf.put_u8(self.tx_type() as u8);
        match self {
            Transaction::LegacyTransaction(_) => unreachable!(),
            Transaction::EIP2930Transaction(tx) => tx.encode(buf),
            Transaction::EIP1559Transaction(tx) => tx.encode(buf),
            Transaction::EIP4844Transaction(tx) => tx.encode(buf),
            Transaction::EIP7702Transaction(tx) => tx.encode(buf),
        }
    }

    pub fn encode_canonical_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_canonical(&mut buf);
        buf
    }

    /// Decodes a transaction envelope. The first byte selects the variant:
    /// `>= 0xc0` is a legacy RLP list, `0x01..=0x04` a typed payload,
    /// anything else is rejected.
    pub fn decode_canonical(bytes: &[u8]) -> Result<Self, RLPDecodeError> {
        let first = *bytes.first().ok_or(RLPDecodeError::InputTooShort)?;
        match first {
            0xc0.. => Ok(Self::LegacyTransaction(LegacyTransaction::decode(bytes)?)),
            0x01 => Ok(Self::EIP2930Transaction(EIP2930Transaction::decode(
                &bytes[1..],
            )?)),
            0x02 => Ok(Self::EIP1559Transaction(EIP1559Transaction::decode(
                &bytes[1..],
            )?)),
            0x03 => Ok(Self::EIP4844Transaction(EIP4844Transaction::decode(
                &bytes[1..],
            )?)),
            0x04 => Ok(Self::EIP7702Transaction(EIP7702Transaction::decode(
                &bytes[1..],
            )?)),
            _ => Err(RLPDecodeError::InvalidPrefix),
        }
    }
}

impl RLPEncode for LegacyTransaction {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_bytes(&self.data)
            .encode_field(&self.v)
            .encode_field(&self.r)
            .encode_field(&self.s)
            .finish();
    }
}

impl RLPDecode for LegacyTransaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (gas_price, decoder) = decoder.decode_field("gas_price")?;
        let (gas, decoder) = decoder.decode_field("gas")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (v, decoder) = decoder.decode_field("v")?;
        let (r, decoder) = decoder.decode_field("r")?;
        let (s, decoder) = decoder.decode_field("s")?;
        Ok((
            Self {
                nonce,
                gas_price,
                gas,
                to,
                value,
                data,
                v,
                r,
                s,
            },
            decoder.finish()?,
        ))
    }
}

impl RLPEncode for EIP2930Transaction {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas_limit)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_bytes(&self.data)
            .encode_field(&self.access_list)
            .encode_field(&self.signature_y_parity)
            .encode_field(&self.signature_r)
            .encode_field(&self.signature_s)
            .finish();
    }
}

impl RLPDecode for EIP2930Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (chain_id, decoder) = decoder.decode_field("chain_id")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (gas_price, decoder) = decoder.decode_field("gas_price")?;
        let (gas_limit, decoder) = decoder.decode_field("gas_limit")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (access_list, decoder) = decoder.decode_field("access_list")?;
        let (signature_y_parity, decoder) = decoder.decode_field("signature_y_parity")?;
        let (signature_r, decoder) = decoder.decode_field("signature_r")?;
        let (signature_s, decoder) = decoder.decode_field("signature_s")?;
        Ok((
            Self {
                chain_id,
                nonce,
                gas_price,
                gas_limit,
                to,
                value,
                data,
                access_list,
                signature_y_parity,
                signature_r,
                signature_s,
            },
            decoder.finish()?,
        ))
    }
}

impl RLPEncode for EIP1559Transaction {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.max_priority_fee_per_gas)
            .encode_field(&self.max_fee_per_gas)
            .encode_field(&self.gas_limit)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_bytes(&self.data)
            .encode_field(&self.access_list)
            .encode_field(&self.signature_y_parity)
            .encode_field(&self.signature_r)
            .encode_field(&self.signature_s)
            .finish();
    }
}

impl RLPDecode for EIP1559Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (chain_id, decoder) = decoder.decode_field("chain_id")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (max_priority_fee_per_gas, decoder) =
            decoder.decode_field("max_priority_fee_per_gas")?;
        let (max_fee_per_gas, decoder) = decoder.decode_field("max_fee_per_gas")?;
        let (gas_limit, decoder) = decoder.decode_field("gas_limit")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (access_list, decoder) = decoder.decode_field("access_list")?;
        let (signature_y_parity, decoder) = decoder.decode_field("signature_y_parity")?;
        let (signature_r, decoder) = decoder.decode_field("signature_r")?;
        let (signature_s, decoder) = decoder.decode_field("signature_s")?;
        Ok((
            Self {
                chain_id,
                nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas_limit,
                to,
                value,
                data,
                access_list,
                signature_y_parity,
                signature_r,
                signature_s,
            },
            decoder.finish()?,
        ))
    }
}

impl RLPEncode for EIP4844Transaction {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.max_priority_fee_per_gas)
            .encode_field(&self.max_fee_per_gas)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_bytes(&self.data)
            .encode_field(&self.access_list)
            .encode_field(&self.max_fee_per_blob_gas)
            .encode_field(&self.blob_versioned_hashes)
            .encode_field(&self.signature_y_parity)
            .encode_field(&self.signature_r)
            .encode_field(&self.signature_s)
            .finish();
    }
}

impl RLPDecode for EIP4844Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (chain_id, decoder) = decoder.decode_field("chain_id")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (max_priority_fee_per_gas, decoder) =
            decoder.decode_field("max_priority_fee_per_gas")?;
        let (max_fee_per_gas, decoder) = decoder.decode_field("max_fee_per_gas")?;
        let (gas, decoder) = decoder.decode_field("gas")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (access_list, decoder) = decoder.decode_field("access_list")?;
        let (max_fee_per_blob_gas, decoder) = decoder.decode_field("max_fee_per_blob_gas")?;
        let (blob_versioned_hashes, decoder) = decoder.decode_field("blob_versioned_hashes")?;
        let (signature_y_parity, decoder) = decoder.decode_field("signature_y_parity")?;
        let (signature_r, decoder) = decoder.decode_field("signature_r")?;
        let (signature_s, decoder) = decoder.decode_field("signature_s")?;
        Ok((
            Self {
                chain_id,
                nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas,
                to,
                value,
                data,
                access_list,
                max_fee_per_blob_gas,
                blob_versioned_hashes,
                signature_y_parity,
                signature_r,
                signature_s,
            },
            decoder.finish()?,
        ))
    }
}

impl RLPEncode for EIP7702Transaction {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.max_priority_fee_per_gas)
            .encode_field(&self.max_fee_per_gas)
            .encode_field(&self.gas_limit)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_bytes(&self.data)
            .encode_field(&self.access_list)
            .encode_field(&self.authorization_list)
            .encode_field(&self.signature_y_parity)
            .encode_field(&self.signature_r)
            .encode_field(&self.signature_s)
            .finish();
    }
}

impl RLPDecode for EIP7702Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (chain_id, decoder) = decoder.decode_field("chain_id")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (max_priority_fee_per_gas, decoder) =
            decoder.decode_field("max_priority_fee_per_gas")?;
        let (max_fee_per_gas, decoder) = decoder.decode_field("max_fee_per_gas")?;
        let (gas_limit, decoder) = decoder.decode_field("gas_limit")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (access_list, decoder) = decoder.decode_field("access_list")?;
        let (authorization_list, decoder) = decoder.decode_field("authorization_list")?;
        let (signature_y_parity, decoder) = decoder.decode_field("signature_y_parity")?;
        let (signature_r, decoder) = decoder.decode_field("signature_r")?;
        let (signature_s, decoder) = decoder.decode_field("signature_s")?;
        Ok((
            Self {
                chain_id,
                nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas_limit,
                to,
                value,
                data,
                access_list,
                authorization_list,
                signature_y_parity,
                signature_r,
                signature_s,
            },
            decoder.finish()?,
        ))
    }
}

// === Signing hashes and sender recovery ====================================

impl LegacyTransaction {
    /// EIP-155 chain id, if `v` encodes one (`v = chain_id * 2 + 35 + parity`).
    pub fn chain_id(&self) -> Option<u64> {
        let v = self.v.low_u64();
        (self.v.bits() <= 64 && v >= 35).then(|| (v - 35) / 2)
    }

    pub fn signing_hash(&self) -> H256 {
        let mut buf = Vec::new();
        let encoder = Encoder::new(&mut buf)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_bytes(&self.data);
        match self.chain_id() {
            // EIP-155: [..., chain_id, 0, 0]
            Some(chain_id) => encoder
                .encode_field(&chain_id)
                .encode_field(&0u8)
                .encode_field(&0u8)
                .finish(),
            None => encoder.finish(),
        }
        keccak_hash(&buf)
    }
}

impl EIP2930Transaction {
    pub fn signing_hash(&self) -> H256 {
        let mut buf = vec![TxType::EIP2930 as u8];
        Encoder::new(&mut buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas_limit)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_bytes(&self.data)
            .encode_field(&self.access_list)
            .finish();
        keccak_hash(&buf)
    }
}

impl EIP1559Transaction {
    pub fn signing_hash(&self) -> H256 {
        let mut buf = vec![TxType::EIP1559 as u8];
        Encoder::new(&mut buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.max_priority_fee_per_gas)
            .encode_field(&self.max_fee_per_gas)
            .encode_field(&self.gas_limit)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_bytes(&self.data)
            .encode_field(&self.access_list)
            .finish();
        keccak_hash(&buf)
    }
}

impl EIP4844Transaction {
    pub fn signing_hash(&self) -> H256 {
        let mut buf = vec![TxType::EIP4844 as u8];
        Encoder::new(&mut buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.max_priority_fee_per_gas)
            .encode_field(&self.max_fee_per_gas)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_bytes(&self.data)
            .encode_field(&self.access_list)
            .encode_field(&self.max_fee_per_blob_gas)
            .encode_field(&self.blob_versioned_hashes)
            .finish();
        keccak_hash(&buf)
    }
}

impl EIP7702Transaction {
    pub fn signing_hash(&self) -> H256 {
        let mut buf = vec![TxType::EIP7702 as u8];
        Encoder::new(&mut buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.max_priority_fee_per_gas)
            .encode_field(&self.max_fee_per_gas)
            .encode_field(&self.gas_limit)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_bytes(&self.data)
            .encode_field(&self.access_list)
            .encode_field(&self.authorization_list)
            .finish();
        keccak_hash(&buf)
    }
}

impl AuthorizationTuple {
    /// `keccak256(0x05 || rlp([chain_id, address, nonce]))` (EIP-7702).
    pub fn signing_hash(&self) -> H256 {
        let mut buf = vec![0x05];
        Encoder::new(&mut buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.address)
            .encode_field(&self.nonce)
            .finish();
        keccak_hash(&buf)
    }

    /// Recovers the authority that signed this authorization.
    pub fn recover_authority(&self) -> Result<Address, CryptoError> {
        let parity = match self.y_parity {
            v if v.is_zero() => false,
            v if v == U256::one() => true,
            _ => return Err(CryptoError::InvalidRecoveryId),
        };
        recover_address(
            &self.signing_hash(),
            parity,
            &u256_to_h256(&self.r_signature),
            &u256_to_h256(&self.s_signature),
        )
    }
}

impl Transaction {
    pub fn signing_hash(&self) -> H256 {
        match self {
            Transaction::LegacyTransaction(tx) => tx.signing_hash(),
            Transaction::EIP2930Transaction(tx) => tx.signing_hash(),
            Transaction::EIP1559Transaction(tx) => tx.signing_hash(),
            Transaction::EIP4844Transaction(tx) => tx.signing_hash(),
            Transaction::EIP7702Transaction(tx) => tx.signing_hash(),
        }
    }

    /// Recovers the sender address from the signature.
    pub fn sender(&self) -> Result<Address, CryptoError> {
        let (parity, r, s) = match self {
            Transaction::LegacyTransaction(tx) => {
                let v = tx.v.low_u64();
                let parity = match v {
                    27 | 28 => v == 28,
                    35.. if tx.v.bits() <= 64 => (v - 35) % 2 == 1,
                    _ => return Err(CryptoError::InvalidRecoveryId),
                };
                (parity, tx.r, tx.s)
            }
            Transaction::EIP2930Transaction(tx) => {
                (tx.signature_y_parity, tx.signature_r, tx.signature_s)
            }
            Transaction::EIP1559Transaction(tx) => {
                (tx.signature_y_parity, tx.signature_r, tx.signature_s)
            }
            Transaction::EIP4844Transaction(tx) => {
                (tx.signature_y_parity, tx.signature_r, tx.signature_s)
            }
            Transaction::EIP7702Transaction(tx) => {
                (tx.signature_y_parity, tx.signature_r, tx.signature_s)
            }
        };
        if r.is_zero() || s.is_zero() {
            return Err(CryptoError::InvalidSignature);
        }
        recover_address(
            &self.signing_hash(),
            parity,
            &u256_to_h256(&r),
            &u256_to_h256(&s),
        )
    }
}

fn u256_to_h256(value: &U256) -> H256 {
    H256(value.to_big_endian())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// The EIP-155 example transaction, signed with the private key
    /// 0x4646...46 on chain id 1.
    fn eip155_example() -> (Vec<u8>, LegacyTransaction) {
        let raw = hex!(
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a7640000"
            "8025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f"
            "761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        )
        .to_vec();
        let tx = LegacyTransaction {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas: 21000,
            to: TxKind::Call(Address::from(hex!("3535353535353535353535353535353535353535"))),
            value: U256::from(10).pow(18.into()),
            data: Bytes::new(),
            v: U256::from(37),
            r: U256::from_big_endian(&hex!(
                "28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276"
            )),
            s: U256::from_big_endian(&hex!(
                "67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
            )),
        };
        (raw, tx)
    }

    #[test]
    fn decode_legacy_envelope() {
        let (raw, expected) = eip155_example();
        let decoded = Transaction::decode_canonical(&raw).unwrap();
        assert_eq!(decoded, Transaction::LegacyTransaction(expected));
        assert_eq!(decoded.encode_canonical_to_vec(), raw);
    }

    #[test]
    fn eip155_signing_hash() {
        let (_, tx) = eip155_example();
        assert_eq!(tx.chain_id(), Some(1));
        assert_eq!(
            tx.signing_hash().0,
            hex!("daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53")
        );
    }

    #[test]
    fn eip155_sender_recovery() {
        let (raw, _) = eip155_example();
        let tx = Transaction::decode_canonical(&raw).unwrap();
        assert_eq!(
            tx.sender().unwrap(),
            Address::from(hex!("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"))
        );
    }

    #[test]
    fn typed_envelope_roundtrip() {
        let tx = Transaction::EIP1559Transaction(EIP1559Transaction {
            chain_id: 1,
            nonce: 3,
            max_priority_fee_per_gas: 2_000_000_000,
            max_fee_per_gas: 30_000_000_000,
            gas_limit: 100_000,
            to: TxKind::Call(Address::repeat_byte(0x11)),
            value: U256::from(1234),
            data: Bytes::from_static(&[0xca, 0xfe]),
            access_list: vec![crate::types::AccessListItem {
                address: Address::repeat_byte(0x22),
                storage_keys: vec![H256::repeat_byte(0x33)],
            }],
            signature_y_parity: true,
            signature_r: U256::one(),
            signature_s: U256::one(),
        });
        let encoded = tx.encode_canonical_to_vec();
        assert_eq!(encoded[0], 0x02);
        assert_eq!(Transaction::decode_canonical(&encoded).unwrap(), tx);
    }

    #[test]
    fn create_has_empty_to_field() {
        let tx = Transaction::LegacyTransaction(LegacyTransaction {
            nonce: 0,
            gas_price: 1,
            gas: 53000,
            to: TxKind::Create,
            value: U256::zero(),
            data: Bytes::from_static(&[0x00]),
            v: U256::from(27),
            r: U256::one(),
            s: U256::one(),
        });
        assert!(tx.is_contract_creation());
        let encoded = tx.encode_canonical_to_vec();
        assert_eq!(Transaction::decode_canonical(&encoded).unwrap(), tx);
    }

    #[test]
    fn invalid_type_byte_fails() {
        assert_eq!(
            Transaction::decode_canonical(&[0x05, 0xc0]),
            Err(RLPDecodeError::InvalidPrefix)
        );
        assert_eq!(
            Transaction::decode_canonical(&[]),
            Err(RLPDecodeError::InputTooShort)
        );
    }

    #[test]
    fn effective_gas_price_caps_priority_fee() {
        let tx = Transaction::EIP1559Transaction(EIP1559Transaction {
            max_priority_fee_per_gas: 10,
            max_fee_per_gas: 100,
            ..Default::default()
        });
        // priority fee fits under the cap
        assert_eq!(tx.effective_gas_price(50), Some(60));
        // cap binds: only max_fee - base_fee left for the tip
        assert_eq!(tx.effective_gas_price(95), Some(100));
        // base fee above max fee
        assert_eq!(tx.effective_gas_price(101), None);
    }
}
