use super::{
    constants::{RLP_EMPTY_LIST, RLP_NULL},
    error::RLPDecodeError,
};
use bytes::Bytes;
use ethereum_types::{Address, Bloom, H160, H256, U256};

/// Trait for decoding RLP-encoded data.
///
/// Implementors provide [`decode_unfinished`](RLPDecode::decode_unfinished),
/// which decodes one item off the front of the input and returns it together
/// with the remaining bytes. [`decode`](RLPDecode::decode) additionally
/// requires the input to be fully consumed.
///
/// Decoding is strict: every rejection the canonical format allows us to make
/// (truncated input, non-minimal lengths, leading zeros, wrong sizes) is an
/// error rather than a lenient accept.
pub trait RLPDecode: Sized {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError>;

    fn decode(rlp: &[u8]) -> Result<Self, RLPDecodeError> {
        let (decoded, remaining) = Self::decode_unfinished(rlp)?;
        if !remaining.is_empty() {
            return Err(RLPDecodeError::ListLengthMismatch);
        }
        Ok(decoded)
    }
}

/// Decodes one RLP item off the front of `data`.
///
/// Returns `(is_list, payload, rest)`: whether the item is a list, the item's
/// payload without its header, and the bytes following the item.
pub fn decode_rlp_item(data: &[u8]) -> Result<(bool, &[u8], &[u8]), RLPDecodeError> {
    let first = *data.first().ok_or(RLPDecodeError::InputTooShort)?;
    match first {
        0x00..=0x7f => Ok((false, &data[..1], &data[1..])),
        0x80..=0xb7 => {
            let len = (first - RLP_NULL) as usize;
            let payload = data.get(1..1 + len).ok_or(RLPDecodeError::InputTooShort)?;
            // A single byte below 0x80 must be encoded as itself.
            if len == 1 && payload[0] < RLP_NULL {
                return Err(RLPDecodeError::NonCanonical);
            }
            Ok((false, payload, &data[1 + len..]))
        }
        0xb8..=0xbf => {
            let (len, header) = decode_long_length(data, first - 0xb7)?;
            let payload = data
                .get(header..header + len)
                .ok_or(RLPDecodeError::InputTooShort)?;
            Ok((false, payload, &data[header + len..]))
        }
        0xc0..=0xf7 => {
            let len = (first - RLP_EMPTY_LIST) as usize;
            let payload = data.get(1..1 + len).ok_or(RLPDecodeError::InputTooShort)?;
            Ok((true, payload, &data[1 + len..]))
        }
        0xf8..=0xff => {
            let (len, header) = decode_long_length(data, first - 0xf7)?;
            let payload = data
                .get(header..header + len)
                .ok_or(RLPDecodeError::InputTooShort)?;
            Ok((true, payload, &data[header + len..]))
        }
    }
}

/// Decodes the big-endian payload length of a long-form item and validates
/// its canonicality. Returns `(payload_len, header_len)`.
fn decode_long_length(data: &[u8], len_of_len: u8) -> Result<(usize, usize), RLPDecodeError> {
    let len_of_len = len_of_len as usize;
    let len_bytes = data
        .get(1..1 + len_of_len)
        .ok_or(RLPDecodeError::InputTooShort)?;
    if len_bytes[0] == 0 {
        return Err(RLPDecodeError::LeadingZeros);
    }
    if len_of_len > std::mem::size_of::<usize>() {
        return Err(RLPDecodeError::IntegerOverflow);
    }
    let mut len = 0usize;
    for byte in len_bytes {
        len = (len << 8) | *byte as usize;
    }
    // Payloads below 56 bytes must use the short form.
    if len < 56 {
        return Err(RLPDecodeError::NonCanonical);
    }
    Ok((len, 1 + len_of_len))
}

/// Splits the first RLP item (header included) from the rest of the input.
pub fn get_item_with_prefix(data: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    let (_, _, rest) = decode_rlp_item(data)?;
    Ok(data.split_at(data.len() - rest.len()))
}

/// Decodes a byte-string item, rejecting lists.
pub fn decode_bytes(data: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    let (is_list, payload, rest) = decode_rlp_item(data)?;
    if is_list {
        return Err(RLPDecodeError::UnexpectedList);
    }
    Ok((payload, rest))
}

/// Left-pads minimal big-endian integer digits to an `N`-byte array.
/// Rejects leading zeros (non-minimal) and digits that do not fit.
fn static_left_pad<const N: usize>(bytes: &[u8]) -> Result<[u8; N], RLPDecodeError> {
    if bytes.len() > N {
        return Err(RLPDecodeError::IntegerOverflow);
    }
    if bytes.first() == Some(&0) {
        return Err(RLPDecodeError::LeadingZeros);
    }
    let mut padded = [0; N];
    padded[N - bytes.len()..].copy_from_slice(bytes);
    Ok(padded)
}

impl RLPDecode for bool {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let first = *rlp.first().ok_or(RLPDecodeError::InputTooShort)?;
        let value = match first {
            RLP_NULL => false,
            0x01 => true,
            byte => return Err(RLPDecodeError::MalformedBoolean(byte)),
        };
        Ok((value, &rlp[1..]))
    }
}

macro_rules! impl_decode_uint {
    ($($t:ty),*) => {
        $(impl RLPDecode for $t {
            fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
                let (bytes, rest) = decode_bytes(rlp)?;
                let padded = static_left_pad(bytes)?;
                Ok((<$t>::from_be_bytes(padded), rest))
            }
        })*
    };
}

impl_decode_uint!(u8, u16, u32, u64, u128, usize);

impl RLPDecode for U256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        let padded: [u8; 32] = static_left_pad(bytes)?;
        Ok((U256::from_big_endian(&padded), rest))
    }
}

impl<const N: usize> RLPDecode for [u8; N] {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        let value = bytes.try_into().map_err(|_| RLPDecodeError::WrongSize)?;
        Ok((value, rest))
    }
}

impl RLPDecode for Bytes {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        Ok((Bytes::copy_from_slice(bytes), rest))
    }
}

impl RLPDecode for String {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        let value = String::from_utf8(bytes.to_vec()).map_err(|_| RLPDecodeError::NonCanonical)?;
        Ok((value, rest))
    }
}

impl RLPDecode for Address {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        if bytes.len() != 20 {
            return Err(RLPDecodeError::WrongSize);
        }
        Ok((H160::from_slice(bytes), rest))
    }
}

impl RLPDecode for H256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        if bytes.len() != 32 {
            return Err(RLPDecodeError::WrongSize);
        }
        Ok((H256::from_slice(bytes), rest))
    }
}

impl RLPDecode for Bloom {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        if bytes.len() != 256 {
            return Err(RLPDecodeError::WrongSize);
        }
        Ok((Bloom::from_slice(bytes), rest))
    }
}

// A `Vec<T>` is decoded as a list of homogeneous items. Byte strings go
// through the `Bytes`/`[u8; N]` impls instead.
impl<T: RLPDecode> RLPDecode for Vec<T> {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, mut payload, rest) = decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::UnexpectedString);
        }
        let mut items = Vec::new();
        while !payload.is_empty() {
            let (item, remaining) = T::decode_unfinished(payload)?;
            items.push(item);
            payload = remaining;
        }
        Ok((items, rest))
    }
}

impl<T1: RLPDecode, T2: RLPDecode> RLPDecode for (T1, T2) {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, payload, rest) = decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::UnexpectedString);
        }
        let (first, payload) = T1::decode_unfinished(payload)?;
        let (second, payload) = T2::decode_unfinished(payload)?;
        if !payload.is_empty() {
            return Err(RLPDecodeError::ListLengthMismatch);
        }
        Ok(((first, second), rest))
    }
}

impl<T1: RLPDecode, T2: RLPDecode, T3: RLPDecode> RLPDecode for (T1, T2, T3) {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, payload, rest) = decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::UnexpectedString);
        }
        let (first, payload) = T1::decode_unfinished(payload)?;
        let (second, payload) = T2::decode_unfinished(payload)?;
        let (third, payload) = T3::decode_unfinished(payload)?;
        if !payload.is_empty() {
            return Err(RLPDecodeError::ListLengthMismatch);
        }
        Ok(((first, second, third), rest))
    }
}
