use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use tern_crypto::keccak::{Keccak256, keccak_hash};
use tern_rlp::structs::Encoder;

use crate::errors::VMError;

/// Low 160 bits of a word, as an address.
pub fn word_to_address(word: U256) -> Address {
    Address::from_slice(&word.to_big_endian()[12..])
}

pub fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

pub fn u256_to_h256(value: U256) -> H256 {
    H256(value.to_big_endian())
}

pub fn h256_to_u256(value: H256) -> U256 {
    U256::from_big_endian(value.as_bytes())
}

/// The word as a `u64`, if it fits.
pub fn checked_u64(value: U256) -> Option<u64> {
    (value.bits() <= 64).then(|| value.low_u64())
}

/// Converts a stack word to a buffer offset/size. Values that do not fit a
/// `usize` cannot be paid for, so they surface as out-of-gas.
pub fn as_usize(value: U256) -> Result<usize, VMError> {
    checked_u64(value)
        .and_then(|value| usize::try_from(value).ok())
        .ok_or(VMError::OutOfGas)
}

/// CREATE address: `keccak256(rlp([sender, nonce]))[12..]`.
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let mut buf = Vec::new();
    Encoder::new(&mut buf)
        .encode_field(&sender)
        .encode_field(&nonce)
        .finish();
    word_to_address(h256_to_u256(keccak_hash(&buf)))
}

/// CREATE2 address:
/// `keccak256(0xff || sender || salt || keccak256(init_code))[12..]`.
pub fn calculate_create2_address(sender: Address, salt: U256, init_code: &Bytes) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update([0xff]);
    hasher.update(sender);
    hasher.update(salt.to_big_endian());
    hasher.update(keccak_hash(init_code));
    word_to_address(h256_to_u256(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn word_address_roundtrip() {
        let address = Address::repeat_byte(0xab);
        assert_eq!(word_to_address(address_to_word(address)), address);
        // high bits are dropped
        assert_eq!(word_to_address(U256::max_value()), Address::repeat_byte(0xff));
    }

    #[test]
    fn create_address_known_vector() {
        // First deployment from 0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0
        // (nonce 0) famously yields the CryptoKitties-era test vector.
        let sender = Address::from(hex!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"));
        assert_eq!(
            calculate_create_address(sender, 0),
            Address::from(hex!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"))
        );
        assert_eq!(
            calculate_create_address(sender, 1),
            Address::from(hex!("343c43a37d37dff08ae8c4a11544c718abb4fcf8"))
        );
    }

    #[test]
    fn create2_address_known_vector() {
        // Example 0 from EIP-1014.
        let sender = Address::zero();
        let init_code = Bytes::from_static(&hex!("00"));
        assert_eq!(
            calculate_create2_address(sender, U256::zero(), &init_code),
            Address::from(hex!("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38"))
        );
    }
}
