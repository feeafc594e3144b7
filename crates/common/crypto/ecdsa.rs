//! secp256k1 signature recovery.
//!
//! The curve arithmetic is the `secp256k1` crate's; this module maps
//! (message, parity, r, s) to the signing Ethereum address.

use ethereum_types::{Address, H256};
use secp256k1::{
    Message, Secp256k1,
    ecdsa::{RecoverableSignature, RecoveryId},
};

use crate::{error::CryptoError, keccak::keccak_hash};

/// Recovers the address that signed `message`.
///
/// `odd_y_parity` is the normalized recovery bit (0 or 1); legacy `v`
/// encodings must be normalized by the caller before reaching this point.
pub fn recover_address(
    message: &H256,
    odd_y_parity: bool,
    r: &H256,
    s: &H256,
) -> Result<Address, CryptoError> {
    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(r.as_bytes());
    compact[32..].copy_from_slice(s.as_bytes());

    let recovery_id = RecoveryId::from_i32(odd_y_parity as i32)
        .map_err(|_| CryptoError::InvalidRecoveryId)?;
    let signature = RecoverableSignature::from_compact(&compact, recovery_id)
        .map_err(|_| CryptoError::InvalidSignature)?;
    let message = Message::from_digest(message.0);

    // Contexts are not sharable across threads, one per recovery (cheap
    // relative to the recovery itself).
    let public_key = Secp256k1::verification_only()
        .recover_ecdsa(&message, &signature)
        .map_err(|_| CryptoError::InvalidSignature)?;

    // address = keccak256(uncompressed pubkey without the 0x04 tag)[12..]
    let digest = keccak_hash(&public_key.serialize_uncompressed()[1..]);
    Ok(Address::from_slice(&digest.as_bytes()[12..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn recovers_known_signer() {
        // Signature produced with the well-known test key
        // 0x4646464646464646464646464646464646464646464646464646464646464646
        // over the EIP-155 example signing hash, expecting its address.
        let message = H256(hex!(
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        ));
        let r = H256(hex!(
            "28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276"
        ));
        let s = H256(hex!(
            "67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        ));
        let address = recover_address(&message, false, &r, &s).unwrap();
        assert_eq!(
            address,
            Address::from(hex!("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"))
        );
    }

    #[test]
    fn rejects_zero_signature() {
        let message = H256::zero();
        let zero = H256::zero();
        assert!(recover_address(&message, false, &zero, &zero).is_err());
    }
}
