use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use tern_crypto::ecdsa::recover_address;

use crate::gas_cost::ECRECOVER_COST;

/// ECRECOVER lives at address 0x01.
pub const ECRECOVER_ADDRESS: u64 = 0x01;

/// True for the addresses this VM executes natively instead of as code.
/// Only ECRECOVER is implemented; the remaining precompile addresses behave
/// as ordinary accounts.
pub fn is_precompile(address: &Address) -> bool {
    *address == Address::from_low_u64_be(ECRECOVER_ADDRESS)
}

/// Runs a precompile with `gas` available. Returns the output and the gas
/// left, or `None` when the gas cannot cover the fixed cost (the caller
/// treats that as a failed call consuming the forwarded gas).
pub fn execute(address: &Address, calldata: &Bytes, gas: u64) -> Option<(Bytes, u64)> {
    debug_assert!(is_precompile(address));
    let gas_left = gas.checked_sub(ECRECOVER_COST)?;
    Some((ecrecover(calldata), gas_left))
}

/// input: `hash(32) || v(32) || r(32) || s(32)`, zero-padded on the right.
/// output: the recovered address left-padded to 32 bytes, or empty when the
/// signature does not recover.
fn ecrecover(calldata: &Bytes) -> Bytes {
    let mut input = [0u8; 128];
    let len = calldata.len().min(128);
    input[..len].copy_from_slice(&calldata[..len]);

    let message = H256::from_slice(&input[..32]);
    let v = U256::from_big_endian(&input[32..64]);
    let r = H256::from_slice(&input[64..96]);
    let s = H256::from_slice(&input[96..128]);

    let parity = match v {
        v if v == U256::from(27) => false,
        v if v == U256::from(28) => true,
        _ => return Bytes::new(),
    };
    match recover_address(&message, parity, &r, &s) {
        Ok(address) => {
            let mut padded = [0u8; 32];
            padded[12..].copy_from_slice(address.as_bytes());
            Bytes::copy_from_slice(&padded)
        }
        Err(_) => Bytes::new(),
    }
}
