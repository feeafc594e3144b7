// Keep H256, H160, Address, Bloom, U256, U512 from ethereum_types
pub use bytes::Bytes;
pub use ethereum_types::{Address, Bloom, H160, H256, U256, U512};

pub mod constants;
pub mod serde_utils;
pub mod types;
