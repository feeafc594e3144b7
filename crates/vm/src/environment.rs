use ethereum_types::{Address, H256};
use tern_common::types::{BlockEnv, Fork};

/// Per-transaction execution environment: everything the context opcodes
/// read that is not frame-local.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Sender of the transaction (ORIGIN).
    pub origin: Address,
    /// Effective gas price the sender pays (GASPRICE).
    pub gas_price: u64,
    pub chain_id: u64,
    pub fork: Fork,
    /// Versioned hashes of the transaction's blobs (BLOBHASH).
    pub blob_hashes: Vec<H256>,
    pub block: BlockEnv,
}
