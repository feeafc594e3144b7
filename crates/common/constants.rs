/// One gwei, in wei. Withdrawal amounts come in gwei.
pub const GWEI_TO_WEI: u64 = 1_000_000_000;

/// Gas consumed by a single blob (EIP-4844), 2^17.
pub const GAS_PER_BLOB: u64 = 1 << 17;

/// Number of recent block hashes BLOCKHASH can reach back to.
pub const LAST_AVAILABLE_BLOCK_LIMIT: u64 = 256;
