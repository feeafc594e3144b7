use tern_vm::errors::VMError;
use thiserror::Error;

/// Why a transaction was rejected before execution. The display strings are
/// the messages the rejected list carries.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTransaction {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("nonce too low")]
    NonceTooLow,
    #[error("nonce too high")]
    NonceTooHigh,
    #[error("insufficient balance for gas * price + value")]
    InsufficientBalance,
    #[error("intrinsic gas too low")]
    IntrinsicGas,
    #[error("gas limit exceeds block gas limit")]
    GasLimitExceeded,
    #[error("max fee per gas less than block base fee")]
    MaxFeeTooLow,
    #[error("chain ID mismatch")]
    ChainIdMismatch,
}

/// Fatal block-level failures. Per-transaction EVM failures end up in
/// receipts, not here.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("evm error: {0}")]
    EvmError(#[from] VMError),
    #[error(transparent)]
    TrieError(#[from] tern_trie::TrieError),
    #[error("{0}")]
    Custom(String),
}
