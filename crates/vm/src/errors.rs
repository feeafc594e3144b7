use bytes::Bytes;
use thiserror::Error;

/// Errors raised while executing a frame.
///
/// Everything except `Internal` is an exceptional halt: it terminates the
/// current frame, consumes all of that frame's gas, and the parent resumes
/// with a 0 pushed on its stack. `Internal` means an invariant of the
/// machine itself broke and aborts the whole execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VMError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("out of gas")]
    OutOfGas,
    #[error("invalid opcode")]
    InvalidOpcode,
    #[error("invalid jump")]
    InvalidJump,
    #[error("write protection")]
    WriteProtection,
    #[error("call depth exceeded")]
    DepthExceeded,
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,
    #[error("deployed code starts with 0xEF")]
    InvalidContractPrefix,
    #[error("deployed code over size limit")]
    CodeSizeExceeded,
    #[error("init code over size limit")]
    InitCodeSizeExceeded,
    #[error("contract address collision")]
    AddressCollision,
    #[error("revert")]
    Revert,
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl VMError {
    /// True for machine-invariant breaches that must abort execution rather
    /// than halt a frame.
    pub fn is_internal(&self) -> bool {
        matches!(self, VMError::Internal(_))
    }
}

/// Outcome of the root frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxResult {
    Success,
    /// Reverted or halted; the error names the reason (`Revert` for an
    /// explicit REVERT opcode).
    Revert(VMError),
}

/// What one transaction's execution did, as reported by the VM.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub result: TxResult,
    /// Gas consumed by the frame machine (intrinsic gas not included).
    pub gas_used: u64,
    /// Refund collected by SSTORE, before the EIP-3529 cap.
    pub gas_refunded: u64,
    /// Return data, or the deployed runtime code for creations.
    pub output: Bytes,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        matches!(self.result, TxResult::Success)
    }
}
