use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RLPDecodeError {
    #[error("Input too short")]
    InputTooShort,
    #[error("Length encoding has leading zeros")]
    LeadingZeros,
    #[error("Non-canonical encoding")]
    NonCanonical,
    #[error("Integer does not fit the target type")]
    IntegerOverflow,
    #[error("List payload length does not match its items")]
    ListLengthMismatch,
    #[error("Invalid RLP prefix")]
    InvalidPrefix,
    #[error("Decoded string has the wrong size")]
    WrongSize,
    #[error("Malformed boolean: expected 0x80 or 0x01, got 0x{0:02x}")]
    MalformedBoolean(u8),
    #[error("Expected RLP string, got list")]
    UnexpectedList,
    #[error("Expected RLP list, got string")]
    UnexpectedString,
    #[error("{0}")]
    Custom(String),
}
