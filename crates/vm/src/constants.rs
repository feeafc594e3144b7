/// Maximum operand stack depth.
pub const STACK_LIMIT: usize = 1024;

/// Maximum call depth.
pub const CALL_DEPTH_LIMIT: usize = 1024;

/// EVM word size in bytes.
pub const WORD_SIZE: usize = 32;

/// Gas stipend forwarded to the callee of a value-bearing CALL.
pub const CALL_STIPEND: u64 = 2300;

/// EIP-170 deployed-code size ceiling.
pub const MAX_CODE_SIZE: usize = 0x6000;

/// EIP-3860 init-code size ceiling (2 × MAX_CODE_SIZE).
pub const MAX_INITCODE_SIZE: usize = 0xc000;

/// EIP-7702 delegation designator prefix: 0xef0100 || address.
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];
