//! A thin bytecode builder for tests: assemble programs from named
//! operations instead of raw hex.

use bytes::Bytes;
use ethereum_types::U256;

use crate::opcodes::Opcode;

#[derive(Debug, Clone)]
pub enum Operation {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    Sdiv,
    Mod,
    SMod,
    Addmod,
    Mulmod,
    Exp,
    SignExtend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Keccak256,
    Address,
    Balance,
    Origin,
    Caller,
    Callvalue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    Prevrandao,
    GasLimit,
    ChainId,
    SelfBalance,
    BaseFee,
    BlobHash,
    BlobBaseFee,
    Pop,
    Mload,
    Mstore,
    Mstore8,
    Sload,
    Sstore,
    Jump,
    Jumpi,
    PC,
    Msize,
    Gas,
    Jumpdest,
    Tload,
    Tstore,
    Mcopy,
    Push0,
    /// `(width, value)`: PUSH1..PUSH32 with the value's low `width` bytes.
    Push((u8, U256)),
    Dup(u8),
    Swap(u8),
    Log(u8),
    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    Invalid,
    SelfDestruct,
}

impl Operation {
    pub fn to_bytecode(&self) -> Vec<u8> {
        match self {
            Operation::Stop => vec![Opcode::STOP as u8],
            Operation::Add => vec![Opcode::ADD as u8],
            Operation::Mul => vec![Opcode::MUL as u8],
            Operation::Sub => vec![Opcode::SUB as u8],
            Operation::Div => vec![Opcode::DIV as u8],
            Operation::Sdiv => vec![Opcode::SDIV as u8],
            Operation::Mod => vec![Opcode::MOD as u8],
            Operation::SMod => vec![Opcode::SMOD as u8],
            Operation::Addmod => vec![Opcode::ADDMOD as u8],
            Operation::Mulmod => vec![Opcode::MULMOD as u8],
            Operation::Exp => vec![Opcode::EXP as u8],
            Operation::SignExtend => vec![Opcode::SIGNEXTEND as u8],
            Operation::Lt => vec![Opcode::LT as u8],
            Operation::Gt => vec![Opcode::GT as u8],
            Operation::Slt => vec![Opcode::SLT as u8],
            Operation::Sgt => vec![Opcode::SGT as u8],
            Operation::Eq => vec![Opcode::EQ as u8],
            Operation::IsZero => vec![Opcode::ISZERO as u8],
            Operation::And => vec![Opcode::AND as u8],
            Operation::Or => vec![Opcode::OR as u8],
            Operation::Xor => vec![Opcode::XOR as u8],
            Operation::Not => vec![Opcode::NOT as u8],
            Operation::Byte => vec![Opcode::BYTE as u8],
            Operation::Shl => vec![Opcode::SHL as u8],
            Operation::Shr => vec![Opcode::SHR as u8],
            Operation::Sar => vec![Opcode::SAR as u8],
            Operation::Keccak256 => vec![Opcode::KECCAK256 as u8],
            Operation::Address => vec![Opcode::ADDRESS as u8],
            Operation::Balance => vec![Opcode::BALANCE as u8],
            Operation::Origin => vec![Opcode::ORIGIN as u8],
            Operation::Caller => vec![Opcode::CALLER as u8],
            Operation::Callvalue => vec![Opcode::CALLVALUE as u8],
            Operation::CallDataLoad => vec![Opcode::CALLDATALOAD as u8],
            Operation::CallDataSize => vec![Opcode::CALLDATASIZE as u8],
            Operation::CallDataCopy => vec![Opcode::CALLDATACOPY as u8],
            Operation::CodeSize => vec![Opcode::CODESIZE as u8],
            Operation::CodeCopy => vec![Opcode::CODECOPY as u8],
            Operation::GasPrice => vec![Opcode::GASPRICE as u8],
            Operation::ExtCodeSize => vec![Opcode::EXTCODESIZE as u8],
            Operation::ExtCodeCopy => vec![Opcode::EXTCODECOPY as u8],
            Operation::ReturnDataSize => vec![Opcode::RETURNDATASIZE as u8],
            Operation::ReturnDataCopy => vec![Opcode::RETURNDATACOPY as u8],
            Operation::ExtCodeHash => vec![Opcode::EXTCODEHASH as u8],
            Operation::BlockHash => vec![Opcode::BLOCKHASH as u8],
            Operation::Coinbase => vec![Opcode::COINBASE as u8],
            Operation::Timestamp => vec![Opcode::TIMESTAMP as u8],
            Operation::Number => vec![Opcode::NUMBER as u8],
            Operation::Prevrandao => vec![Opcode::PREVRANDAO as u8],
            Operation::GasLimit => vec![Opcode::GASLIMIT as u8],
            Operation::ChainId => vec![Opcode::CHAINID as u8],
            Operation::SelfBalance => vec![Opcode::SELFBALANCE as u8],
            Operation::BaseFee => vec![Opcode::BASEFEE as u8],
            Operation::BlobHash => vec![Opcode::BLOBHASH as u8],
            Operation::BlobBaseFee => vec![Opcode::BLOBBASEFEE as u8],
            Operation::Pop => vec![Opcode::POP as u8],
            Operation::Mload => vec![Opcode::MLOAD as u8],
            Operation::Mstore => vec![Opcode::MSTORE as u8],
            Operation::Mstore8 => vec![Opcode::MSTORE8 as u8],
            Operation::Sload => vec![Opcode::SLOAD as u8],
            Operation::Sstore => vec![Opcode::SSTORE as u8],
            Operation::Jump => vec![Opcode::JUMP as u8],
            Operation::Jumpi => vec![Opcode::JUMPI as u8],
            Operation::PC => vec![Opcode::PC as u8],
            Operation::Msize => vec![Opcode::MSIZE as u8],
            Operation::Gas => vec![Opcode::GAS as u8],
            Operation::Jumpdest => vec![Opcode::JUMPDEST as u8],
            Operation::Tload => vec![Opcode::TLOAD as u8],
            Operation::Tstore => vec![Opcode::TSTORE as u8],
            Operation::Mcopy => vec![Opcode::MCOPY as u8],
            Operation::Push0 => vec![Opcode::PUSH0 as u8],
            Operation::Push((width, value)) => {
                let width = (*width).clamp(1, 32) as usize;
                let mut bytecode = vec![Opcode::PUSH0 as u8 + width as u8];
                let be = value.to_big_endian();
                bytecode.extend_from_slice(&be[32 - width..]);
                bytecode
            }
            Operation::Dup(depth) => vec![Opcode::DUP1 as u8 + (depth - 1).min(15)],
            Operation::Swap(depth) => vec![Opcode::SWAP1 as u8 + (depth - 1).min(15)],
            Operation::Log(topics) => vec![Opcode::LOG0 as u8 + (*topics).min(4)],
            Operation::Create => vec![Opcode::CREATE as u8],
            Operation::Call => vec![Opcode::CALL as u8],
            Operation::CallCode => vec![Opcode::CALLCODE as u8],
            Operation::Return => vec![Opcode::RETURN as u8],
            Operation::DelegateCall => vec![Opcode::DELEGATECALL as u8],
            Operation::Create2 => vec![Opcode::CREATE2 as u8],
            Operation::StaticCall => vec![Opcode::STATICCALL as u8],
            Operation::Revert => vec![Opcode::REVERT as u8],
            Operation::Invalid => vec![Opcode::INVALID as u8],
            Operation::SelfDestruct => vec![Opcode::SELFDESTRUCT as u8],
        }
    }
}

/// Assembles a program.
pub fn ops_to_bytecode(operations: &[Operation]) -> Bytes {
    operations
        .iter()
        .flat_map(Operation::to_bytecode)
        .collect::<Vec<u8>>()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_emits_width_and_immediate() {
        let code = ops_to_bytecode(&[
            Operation::Push((1, U256::from(0x0a))),
            Operation::Push((2, U256::from(0x0102))),
            Operation::Add,
            Operation::Stop,
        ]);
        assert_eq!(code.as_ref(), &[0x60, 0x0a, 0x61, 0x01, 0x02, 0x01, 0x00]);
    }

    #[test]
    fn dup_swap_log_offsets() {
        assert_eq!(Operation::Dup(1).to_bytecode(), vec![0x80]);
        assert_eq!(Operation::Dup(16).to_bytecode(), vec![0x8f]);
        assert_eq!(Operation::Swap(3).to_bytecode(), vec![0x92]);
        assert_eq!(Operation::Log(4).to_bytecode(), vec![0xa4]);
    }
}
