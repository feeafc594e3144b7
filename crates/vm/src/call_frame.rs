use std::rc::Rc;

use bitvec::prelude::{BitVec, bitvec};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

use crate::{memory::Memory, opcodes::Opcode, stack::Stack};

/// How a frame was entered. Determines whose address executes, whether value
/// can move, and how the result is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecType {
    /// Root frame of a transaction.
    #[default]
    TxStart,
    Call,
    StaticCall,
    DelegateCall,
    CallCode,
    Create,
    Create2,
}

impl ExecType {
    pub fn is_create(&self) -> bool {
        matches!(self, ExecType::Create | ExecType::Create2)
    }
}

/// One level of the call stack: program counter, gas, operand stack, memory
/// and the execution context of a single code blob.
#[derive(Debug, Default)]
pub struct CallFrame {
    pub pc: usize,
    pub gas_remaining: u64,
    pub stack: Stack,
    pub memory: Memory,
    pub code: Bytes,
    pub code_hash: H256,
    pub exec_type: ExecType,
    /// No state mutation allowed; set for STATICCALL children and inherited
    /// downward.
    pub is_static: bool,
    pub depth: usize,
    /// msg.sender of this frame.
    pub caller: Address,
    /// Address whose storage/balance this frame acts on (ADDRESS).
    pub to: Address,
    pub value: U256,
    pub calldata: Bytes,
    /// Where the parent wants return data written, in its memory.
    pub return_offset: usize,
    pub return_size: usize,
    /// Return data of the last completed child call (RETURNDATA* opcodes).
    pub returndata: Bytes,
    /// Valid jump destinations, built on the first JUMP and cached by code
    /// hash across frames.
    pub jumpdests: Option<Rc<BitVec>>,
    /// World-state snapshot taken when this frame was entered.
    pub snapshot: usize,
}

impl CallFrame {
    /// Opcode at `pc`; past the end of code everything reads as STOP.
    pub fn current_opcode(&self) -> u8 {
        self.code.get(self.pc).copied().unwrap_or(Opcode::STOP as u8)
    }

    /// Deducts gas, failing with out-of-gas if the frame cannot pay.
    pub fn charge_gas(&mut self, amount: u64) -> Result<(), crate::errors::VMError> {
        self.gas_remaining = self
            .gas_remaining
            .checked_sub(amount)
            .ok_or(crate::errors::VMError::OutOfGas)?;
        Ok(())
    }

    /// True if `target` is a JUMPDEST outside any PUSH immediate.
    pub fn valid_jump(&mut self, target: usize, bitmap: Rc<BitVec>) -> bool {
        let valid = bitmap.get(target).map(|bit| *bit).unwrap_or(false);
        self.jumpdests = Some(bitmap);
        valid
    }
}

/// Scans a code blob and marks every byte that is a real JUMPDEST, skipping
/// PUSH immediates.
pub fn analyze_jumpdests(code: &[u8]) -> BitVec {
    let mut bitmap = bitvec![0; code.len()];
    let mut pc = 0;
    while pc < code.len() {
        let byte = code[pc];
        if byte == Opcode::JUMPDEST as u8 {
            bitmap.set(pc, true);
        }
        // Skip PUSH immediates so data bytes can never be jump targets.
        if (Opcode::PUSH1 as u8..=Opcode::PUSH32 as u8).contains(&byte) {
            pc += (byte - Opcode::PUSH1 as u8) as usize + 1;
        }
        pc += 1;
    }
    bitmap
}
