//! LT, GT, SLT, SGT, EQ, ISZERO, AND, OR, XOR, NOT, BYTE, SHL, SHR, SAR.

use ethereum_types::U256;

use crate::{
    call_frame::CallFrame,
    errors::VMError,
    vm::{OpcodeResult, VM},
};

const CONTINUE: Result<OpcodeResult, VMError> = Ok(OpcodeResult::Continue { pc_increment: 1 });

fn bool_to_word(value: bool) -> U256 {
    if value { U256::one() } else { U256::zero() }
}

fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Signed comparison: flip the sign bit and compare unsigned.
fn signed_lt(lhs: U256, rhs: U256) -> bool {
    match (is_negative(lhs), is_negative(rhs)) {
        (true, false) => true,
        (false, true) => false,
        _ => lhs < rhs,
    }
}

impl VM<'_> {
    pub fn op_lt(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(bool_to_word(lhs < rhs))?;
        CONTINUE
    }

    pub fn op_gt(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(bool_to_word(lhs > rhs))?;
        CONTINUE
    }

    pub fn op_slt(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(bool_to_word(signed_lt(lhs, rhs)))?;
        CONTINUE
    }

    pub fn op_sgt(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(bool_to_word(signed_lt(rhs, lhs)))?;
        CONTINUE
    }

    pub fn op_eq(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(bool_to_word(lhs == rhs))?;
        CONTINUE
    }

    pub fn op_iszero(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let value = frame.stack.pop()?;
        frame.stack.push(bool_to_word(value.is_zero()))?;
        CONTINUE
    }

    pub fn op_and(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(lhs & rhs)?;
        CONTINUE
    }

    pub fn op_or(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(lhs | rhs)?;
        CONTINUE
    }

    pub fn op_xor(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(lhs ^ rhs)?;
        CONTINUE
    }

    pub fn op_not(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let value = frame.stack.pop()?;
        frame.stack.push(!value)?;
        CONTINUE
    }

    /// BYTE: the `index`-th byte of `value`, counted from the most
    /// significant end.
    pub fn op_byte(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let index = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let result = if index < U256::from(32) {
            U256::from(value.byte(31 - index.low_u64() as usize))
        } else {
            U256::zero()
        };
        frame.stack.push(result)?;
        CONTINUE
    }

    pub fn op_shl(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let shift = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let result = if shift < U256::from(256) {
            value << shift.low_u64() as usize
        } else {
            U256::zero()
        };
        frame.stack.push(result)?;
        CONTINUE
    }

    pub fn op_shr(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let shift = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let result = if shift < U256::from(256) {
            value >> shift.low_u64() as usize
        } else {
            U256::zero()
        };
        frame.stack.push(result)?;
        CONTINUE
    }

    /// SAR: arithmetic shift right, filling with the sign bit.
    pub fn op_sar(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let shift = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let negative = is_negative(value);
        let result = if shift >= U256::from(256) {
            if negative { U256::max_value() } else { U256::zero() }
        } else {
            let shift = shift.low_u64() as usize;
            let mut shifted = value >> shift;
            if negative && shift > 0 {
                // Fill the vacated high bits with ones.
                shifted = shifted | (U256::max_value() << (256 - shift));
            }
            shifted
        };
        frame.stack.push(result)?;
        CONTINUE
    }
}
