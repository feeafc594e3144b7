//! ADD, MUL, SUB, DIV, SDIV, MOD, SMOD, ADDMOD, MULMOD, EXP, SIGNEXTEND.
//!
//! All arithmetic is modulo 2^256; division and modulus by zero yield zero
//! (the EVM rule, not the host's trap). Signed operations interpret bit 255
//! as the sign, two's-complement, only at these boundaries.

use ethereum_types::{U256, U512};

use crate::{
    call_frame::CallFrame,
    errors::VMError,
    gas_cost,
    vm::{OpcodeResult, VM},
};

const CONTINUE: Result<OpcodeResult, VMError> = Ok(OpcodeResult::Continue { pc_increment: 1 });

fn is_negative(value: U256) -> bool {
    value.bit(255)
}

fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

impl VM<'_> {
    pub fn op_add(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let augend = frame.stack.pop()?;
        let addend = frame.stack.pop()?;
        frame.stack.push(augend.overflowing_add(addend).0)?;
        CONTINUE
    }

    pub fn op_mul(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let multiplicand = frame.stack.pop()?;
        let multiplier = frame.stack.pop()?;
        frame.stack.push(multiplicand.overflowing_mul(multiplier).0)?;
        CONTINUE
    }

    pub fn op_sub(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let minuend = frame.stack.pop()?;
        let subtrahend = frame.stack.pop()?;
        frame.stack.push(minuend.overflowing_sub(subtrahend).0)?;
        CONTINUE
    }

    pub fn op_div(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let dividend = frame.stack.pop()?;
        let divisor = frame.stack.pop()?;
        frame
            .stack
            .push(dividend.checked_div(divisor).unwrap_or_default())?;
        CONTINUE
    }

    pub fn op_sdiv(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let dividend = frame.stack.pop()?;
        let divisor = frame.stack.pop()?;
        frame.stack.push(sdiv(dividend, divisor))?;
        CONTINUE
    }

    pub fn op_mod(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let dividend = frame.stack.pop()?;
        let divisor = frame.stack.pop()?;
        frame
            .stack
            .push(dividend.checked_rem(divisor).unwrap_or_default())?;
        CONTINUE
    }

    pub fn op_smod(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let dividend = frame.stack.pop()?;
        let divisor = frame.stack.pop()?;
        let result = if divisor.is_zero() {
            U256::zero()
        } else {
            // Sign of the result follows the dividend.
            let unsigned = abs(dividend)
                .checked_rem(abs(divisor))
                .unwrap_or_default();
            if is_negative(dividend) {
                negate(unsigned)
            } else {
                unsigned
            }
        };
        frame.stack.push(result)?;
        CONTINUE
    }

    pub fn op_addmod(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let augend = frame.stack.pop()?;
        let addend = frame.stack.pop()?;
        let modulus = frame.stack.pop()?;
        frame.stack.push(if modulus.is_zero() {
            U256::zero()
        } else {
            let sum = U512::from(augend) + U512::from(addend);
            u512_mod_to_u256(sum, modulus)
        })?;
        CONTINUE
    }

    pub fn op_mulmod(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let multiplicand = frame.stack.pop()?;
        let multiplier = frame.stack.pop()?;
        let modulus = frame.stack.pop()?;
        frame.stack.push(if modulus.is_zero() {
            U256::zero()
        } else {
            let product = U512::from(multiplicand) * U512::from(multiplier);
            u512_mod_to_u256(product, modulus)
        })?;
        CONTINUE
    }

    pub fn op_exp(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let base = frame.stack.pop()?;
        let exponent = frame.stack.pop()?;
        frame.charge_gas(gas_cost::exp_dynamic_cost(exponent))?;
        frame.stack.push(base.overflowing_pow(exponent).0)?;
        CONTINUE
    }

    pub fn op_signextend(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let byte_index = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let result = if byte_index >= U256::from(31) {
            value
        } else {
            let sign_bit = byte_index.low_u64() as usize * 8 + 7;
            let mask = (U256::one() << (sign_bit + 1)) - U256::one();
            if value.bit(sign_bit) {
                value | !mask
            } else {
                value & mask
            }
        };
        frame.stack.push(result)?;
        CONTINUE
    }
}

fn abs(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

fn sdiv(dividend: U256, divisor: U256) -> U256 {
    if divisor.is_zero() {
        return U256::zero();
    }
    // MIN / -1 overflows back to MIN.
    let min_negative = U256::one() << 255;
    if dividend == min_negative && divisor == U256::max_value() {
        return min_negative;
    }
    let quotient = abs(dividend)
        .checked_div(abs(divisor))
        .unwrap_or_default();
    if is_negative(dividend) != is_negative(divisor) {
        negate(quotient)
    } else {
        quotient
    }
}

fn u512_mod_to_u256(value: U512, modulus: U256) -> U256 {
    let result = value % U512::from(modulus);
    U256::try_from(result).unwrap_or_default()
}
