//! Context opcodes: the transaction- and account-level reads, plus the
//! calldata/code/returndata copies. EXT* opcodes pay EIP-2929 access costs.

use ethereum_types::U256;

use crate::{
    call_frame::CallFrame,
    errors::VMError,
    gas_cost,
    utils::{address_to_word, as_usize, checked_u64, h256_to_u256, word_to_address},
    vm::{OpcodeResult, VM},
};

const CONTINUE: Result<OpcodeResult, VMError> = Ok(OpcodeResult::Continue { pc_increment: 1 });

impl VM<'_> {
    pub fn op_address(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(address_to_word(frame.to))?;
        CONTINUE
    }

    pub fn op_balance(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(frame.stack.pop()?);
        let was_cold = self.db.warm_address(address);
        frame.charge_gas(gas_cost::address_access_cost(was_cold))?;
        frame.stack.push(self.db.get_balance(address))?;
        CONTINUE
    }

    pub fn op_origin(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(address_to_word(self.env.origin))?;
        CONTINUE
    }

    pub fn op_caller(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(address_to_word(frame.caller))?;
        CONTINUE
    }

    pub fn op_callvalue(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(frame.value)?;
        CONTINUE
    }

    pub fn op_calldataload(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let offset = frame.stack.pop()?;
        let mut word = [0u8; 32];
        if let Some(offset) = checked_u64(offset).map(|offset| offset as usize) {
            if offset < frame.calldata.len() {
                let available = (frame.calldata.len() - offset).min(32);
                word[..available].copy_from_slice(&frame.calldata[offset..offset + available]);
            }
        }
        frame.stack.push(U256::from_big_endian(&word))?;
        CONTINUE
    }

    pub fn op_calldatasize(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::from(frame.calldata.len()))?;
        CONTINUE
    }

    pub fn op_calldatacopy(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let dest_offset = frame.stack.pop()?;
        let data_offset = frame.stack.pop()?;
        let size = frame.stack.pop()?;
        let (dest_offset, size) = self.expand_memory(frame, dest_offset, size)?;
        frame.charge_gas(gas_cost::copy_cost(size)?)?;

        let data = copy_padded(&frame.calldata, data_offset, size);
        frame.memory.store_range(dest_offset, &data);
        CONTINUE
    }

    pub fn op_codesize(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::from(frame.code.len()))?;
        CONTINUE
    }

    pub fn op_codecopy(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let dest_offset = frame.stack.pop()?;
        let code_offset = frame.stack.pop()?;
        let size = frame.stack.pop()?;
        let (dest_offset, size) = self.expand_memory(frame, dest_offset, size)?;
        frame.charge_gas(gas_cost::copy_cost(size)?)?;

        let data = copy_padded(&frame.code, code_offset, size);
        frame.memory.store_range(dest_offset, &data);
        CONTINUE
    }

    pub fn op_gasprice(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::from(self.env.gas_price))?;
        CONTINUE
    }

    pub fn op_extcodesize(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(frame.stack.pop()?);
        let was_cold = self.db.warm_address(address);
        frame.charge_gas(gas_cost::address_access_cost(was_cold))?;
        frame.stack.push(U256::from(self.db.get_code_size(address)))?;
        CONTINUE
    }

    pub fn op_extcodecopy(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(frame.stack.pop()?);
        let dest_offset = frame.stack.pop()?;
        let code_offset = frame.stack.pop()?;
        let size = frame.stack.pop()?;

        let was_cold = self.db.warm_address(address);
        frame.charge_gas(gas_cost::address_access_cost(was_cold))?;
        let (dest_offset, size) = self.expand_memory(frame, dest_offset, size)?;
        frame.charge_gas(gas_cost::copy_cost(size)?)?;

        let code = self.db.get_code(address);
        let data = copy_padded(&code, code_offset, size);
        frame.memory.store_range(dest_offset, &data);
        CONTINUE
    }

    pub fn op_returndatasize(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::from(frame.returndata.len()))?;
        CONTINUE
    }

    /// Unlike the other copies, reading past the end of return data is an
    /// exceptional halt (EIP-211).
    pub fn op_returndatacopy(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let dest_offset = frame.stack.pop()?;
        let data_offset = frame.stack.pop()?;
        let size = frame.stack.pop()?;
        let (dest_offset, size) = self.expand_memory(frame, dest_offset, size)?;
        frame.charge_gas(gas_cost::copy_cost(size)?)?;

        let data_offset = as_usize(data_offset).map_err(|_| VMError::ReturnDataOutOfBounds)?;
        let end = data_offset
            .checked_add(size)
            .ok_or(VMError::ReturnDataOutOfBounds)?;
        if end > frame.returndata.len() {
            return Err(VMError::ReturnDataOutOfBounds);
        }
        if size > 0 {
            let data = frame.returndata.slice(data_offset..end);
            frame.memory.store_range(dest_offset, &data);
        }
        CONTINUE
    }

    /// EXTCODEHASH: keccak of the account's code, zero for dead accounts.
    pub fn op_extcodehash(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(frame.stack.pop()?);
        let was_cold = self.db.warm_address(address);
        frame.charge_gas(gas_cost::address_access_cost(was_cold))?;
        let hash = if self.db.account_is_empty(address) {
            U256::zero()
        } else {
            h256_to_u256(self.db.get_code_hash(address))
        };
        frame.stack.push(hash)?;
        CONTINUE
    }
}

/// Reads `size` bytes at `offset` from `source`, zero-padded past its end.
/// An offset beyond any real buffer only ever copies zeros.
fn copy_padded(source: &[u8], offset: U256, size: usize) -> Vec<u8> {
    let mut out = vec![0u8; size];
    if let Some(offset) = checked_u64(offset).map(|offset| offset as usize) {
        if offset < source.len() {
            let available = (source.len() - offset).min(size);
            out[..available].copy_from_slice(&source[offset..offset + available]);
        }
    }
    out
}
