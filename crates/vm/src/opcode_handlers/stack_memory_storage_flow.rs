//! POP, the memory opcodes, SLOAD/SSTORE, TLOAD/TSTORE, and control flow.

use ethereum_types::U256;

use crate::{
    call_frame::CallFrame,
    errors::VMError,
    gas_cost,
    utils::as_usize,
    vm::{OpcodeResult, VM},
};

const CONTINUE: Result<OpcodeResult, VMError> = Ok(OpcodeResult::Continue { pc_increment: 1 });

impl VM<'_> {
    pub fn op_pop(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.pop()?;
        CONTINUE
    }

    pub fn op_mload(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let offset = frame.stack.pop()?;
        let (offset, _) = self.expand_memory(frame, offset, U256::from(32))?;
        frame.stack.push(frame.memory.load_word(offset))?;
        CONTINUE
    }

    pub fn op_mstore(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let offset = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let (offset, _) = self.expand_memory(frame, offset, U256::from(32))?;
        frame.memory.store_word(offset, value);
        CONTINUE
    }

    pub fn op_mstore8(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let offset = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let (offset, _) = self.expand_memory(frame, offset, U256::one())?;
        frame.memory.store_byte(offset, value.byte(0));
        CONTINUE
    }

    pub fn op_msize(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::from(frame.memory.len()))?;
        CONTINUE
    }

    /// MCOPY (EIP-5656): overlap-safe memory copy.
    pub fn op_mcopy(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let dest_offset = frame.stack.pop()?;
        let src_offset = frame.stack.pop()?;
        let size = frame.stack.pop()?;
        // Expansion covers both ends of the copy.
        let (src_offset, _) = self.expand_memory(frame, src_offset, size)?;
        let (dest_offset, size) = self.expand_memory(frame, dest_offset, size)?;
        frame.charge_gas(gas_cost::copy_cost(size)?)?;
        frame.memory.copy_within(src_offset, dest_offset, size);
        CONTINUE
    }

    pub fn op_sload(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let key = frame.stack.pop()?;
        let was_cold = self.db.warm_slot(frame.to, key);
        frame.charge_gas(gas_cost::sload_cost(was_cold))?;
        frame.stack.push(self.db.get_storage(frame.to, key))?;
        CONTINUE
    }

    /// SSTORE under EIP-2200/3529: cost and refund depend on the slot's
    /// (original, current, new) triple; the EIP-2200 sentry rejects frames
    /// running on stipend-level gas.
    pub fn op_sstore(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        if frame.is_static {
            return Err(VMError::WriteProtection);
        }
        if frame.gas_remaining <= gas_cost::SSTORE_SENTRY {
            return Err(VMError::OutOfGas);
        }

        let key = frame.stack.pop()?;
        let new_value = frame.stack.pop()?;
        let current = self.db.get_storage(frame.to, key);
        let original = self.db.get_original_storage(frame.to, key);
        let was_cold = self.db.warm_slot(frame.to, key);

        frame.charge_gas(gas_cost::sstore_cost(was_cold, original, current, new_value))?;
        self.db
            .add_refund(gas_cost::sstore_refund(original, current, new_value));
        self.db.set_storage(frame.to, key, new_value);
        CONTINUE
    }

    /// TLOAD (EIP-1153): transaction-scoped storage read.
    pub fn op_tload(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let key = frame.stack.pop()?;
        frame.stack.push(self.db.get_transient(frame.to, key))?;
        CONTINUE
    }

    /// TSTORE (EIP-1153): write-protected like SSTORE, cleared at the end of
    /// the transaction.
    pub fn op_tstore(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        if frame.is_static {
            return Err(VMError::WriteProtection);
        }
        let key = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        self.db.set_transient(frame.to, key, value);
        CONTINUE
    }

    pub fn op_jump(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let target = frame.stack.pop()?;
        self.jump_to(frame, target)?;
        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }

    pub fn op_jumpi(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let target = frame.stack.pop()?;
        let condition = frame.stack.pop()?;
        if condition.is_zero() {
            return CONTINUE;
        }
        self.jump_to(frame, target)?;
        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }

    fn jump_to(&mut self, frame: &mut CallFrame, target: U256) -> Result<(), VMError> {
        let bitmap = self.jumpdest_bitmap(frame);
        let target = as_usize(target).map_err(|_| VMError::InvalidJump)?;
        if !frame.valid_jump(target, bitmap) {
            return Err(VMError::InvalidJump);
        }
        frame.pc = target;
        Ok(())
    }

    pub fn op_pc(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::from(frame.pc))?;
        CONTINUE
    }

    pub fn op_gas(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::from(frame.gas_remaining))?;
        CONTINUE
    }
}
