use tern_crypto::keccak::keccak_hash;

use crate::{
    call_frame::CallFrame,
    errors::VMError,
    gas_cost,
    utils::h256_to_u256,
    vm::{OpcodeResult, VM},
};

impl VM<'_> {
    /// KECCAK256: hash a memory region. 30 static + 6 per word + expansion.
    pub fn op_keccak256(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let offset = frame.stack.pop()?;
        let size = frame.stack.pop()?;
        let (offset, size) = self.expand_memory(frame, offset, size)?;
        frame.charge_gas(gas_cost::keccak256_cost(size)?)?;

        let data = frame.memory.load_range(offset, size);
        frame.stack.push(h256_to_u256(keccak_hash(&data)))?;
        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
