use ethereum_types::U256;

use crate::{
    call_frame::CallFrame,
    errors::VMError,
    opcodes::Opcode,
    vm::{OpcodeResult, VM},
};

impl VM<'_> {
    pub fn op_push0(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::zero())?;
        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }

    /// PUSHn: read up to `n` immediate bytes, zero-padded on the right when
    /// the code is truncated. The pc advances by `n` either way.
    pub fn op_push(&mut self, frame: &mut CallFrame, opcode: Opcode) -> Result<OpcodeResult, VMError> {
        let n = opcode
            .push_len()
            .ok_or(VMError::Internal("push without width"))?;
        let start = frame.pc + 1;
        let available = frame.code.len().saturating_sub(start).min(n);

        let mut word = [0u8; 32];
        word[32 - n..32 - n + available]
            .copy_from_slice(&frame.code[start..start + available]);
        frame.stack.push(U256::from_big_endian(&word))?;
        Ok(OpcodeResult::Continue { pc_increment: 1 + n })
    }
}
