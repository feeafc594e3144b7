use crate::{
    call_frame::CallFrame,
    errors::VMError,
    opcodes::Opcode,
    vm::{OpcodeResult, VM},
};

impl VM<'_> {
    pub fn op_swap(&mut self, frame: &mut CallFrame, opcode: Opcode) -> Result<OpcodeResult, VMError> {
        let depth = opcode
            .swap_depth()
            .ok_or(VMError::Internal("swap without depth"))?;
        frame.stack.swap(depth)?;
        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
