use crate::{
    call_frame::CallFrame,
    errors::VMError,
    opcodes::Opcode,
    vm::{OpcodeResult, VM},
};

impl VM<'_> {
    pub fn op_dup(&mut self, frame: &mut CallFrame, opcode: Opcode) -> Result<OpcodeResult, VMError> {
        let depth = opcode
            .dup_depth()
            .ok_or(VMError::Internal("dup without depth"))?;
        frame.stack.dup(depth)?;
        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
