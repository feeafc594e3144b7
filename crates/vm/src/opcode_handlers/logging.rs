use bytes::Bytes;
use tern_common::types::Log;

use crate::{
    call_frame::CallFrame,
    errors::VMError,
    gas_cost,
    opcodes::Opcode,
    utils::u256_to_h256,
    vm::{OpcodeResult, VM},
};

impl VM<'_> {
    /// LOG0..LOG4: append a log entry. Forbidden in static context; the log
    /// buffer is part of the journal, so a revert drops the entry again.
    pub fn op_log(&mut self, frame: &mut CallFrame, opcode: Opcode) -> Result<OpcodeResult, VMError> {
        if frame.is_static {
            return Err(VMError::WriteProtection);
        }
        let topic_count = opcode
            .log_topic_count()
            .ok_or(VMError::Internal("log without topic count"))?;

        let offset = frame.stack.pop()?;
        let size = frame.stack.pop()?;
        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            topics.push(u256_to_h256(frame.stack.pop()?));
        }

        let (offset, size) = self.expand_memory(frame, offset, size)?;
        frame.charge_gas(gas_cost::log_dynamic_cost(topic_count, size)?)?;

        self.db.add_log(Log {
            address: frame.to,
            topics,
            data: Bytes::from(frame.memory.load_range(offset, size)),
        });
        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
