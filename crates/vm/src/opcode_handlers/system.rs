//! The system opcodes: the CALL family, CREATE/CREATE2, RETURN, REVERT and
//! SELFDESTRUCT.
//!
//! The CALL/CREATE handlers never recurse: they validate, charge, and hand a
//! parameter block to the driver, which pushes the child frame and re-enters
//! the dispatch loop.

use bytes::Bytes;
use ethereum_types::U256;

use crate::{
    call_frame::{CallFrame, ExecType},
    constants::{CALL_STIPEND, MAX_INITCODE_SIZE},
    errors::VMError,
    gas_cost::{
        self, CALL_NEW_ACCOUNT_COST, CALL_VALUE_COST, COLD_ACCOUNT_ACCESS_COST,
        KECCAK256_WORD_COST, SELFDESTRUCT_COST, SELFDESTRUCT_NEW_ACCOUNT_COST,
    },
    utils::{calculate_create_address, calculate_create2_address, word_to_address},
    vm::{CallParams, CreateParams, HaltReason, OpcodeResult, VM},
};

impl VM<'_> {
    pub fn op_call(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        self.generic_call(frame, ExecType::Call)
    }

    pub fn op_callcode(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        self.generic_call(frame, ExecType::CallCode)
    }

    pub fn op_delegatecall(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        self.generic_call(frame, ExecType::DelegateCall)
    }

    pub fn op_staticcall(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        self.generic_call(frame, ExecType::StaticCall)
    }

    fn generic_call(
        &mut self,
        frame: &mut CallFrame,
        exec_type: ExecType,
    ) -> Result<OpcodeResult, VMError> {
        let gas = frame.stack.pop()?;
        let code_address = word_to_address(frame.stack.pop()?);
        let value = match exec_type {
            ExecType::Call | ExecType::CallCode => frame.stack.pop()?,
            // DELEGATECALL runs with the parent's value, STATICCALL with none.
            ExecType::DelegateCall => frame.value,
            _ => U256::zero(),
        };
        let args_offset = frame.stack.pop()?;
        let args_size = frame.stack.pop()?;
        let return_offset = frame.stack.pop()?;
        let return_size = frame.stack.pop()?;

        if exec_type == ExecType::Call && frame.is_static && !value.is_zero() {
            return Err(VMError::WriteProtection);
        }

        let (args_offset, args_size) = self.expand_memory(frame, args_offset, args_size)?;
        let (return_offset, return_size) = self.expand_memory(frame, return_offset, return_size)?;

        let was_cold = self.db.warm_address(code_address);
        frame.charge_gas(gas_cost::address_access_cost(was_cold))?;

        let transfers_value =
            matches!(exec_type, ExecType::Call | ExecType::CallCode) && !value.is_zero();
        let mut surcharge = 0u64;
        if transfers_value {
            surcharge += CALL_VALUE_COST;
        }
        if exec_type == ExecType::Call
            && !value.is_zero()
            && self.db.account_is_empty(code_address)
        {
            surcharge += CALL_NEW_ACCOUNT_COST;
        }
        frame.charge_gas(surcharge)?;

        // EIP-150: forward at most 63/64 of what remains.
        let requested = crate::utils::checked_u64(gas).unwrap_or(u64::MAX);
        let gas_for_call = requested.min(gas_cost::max_gas_for_call(frame.gas_remaining));
        frame.charge_gas(gas_for_call)?;
        let child_gas = gas_for_call + if transfers_value { CALL_STIPEND } else { 0 };

        let (caller, to, should_transfer, is_static) = match exec_type {
            ExecType::Call => (frame.to, code_address, true, frame.is_static),
            ExecType::CallCode => (frame.to, frame.to, false, frame.is_static),
            ExecType::DelegateCall => (frame.caller, frame.to, false, frame.is_static),
            _ => (frame.to, code_address, false, true),
        };

        // Depth or balance failures push 0 and give the forwarded gas back;
        // the parent simply continues.
        let balance_ok = !transfers_value || self.db.get_balance(frame.to) >= value;
        if !Self::depth_available(frame) || !balance_ok {
            frame.gas_remaining += child_gas;
            frame.stack.push(U256::zero())?;
            frame.returndata = Bytes::new();
            return Ok(OpcodeResult::Continue { pc_increment: 1 });
        }

        let calldata = Bytes::from(frame.memory.load_range(args_offset, args_size));
        Ok(OpcodeResult::SpawnCall(CallParams {
            exec_type,
            gas: child_gas,
            code_address,
            to,
            caller,
            value,
            should_transfer,
            is_static,
            calldata,
            return_offset,
            return_size,
        }))
    }

    pub fn op_create(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        self.generic_create(frame, ExecType::Create)
    }

    pub fn op_create2(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        self.generic_create(frame, ExecType::Create2)
    }

    fn generic_create(
        &mut self,
        frame: &mut CallFrame,
        exec_type: ExecType,
    ) -> Result<OpcodeResult, VMError> {
        if frame.is_static {
            return Err(VMError::WriteProtection);
        }
        let value = frame.stack.pop()?;
        let offset = frame.stack.pop()?;
        let size = frame.stack.pop()?;
        let salt = match exec_type {
            ExecType::Create2 => frame.stack.pop()?,
            _ => U256::zero(),
        };

        let (offset, size) = self.expand_memory(frame, offset, size)?;
        if self.env.fork.is_shanghai_activated() {
            // EIP-3860: bounded, word-priced init code.
            if size > MAX_INITCODE_SIZE {
                return Err(VMError::InitCodeSizeExceeded);
            }
            frame.charge_gas(gas_cost::init_code_cost(size)?)?;
        }
        if exec_type == ExecType::Create2 {
            frame.charge_gas(
                gas_cost::words_for(size)
                    .checked_mul(KECCAK256_WORD_COST)
                    .ok_or(VMError::OutOfGas)?,
            )?;
        }

        if !Self::depth_available(frame) || self.db.get_balance(frame.to) < value {
            frame.stack.push(U256::zero())?;
            frame.returndata = Bytes::new();
            return Ok(OpcodeResult::Continue { pc_increment: 1 });
        }

        let init_code = Bytes::from(frame.memory.load_range(offset, size));
        // The creator's nonce before the bump derives the address.
        let nonce = self.db.increment_nonce(frame.to);
        let address = match exec_type {
            ExecType::Create2 => calculate_create2_address(frame.to, salt, &init_code),
            _ => calculate_create_address(frame.to, nonce),
        };

        let child_gas = gas_cost::max_gas_for_call(frame.gas_remaining);
        frame.charge_gas(child_gas)?;

        Ok(OpcodeResult::SpawnCreate(CreateParams {
            exec_type,
            gas: child_gas,
            value,
            init_code,
            address,
        }))
    }

    pub fn op_return(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let offset = frame.stack.pop()?;
        let size = frame.stack.pop()?;
        let (offset, size) = self.expand_memory(frame, offset, size)?;
        let data = Bytes::from(frame.memory.load_range(offset, size));
        Ok(OpcodeResult::Halt(HaltReason::Return(data)))
    }

    pub fn op_revert(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let offset = frame.stack.pop()?;
        let size = frame.stack.pop()?;
        let (offset, size) = self.expand_memory(frame, offset, size)?;
        let data = Bytes::from(frame.memory.load_range(offset, size));
        Ok(OpcodeResult::Halt(HaltReason::Revert(data)))
    }

    /// SELFDESTRUCT: move the balance out and schedule the account for
    /// removal. From Cancun (EIP-6780) the removal only happens when the
    /// account was created in this same transaction.
    pub fn op_selfdestruct(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        if frame.is_static {
            return Err(VMError::WriteProtection);
        }
        let beneficiary = word_to_address(frame.stack.pop()?);

        let was_cold = self.db.warm_address(beneficiary);
        let balance = self.db.get_balance(frame.to);
        let mut cost = SELFDESTRUCT_COST;
        if was_cold {
            cost += COLD_ACCOUNT_ACCESS_COST;
        }
        if self.db.account_is_empty(beneficiary) && !balance.is_zero() {
            cost += SELFDESTRUCT_NEW_ACCOUNT_COST;
        }
        frame.charge_gas(cost)?;

        let full_destroy =
            !self.env.fork.is_cancun_activated() || self.db.was_created_this_tx(frame.to);
        if full_destroy {
            // Beneficiary == self burns the balance with the account.
            self.db.add_balance(beneficiary, balance);
            self.db.destroy_account(frame.to);
        } else if beneficiary != frame.to {
            self.db.sub_balance(frame.to, balance);
            self.db.add_balance(beneficiary, balance);
        }
        Ok(OpcodeResult::Halt(HaltReason::Stop))
    }
}
