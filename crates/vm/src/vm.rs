use std::collections::HashMap;
use std::rc::Rc;

use bitvec::vec::BitVec;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use tern_crypto::keccak::keccak_hash;

use crate::{
    call_frame::{CallFrame, ExecType, analyze_jumpdests},
    constants::{CALL_DEPTH_LIMIT, MAX_CODE_SIZE},
    db::WorldState,
    environment::Environment,
    errors::{ExecutionReport, TxResult, VMError},
    gas_cost::{self, CODE_DEPOSIT_BYTE_COST},
    opcodes::Opcode,
    pool::FramePool,
    precompiles,
    utils::as_usize,
};

/// What one opcode did to the current frame.
#[derive(Debug)]
pub enum OpcodeResult {
    Continue { pc_increment: usize },
    Halt(HaltReason),
    /// CALL family: the driver opens a child frame and re-enters the loop.
    SpawnCall(CallParams),
    /// CREATE family.
    SpawnCreate(CreateParams),
}

/// How a frame ended.
#[derive(Debug)]
pub enum HaltReason {
    Stop,
    Return(Bytes),
    Revert(Bytes),
    /// Exceptional halt; the frame's gas is gone.
    Error(VMError),
}

/// Child-call parameters assembled by the CALL-family handlers.
#[derive(Debug)]
pub struct CallParams {
    pub exec_type: ExecType,
    /// Gas the child starts with (EIP-150 cap and stipend applied).
    pub gas: u64,
    /// Account whose code runs.
    pub code_address: Address,
    /// Account whose storage and balance the child acts on.
    pub to: Address,
    pub caller: Address,
    pub value: U256,
    /// False for DELEGATECALL/CALLCODE, where no balance moves.
    pub should_transfer: bool,
    pub is_static: bool,
    pub calldata: Bytes,
    pub return_offset: usize,
    pub return_size: usize,
}

/// Child-creation parameters assembled by CREATE/CREATE2.
#[derive(Debug)]
pub struct CreateParams {
    pub exec_type: ExecType,
    pub gas: u64,
    pub value: U256,
    pub init_code: Bytes,
    /// Derived contract address (nonce- or salt-based).
    pub address: Address,
}

enum FrameEvent {
    Halt(HaltReason),
    Call(CallParams),
    Create(CreateParams),
}

/// The interpreter: a stack of call frames over a journaled world-state.
pub struct VM<'a> {
    pub env: Environment,
    pub db: &'a mut WorldState,
    /// Suspended frames; the running frame is owned by the execute loop.
    call_frames: Vec<CallFrame>,
    pool: FramePool,
    jumpdest_cache: HashMap<H256, Rc<BitVec>>,
    gas_table: [u64; 256],
    initial_gas: u64,
}

impl<'a> VM<'a> {
    /// Root frame for a message call. The callee's delegation designator
    /// (EIP-7702) is resolved to the target's code.
    pub fn new_call(
        env: Environment,
        db: &'a mut WorldState,
        to: Address,
        gas: u64,
        value: U256,
        calldata: Bytes,
    ) -> Self {
        let (code, code_hash) = match db.get_delegation(to) {
            Some(target) => {
                db.warm_address(target);
                (db.get_code(target), db.get_code_hash(target))
            }
            None => (db.get_code(to), db.get_code_hash(to)),
        };
        let frame = CallFrame {
            gas_remaining: gas,
            code,
            code_hash,
            exec_type: ExecType::TxStart,
            caller: env.origin,
            to,
            value,
            calldata,
            ..Default::default()
        };
        Self::with_root_frame(env, db, frame, gas)
    }

    /// Root frame for a contract creation: runs `init_code` in the context
    /// of the derived address.
    pub fn new_create(
        env: Environment,
        db: &'a mut WorldState,
        contract_address: Address,
        gas: u64,
        value: U256,
        init_code: Bytes,
    ) -> Self {
        let code_hash = keccak_hash(&init_code);
        let frame = CallFrame {
            gas_remaining: gas,
            code: init_code,
            code_hash,
            exec_type: ExecType::Create,
            caller: env.origin,
            to: contract_address,
            value,
            ..Default::default()
        };
        Self::with_root_frame(env, db, frame, gas)
    }

    fn with_root_frame(
        env: Environment,
        db: &'a mut WorldState,
        frame: CallFrame,
        gas: u64,
    ) -> Self {
        Self {
            gas_table: gas_cost::static_gas_table(env.fork),
            env,
            db,
            call_frames: vec![frame],
            pool: FramePool::new(),
            jumpdest_cache: HashMap::new(),
            initial_gas: gas,
        }
    }

    /// Runs the frame machine to completion.
    ///
    /// Only internal invariant breaches surface as `Err`; every EVM-level
    /// failure is folded into the report.
    pub fn execute(&mut self) -> Result<ExecutionReport, VMError> {
        let mut current = self
            .call_frames
            .pop()
            .ok_or(VMError::Internal("no root frame"))?;
        loop {
            match self.run_frame(&mut current)? {
                FrameEvent::Halt(reason) => match self.call_frames.pop() {
                    Some(mut parent) => {
                        self.finalize_child(&mut parent, current, reason)?;
                        current = parent;
                    }
                    None => return Ok(self.finalize_root(current, reason)),
                },
                FrameEvent::Call(params) => {
                    if let Some(child) = self.enter_call(&mut current, params)? {
                        self.call_frames.push(std::mem::replace(&mut current, child));
                    }
                }
                FrameEvent::Create(params) => {
                    if let Some(child) = self.enter_create(&mut current, params)? {
                        self.call_frames.push(std::mem::replace(&mut current, child));
                    }
                }
            }
        }
    }

    /// Steps the frame until it halts or spawns a child.
    fn run_frame(&mut self, frame: &mut CallFrame) -> Result<FrameEvent, VMError> {
        loop {
            match self.step(frame) {
                Ok(OpcodeResult::Continue { pc_increment }) => frame.pc += pc_increment,
                Ok(OpcodeResult::Halt(reason)) => return Ok(FrameEvent::Halt(reason)),
                Ok(OpcodeResult::SpawnCall(params)) => {
                    frame.pc += 1;
                    return Ok(FrameEvent::Call(params));
                }
                Ok(OpcodeResult::SpawnCreate(params)) => {
                    frame.pc += 1;
                    return Ok(FrameEvent::Create(params));
                }
                Err(error) if error.is_internal() => return Err(error),
                Err(error) => {
                    // Exceptional halt: the frame forfeits its gas.
                    frame.gas_remaining = 0;
                    return Ok(FrameEvent::Halt(HaltReason::Error(error)));
                }
            }
        }
    }

    /// Fetch, charge the static cost, dispatch.
    fn step(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let byte = frame.current_opcode();
        let opcode = Opcode::from_u8(byte).ok_or(VMError::InvalidOpcode)?;
        if !self.opcode_active(opcode) {
            return Err(VMError::InvalidOpcode);
        }
        frame.charge_gas(self.gas_table[byte as usize])?;

        match opcode {
            Opcode::STOP => Ok(OpcodeResult::Halt(HaltReason::Stop)),
            Opcode::ADD => self.op_add(frame),
            Opcode::MUL => self.op_mul(frame),
            Opcode::SUB => self.op_sub(frame),
            Opcode::DIV => self.op_div(frame),
            Opcode::SDIV => self.op_sdiv(frame),
            Opcode::MOD => self.op_mod(frame),
            Opcode::SMOD => self.op_smod(frame),
            Opcode::ADDMOD => self.op_addmod(frame),
            Opcode::MULMOD => self.op_mulmod(frame),
            Opcode::EXP => self.op_exp(frame),
            Opcode::SIGNEXTEND => self.op_signextend(frame),
            Opcode::LT => self.op_lt(frame),
            Opcode::GT => self.op_gt(frame),
            Opcode::SLT => self.op_slt(frame),
            Opcode::SGT => self.op_sgt(frame),
            Opcode::EQ => self.op_eq(frame),
            Opcode::ISZERO => self.op_iszero(frame),
            Opcode::AND => self.op_and(frame),
            Opcode::OR => self.op_or(frame),
            Opcode::XOR => self.op_xor(frame),
            Opcode::NOT => self.op_not(frame),
            Opcode::BYTE => self.op_byte(frame),
            Opcode::SHL => self.op_shl(frame),
            Opcode::SHR => self.op_shr(frame),
            Opcode::SAR => self.op_sar(frame),
            Opcode::KECCAK256 => self.op_keccak256(frame),
            Opcode::ADDRESS => self.op_address(frame),
            Opcode::BALANCE => self.op_balance(frame),
            Opcode::ORIGIN => self.op_origin(frame),
            Opcode::CALLER => self.op_caller(frame),
            Opcode::CALLVALUE => self.op_callvalue(frame),
            Opcode::CALLDATALOAD => self.op_calldataload(frame),
            Opcode::CALLDATASIZE => self.op_calldatasize(frame),
            Opcode::CALLDATACOPY => self.op_calldatacopy(frame),
            Opcode::CODESIZE => self.op_codesize(frame),
            Opcode::CODECOPY => self.op_codecopy(frame),
            Opcode::GASPRICE => self.op_gasprice(frame),
            Opcode::EXTCODESIZE => self.op_extcodesize(frame),
            Opcode::EXTCODECOPY => self.op_extcodecopy(frame),
            Opcode::RETURNDATASIZE => self.op_returndatasize(frame),
            Opcode::RETURNDATACOPY => self.op_returndatacopy(frame),
            Opcode::EXTCODEHASH => self.op_extcodehash(frame),
            Opcode::BLOCKHASH => self.op_blockhash(frame),
            Opcode::COINBASE => self.op_coinbase(frame),
            Opcode::TIMESTAMP => self.op_timestamp(frame),
            Opcode::NUMBER => self.op_number(frame),
            Opcode::PREVRANDAO => self.op_prevrandao(frame),
            Opcode::GASLIMIT => self.op_gaslimit(frame),
            Opcode::CHAINID => self.op_chainid(frame),
            Opcode::SELFBALANCE => self.op_selfbalance(frame),
            Opcode::BASEFEE => self.op_basefee(frame),
            Opcode::BLOBHASH => self.op_blobhash(frame),
            Opcode::BLOBBASEFEE => self.op_blobbasefee(frame),
            Opcode::POP => self.op_pop(frame),
            Opcode::MLOAD => self.op_mload(frame),
            Opcode::MSTORE => self.op_mstore(frame),
            Opcode::MSTORE8 => self.op_mstore8(frame),
            Opcode::SLOAD => self.op_sload(frame),
            Opcode::SSTORE => self.op_sstore(frame),
            Opcode::JUMP => self.op_jump(frame),
            Opcode::JUMPI => self.op_jumpi(frame),
            Opcode::PC => self.op_pc(frame),
            Opcode::MSIZE => self.op_msize(frame),
            Opcode::GAS => self.op_gas(frame),
            Opcode::JUMPDEST => Ok(OpcodeResult::Continue { pc_increment: 1 }),
            Opcode::TLOAD => self.op_tload(frame),
            Opcode::TSTORE => self.op_tstore(frame),
            Opcode::MCOPY => self.op_mcopy(frame),
            Opcode::PUSH0 => self.op_push0(frame),
            _ if opcode.push_len().is_some() => self.op_push(frame, opcode),
            _ if opcode.dup_depth().is_some() => self.op_dup(frame, opcode),
            _ if opcode.swap_depth().is_some() => self.op_swap(frame, opcode),
            _ if opcode.log_topic_count().is_some() => self.op_log(frame, opcode),
            Opcode::CREATE => self.op_create(frame),
            Opcode::CREATE2 => self.op_create2(frame),
            Opcode::CALL => self.op_call(frame),
            Opcode::CALLCODE => self.op_callcode(frame),
            Opcode::DELEGATECALL => self.op_delegatecall(frame),
            Opcode::STATICCALL => self.op_staticcall(frame),
            Opcode::RETURN => self.op_return(frame),
            Opcode::REVERT => self.op_revert(frame),
            Opcode::INVALID => Err(VMError::InvalidOpcode),
            Opcode::SELFDESTRUCT => self.op_selfdestruct(frame),
            _ => Err(VMError::Internal("unhandled opcode")),
        }
    }

    fn opcode_active(&self, opcode: Opcode) -> bool {
        match opcode {
            Opcode::PUSH0 => self.env.fork.is_shanghai_activated(),
            Opcode::TLOAD
            | Opcode::TSTORE
            | Opcode::MCOPY
            | Opcode::BLOBHASH
            | Opcode::BLOBBASEFEE => self.env.fork.is_cancun_activated(),
            _ => true,
        }
    }

    // === Child-frame lifecycle =============================================

    /// Opens a child frame for a CALL-family opcode, or completes precompile
    /// calls in place. `None` means the parent already has its result.
    fn enter_call(
        &mut self,
        parent: &mut CallFrame,
        params: CallParams,
    ) -> Result<Option<CallFrame>, VMError> {
        let snapshot = self.db.snapshot();

        if params.should_transfer
            && !params.value.is_zero()
            && !self.db.transfer(params.caller, params.to, params.value)
        {
            // Balance was checked at the opcode; a failure here is a bug.
            return Err(VMError::Internal("value transfer failed after check"));
        }

        if precompiles::is_precompile(&params.code_address) {
            let outcome = precompiles::execute(&params.code_address, &params.calldata, params.gas);
            let (success, output, gas_left) = match outcome {
                Some((output, gas_left)) => (true, output, gas_left),
                None => (false, Bytes::new(), 0),
            };
            if success {
                self.db.commit_snapshot(snapshot);
            } else {
                self.db.revert_to_snapshot(snapshot);
            }
            self.apply_call_result(parent, success, output, gas_left, &params)?;
            return Ok(None);
        }

        // EIP-7702: calls to a delegated account run the target's code.
        let (code, code_hash) = match self.db.get_delegation(params.code_address) {
            Some(target) => {
                self.db.warm_address(target);
                (self.db.get_code(target), self.db.get_code_hash(target))
            }
            None => (
                self.db.get_code(params.code_address),
                self.db.get_code_hash(params.code_address),
            ),
        };

        let (stack, memory) = self.pool.acquire();
        Ok(Some(CallFrame {
            pc: 0,
            gas_remaining: params.gas,
            stack,
            memory,
            code,
            code_hash,
            exec_type: params.exec_type,
            is_static: params.is_static,
            depth: parent.depth + 1,
            caller: params.caller,
            to: params.to,
            value: params.value,
            calldata: params.calldata,
            return_offset: params.return_offset,
            return_size: params.return_size,
            returndata: Bytes::new(),
            jumpdests: None,
            snapshot,
        }))
    }

    /// Opens a child frame for CREATE/CREATE2. `None` on address collision,
    /// where the forwarded gas is forfeited.
    fn enter_create(
        &mut self,
        parent: &mut CallFrame,
        params: CreateParams,
    ) -> Result<Option<CallFrame>, VMError> {
        self.db.warm_address(params.address);

        // Collision: an account with code or a nonce already lives there.
        if self.db.get_nonce(params.address) != 0
            || self.db.get_code_hash(params.address) != *tern_common::types::EMPTY_CODE_HASH
        {
            parent.stack.push(U256::zero())?;
            parent.returndata = Bytes::new();
            return Ok(None);
        }

        let snapshot = self.db.snapshot();
        self.db.create_contract(params.address);
        if !params.value.is_zero() && !self.db.transfer(parent.to, params.address, params.value) {
            return Err(VMError::Internal("create value transfer failed after check"));
        }

        let code_hash = keccak_hash(&params.init_code);
        let (stack, memory) = self.pool.acquire();
        Ok(Some(CallFrame {
            pc: 0,
            gas_remaining: params.gas,
            stack,
            memory,
            code: params.init_code,
            code_hash,
            exec_type: params.exec_type,
            is_static: parent.is_static,
            depth: parent.depth + 1,
            caller: parent.to,
            to: params.address,
            value: params.value,
            calldata: Bytes::new(),
            return_offset: 0,
            return_size: 0,
            returndata: Bytes::new(),
            jumpdests: None,
            snapshot,
        }))
    }

    /// Folds a finished child frame into its parent.
    fn finalize_child(
        &mut self,
        parent: &mut CallFrame,
        child: CallFrame,
        reason: HaltReason,
    ) -> Result<(), VMError> {
        let snapshot = child.snapshot;
        if child.exec_type.is_create() {
            match reason {
                HaltReason::Stop | HaltReason::Return(_) => {
                    let code = match reason {
                        HaltReason::Return(code) => code,
                        _ => Bytes::new(),
                    };
                    match deployed_code_cost(&code, child.gas_remaining) {
                        Ok(deposit) => {
                            self.db.set_code(child.to, code);
                            self.db.commit_snapshot(snapshot);
                            parent
                                .stack
                                .push(crate::utils::address_to_word(child.to))?;
                            parent.gas_remaining += child.gas_remaining - deposit;
                            parent.returndata = Bytes::new();
                        }
                        Err(_) => {
                            self.db.revert_to_snapshot(snapshot);
                            parent.stack.push(U256::zero())?;
                            parent.returndata = Bytes::new();
                        }
                    }
                }
                HaltReason::Revert(data) => {
                    self.db.revert_to_snapshot(snapshot);
                    parent.stack.push(U256::zero())?;
                    parent.gas_remaining += child.gas_remaining;
                    parent.returndata = data;
                }
                HaltReason::Error(_) => {
                    self.db.revert_to_snapshot(snapshot);
                    parent.stack.push(U256::zero())?;
                    parent.returndata = Bytes::new();
                }
            }
            self.pool.release(child.stack, child.memory);
            return Ok(());
        }

        let (success, output, gas_left) = match reason {
            HaltReason::Stop => (true, Bytes::new(), child.gas_remaining),
            HaltReason::Return(data) => (true, data, child.gas_remaining),
            HaltReason::Revert(data) => (false, data, child.gas_remaining),
            HaltReason::Error(_) => (false, Bytes::new(), 0),
        };
        if success {
            self.db.commit_snapshot(snapshot);
        } else {
            self.db.revert_to_snapshot(snapshot);
        }
        let params = CallResultRegion {
            return_offset: child.return_offset,
            return_size: child.return_size,
        };
        self.pool.release(child.stack, child.memory);
        self.apply_result_region(parent, success, output, gas_left, &params)
    }

    fn apply_call_result(
        &mut self,
        parent: &mut CallFrame,
        success: bool,
        output: Bytes,
        gas_left: u64,
        params: &CallParams,
    ) -> Result<(), VMError> {
        let region = CallResultRegion {
            return_offset: params.return_offset,
            return_size: params.return_size,
        };
        self.apply_result_region(parent, success, output, gas_left, &region)
    }

    fn apply_result_region(
        &mut self,
        parent: &mut CallFrame,
        success: bool,
        output: Bytes,
        gas_left: u64,
        region: &CallResultRegion,
    ) -> Result<(), VMError> {
        parent
            .stack
            .push(if success { U256::one() } else { U256::zero() })?;
        let copy_len = region.return_size.min(output.len());
        if copy_len > 0 {
            parent
                .memory
                .store_range(region.return_offset, &output[..copy_len]);
        }
        parent.returndata = output;
        parent.gas_remaining += gas_left;
        Ok(())
    }

    /// Builds the report once the root frame halts.
    fn finalize_root(&mut self, mut frame: CallFrame, reason: HaltReason) -> ExecutionReport {
        let refund = self.db.refund();
        let report = match reason {
            HaltReason::Stop => ExecutionReport {
                result: TxResult::Success,
                gas_used: self.initial_gas - frame.gas_remaining,
                gas_refunded: refund,
                output: Bytes::new(),
            },
            HaltReason::Return(data) => {
                if frame.exec_type.is_create() {
                    match deployed_code_cost(&data, frame.gas_remaining) {
                        Ok(deposit) => {
                            frame.gas_remaining -= deposit;
                            self.db.set_code(frame.to, data.clone());
                            ExecutionReport {
                                result: TxResult::Success,
                                gas_used: self.initial_gas - frame.gas_remaining,
                                gas_refunded: refund,
                                output: data,
                            }
                        }
                        Err(error) => ExecutionReport {
                            result: TxResult::Revert(error),
                            gas_used: self.initial_gas,
                            gas_refunded: 0,
                            output: Bytes::new(),
                        },
                    }
                } else {
                    ExecutionReport {
                        result: TxResult::Success,
                        gas_used: self.initial_gas - frame.gas_remaining,
                        gas_refunded: refund,
                        output: data,
                    }
                }
            }
            HaltReason::Revert(data) => ExecutionReport {
                result: TxResult::Revert(VMError::Revert),
                gas_used: self.initial_gas - frame.gas_remaining,
                gas_refunded: 0,
                output: data,
            },
            HaltReason::Error(error) => ExecutionReport {
                result: TxResult::Revert(error),
                gas_used: self.initial_gas,
                gas_refunded: 0,
                output: Bytes::new(),
            },
        };
        self.pool.release(frame.stack, frame.memory);
        report
    }

    // === Shared handler helpers ============================================

    /// Charges and performs memory expansion for `[offset, offset+size)`.
    /// Returns the region as native offsets; a zero size never touches the
    /// offset.
    pub(crate) fn expand_memory(
        &self,
        frame: &mut CallFrame,
        offset: U256,
        size: U256,
    ) -> Result<(usize, usize), VMError> {
        let size = as_usize(size)?;
        if size == 0 {
            return Ok((0, 0));
        }
        let offset = as_usize(offset)?;
        let cost = frame.memory.expansion_cost(offset, size)?;
        frame.charge_gas(cost)?;
        frame.memory.expand(offset, size);
        Ok((offset, size))
    }

    /// Bitmap of valid jump destinations for the frame's code, cached by
    /// code hash.
    pub(crate) fn jumpdest_bitmap(&mut self, frame: &CallFrame) -> Rc<BitVec> {
        if let Some(bitmap) = &frame.jumpdests {
            return bitmap.clone();
        }
        self.jumpdest_cache
            .entry(frame.code_hash)
            .or_insert_with(|| Rc::new(analyze_jumpdests(&frame.code)))
            .clone()
    }

    /// Depth headroom for a child frame.
    pub(crate) fn depth_available(frame: &CallFrame) -> bool {
        frame.depth + 1 < CALL_DEPTH_LIMIT
    }
}

struct CallResultRegion {
    return_offset: usize,
    return_size: usize,
}

/// EIP-3541/EIP-170 checks plus the 200-per-byte deposit for code leaving an
/// init frame. Returns the deposit or the reason the deployment fails.
fn deployed_code_cost(code: &Bytes, gas_remaining: u64) -> Result<u64, VMError> {
    if code.first() == Some(&0xef) {
        return Err(VMError::InvalidContractPrefix);
    }
    if code.len() > MAX_CODE_SIZE {
        return Err(VMError::CodeSizeExceeded);
    }
    let deposit = CODE_DEPOSIT_BYTE_COST * code.len() as u64;
    if gas_remaining < deposit {
        return Err(VMError::OutOfGas);
    }
    Ok(deposit)
}
