//! Block-level reads: BLOCKHASH, COINBASE, TIMESTAMP, NUMBER, PREVRANDAO,
//! GASLIMIT, CHAINID, SELFBALANCE, BASEFEE, BLOBHASH, BLOBBASEFEE.

use ethereum_types::U256;
use tern_common::constants::LAST_AVAILABLE_BLOCK_LIMIT;

use crate::{
    call_frame::CallFrame,
    errors::VMError,
    utils::{address_to_word, checked_u64, h256_to_u256},
    vm::{OpcodeResult, VM},
};

const CONTINUE: Result<OpcodeResult, VMError> = Ok(OpcodeResult::Continue { pc_increment: 1 });

impl VM<'_> {
    /// BLOCKHASH: hash of one of the 256 most recent blocks, zero outside
    /// that window or when the environment does not know it.
    pub fn op_blockhash(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let number = frame.stack.pop()?;
        let current = self.env.block.number;

        let hash = checked_u64(number)
            .filter(|n| *n < current && current - n <= LAST_AVAILABLE_BLOCK_LIMIT)
            .and_then(|n| self.env.block.block_hashes.get(&n))
            .map(|hash| h256_to_u256(*hash))
            .unwrap_or_default();
        frame.stack.push(hash)?;
        CONTINUE
    }

    pub fn op_coinbase(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(address_to_word(self.env.block.coinbase))?;
        CONTINUE
    }

    pub fn op_timestamp(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::from(self.env.block.timestamp))?;
        CONTINUE
    }

    pub fn op_number(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::from(self.env.block.number))?;
        CONTINUE
    }

    /// PREVRANDAO (post-merge DIFFICULTY).
    pub fn op_prevrandao(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame
            .stack
            .push(h256_to_u256(self.env.block.prev_randao))?;
        CONTINUE
    }

    pub fn op_gaslimit(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::from(self.env.block.gas_limit))?;
        CONTINUE
    }

    pub fn op_chainid(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(U256::from(self.env.chain_id))?;
        CONTINUE
    }

    pub fn op_selfbalance(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(self.db.get_balance(frame.to))?;
        CONTINUE
    }

    pub fn op_basefee(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame
            .stack
            .push(U256::from(self.env.block.base_fee_per_gas))?;
        CONTINUE
    }

    /// BLOBHASH: versioned hash of the transaction's `index`-th blob.
    pub fn op_blobhash(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        let index = frame.stack.pop()?;
        let hash = checked_u64(index)
            .and_then(|index| self.env.blob_hashes.get(index as usize))
            .map(|hash| h256_to_u256(*hash))
            .unwrap_or_default();
        frame.stack.push(hash)?;
        CONTINUE
    }

    pub fn op_blobbasefee(&mut self, frame: &mut CallFrame) -> Result<OpcodeResult, VMError> {
        frame.stack.push(self.env.block.blob_base_fee)?;
        CONTINUE
    }
}
