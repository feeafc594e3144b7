use std::collections::BTreeMap;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use hex_literal::hex;
use tern_common::types::{Fork, GenesisAccount};
use tern_vm::{
    Environment, VM, WorldState,
    errors::{TxResult, VMError},
    operations::{Operation, ops_to_bytecode},
    utils::calculate_create_address,
};

const GAS: u64 = 1_000_000;

fn sender() -> Address {
    Address::from_low_u64_be(0x1000)
}

fn contract_a() -> Address {
    Address::from_low_u64_be(0xaaaa)
}

fn contract_b() -> Address {
    Address::from_low_u64_be(0xbbbb)
}

fn account(code: &[Operation], balance: u64) -> GenesisAccount {
    GenesisAccount {
        code: ops_to_bytecode(code),
        balance: U256::from(balance),
        ..Default::default()
    }
}

fn state_with(accounts: Vec<(Address, GenesisAccount)>) -> WorldState {
    let alloc: BTreeMap<Address, GenesisAccount> = accounts.into_iter().collect();
    WorldState::from_genesis(&alloc)
}

fn environment(fork: Fork) -> Environment {
    Environment {
        origin: sender(),
        gas_price: 1,
        chain_id: 1,
        fork,
        ..Default::default()
    }
}

fn run(state: &mut WorldState, fork: Fork, to: Address) -> tern_vm::errors::ExecutionReport {
    state.begin_transaction();
    VM::new_call(environment(fork), state, to, GAS, U256::zero(), Bytes::new())
        .execute()
        .unwrap()
}

/// Deploys `ops` at a fixed address and runs them.
fn run_ops(ops: &[Operation]) -> tern_vm::errors::ExecutionReport {
    let mut state = state_with(vec![(contract_a(), account(ops, 0))]);
    run(&mut state, Fork::Shanghai, contract_a())
}

/// Appends an MSTORE/RETURN tail so the word on top of the stack becomes the
/// frame output.
fn run_returning_top(ops: &[Operation]) -> U256 {
    let mut program = ops.to_vec();
    program.extend([
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ]);
    let report = run_ops(&program);
    assert!(report.is_success(), "program failed: {:?}", report.result);
    U256::from_big_endian(&report.output)
}

fn push(value: impl Into<U256>) -> Operation {
    Operation::Push((32, value.into()))
}

// === The interpreter state machine =========================================

#[test]
fn stop_only_terminates_immediately() {
    let report = run_ops(&[Operation::Stop]);
    assert!(report.is_success());
    assert_eq!(report.gas_used, 0);
    assert!(report.output.is_empty());
}

#[test]
fn empty_code_stops() {
    let mut state = state_with(vec![]);
    let report = run(&mut state, Fork::Shanghai, contract_b());
    assert!(report.is_success());
    assert_eq!(report.gas_used, 0);
}

#[test]
fn push_add_program_gas() {
    // PUSH1 10, PUSH1 20, ADD, STOP: 3 + 3 + 3
    let report = run_ops(&[
        Operation::Push((1, U256::from(10))),
        Operation::Push((1, U256::from(20))),
        Operation::Add,
        Operation::Stop,
    ]);
    assert!(report.is_success());
    assert_eq!(report.gas_used, 9);
}

#[test]
fn push_add_program_result() {
    let result = run_returning_top(&[
        Operation::Push((1, U256::from(10))),
        Operation::Push((1, U256::from(20))),
        Operation::Add,
    ]);
    assert_eq!(result, U256::from(30));
}

#[test]
fn out_of_gas_consumes_everything() {
    let mut state = state_with(vec![(
        contract_a(),
        account(&[push(1u64), push(2u64), Operation::Add, Operation::Stop], 0),
    )]);
    state.begin_transaction();
    let report = VM::new_call(
        environment(Fork::Shanghai),
        &mut state,
        contract_a(),
        5,
        U256::zero(),
        Bytes::new(),
    )
    .execute()
    .unwrap();
    assert_eq!(report.result, TxResult::Revert(VMError::OutOfGas));
    assert_eq!(report.gas_used, 5);
}

#[test]
fn stack_underflow_is_exceptional() {
    let report = run_ops(&[Operation::Add, Operation::Stop]);
    assert_eq!(report.result, TxResult::Revert(VMError::StackUnderflow));
    assert_eq!(report.gas_used, GAS);
}

#[test]
fn invalid_opcode_and_unassigned_byte_fail() {
    let report = run_ops(&[Operation::Invalid]);
    assert_eq!(report.result, TxResult::Revert(VMError::InvalidOpcode));

    let mut state = state_with(vec![(
        contract_a(),
        GenesisAccount {
            code: Bytes::from_static(&[0x0c]),
            ..Default::default()
        },
    )]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert_eq!(report.result, TxResult::Revert(VMError::InvalidOpcode));
}

#[test]
fn push0_requires_shanghai() {
    let ops = [Operation::Push0, Operation::Stop];
    let mut state = state_with(vec![(contract_a(), account(&ops, 0))]);
    let report = run(&mut state, Fork::Merge, contract_a());
    assert_eq!(report.result, TxResult::Revert(VMError::InvalidOpcode));

    let mut state = state_with(vec![(contract_a(), account(&ops, 0))]);
    assert!(run(&mut state, Fork::Shanghai, contract_a()).is_success());
}

// === Arithmetic ============================================================

#[test]
fn division_by_zero_yields_zero() {
    assert_eq!(
        run_returning_top(&[push(0u64), push(10u64), Operation::Div]),
        U256::zero()
    );
    assert_eq!(
        run_returning_top(&[push(0u64), push(10u64), Operation::Mod]),
        U256::zero()
    );
    assert_eq!(
        run_returning_top(&[push(0u64), push(10u64), Operation::Sdiv]),
        U256::zero()
    );
    assert_eq!(
        run_returning_top(&[push(0u64), push(10u64), Operation::SMod]),
        U256::zero()
    );
}

#[test]
fn sdiv_min_by_minus_one_overflows_to_min() {
    let min_negative = U256::one() << 255;
    assert_eq!(
        run_returning_top(&[push(U256::max_value()), push(min_negative), Operation::Sdiv]),
        min_negative
    );
}

#[test]
fn smod_follows_dividend_sign() {
    // -8 % -3 = -2 in two's complement
    let minus_8 = U256::max_value() - U256::from(7);
    let minus_3 = U256::max_value() - U256::from(2);
    let minus_2 = U256::max_value() - U256::from(1);
    assert_eq!(
        run_returning_top(&[push(minus_3), push(minus_8), Operation::SMod]),
        minus_2
    );
}

#[test]
fn addmod_mulmod_zero_modulus() {
    assert_eq!(
        run_returning_top(&[push(0u64), push(10u64), push(10u64), Operation::Addmod]),
        U256::zero()
    );
    assert_eq!(
        run_returning_top(&[push(8u64), push(10u64), push(10u64), Operation::Mulmod]),
        U256::from(4)
    );
}

#[test]
fn addmod_exceeding_word_size() {
    // (MAX + 2) % 3 == 2^256+1 mod 3 == (1+1) mod 3... computed wide, not mod 2^256
    let result = run_returning_top(&[
        push(3u64),
        push(2u64),
        push(U256::max_value()),
        Operation::Addmod,
    ]);
    let expected = U256::from(((U256::max_value() % 3).low_u64() + 2) % 3);
    assert_eq!(result, expected);
}

#[test]
fn exp_identities() {
    let a = U256::from(123456789u64);
    assert_eq!(
        run_returning_top(&[push(0u64), push(a), Operation::Exp]),
        U256::one()
    );
    assert_eq!(
        run_returning_top(&[push(5u64), push(0u64), Operation::Exp]),
        U256::zero()
    );
    assert_eq!(run_returning_top(&[push(1u64), push(a), Operation::Exp]), a);
}

#[test]
fn exp_charges_per_exponent_byte() {
    // static 10 + 50 * 2 bytes, plus two pushes
    let report = run_ops(&[
        Operation::Push((2, U256::from(0x100))),
        Operation::Push((1, U256::from(2))),
        Operation::Exp,
        Operation::Stop,
    ]);
    assert_eq!(report.gas_used, 3 + 3 + 10 + 100);
}

#[test]
fn signextend_extends_sign_bit() {
    assert_eq!(
        run_returning_top(&[push(0xffu64), push(0u64), Operation::SignExtend]),
        U256::max_value()
    );
    assert_eq!(
        run_returning_top(&[push(0x7fu64), push(0u64), Operation::SignExtend]),
        U256::from(0x7f)
    );
}

#[test]
fn add_sub_roundtrip_randomized() {
    // a + b - b == a (mod 2^256) over a spread of operand magnitudes
    let mut seed = U256::from(0x9e3779b97f4a7c15u64);
    for _ in 0..8 {
        let a = seed;
        let b = seed.overflowing_mul(U256::from(0x5851f42d4c957f2du64)).0;
        let result = run_returning_top(&[
            push(b),
            push(a),
            Operation::Add,
            push(b),
            Operation::Swap(1),
            Operation::Sub,
        ]);
        assert_eq!(result, a);
        seed = seed.overflowing_mul(U256::from(6364136223846793005u64)).0;
    }
}

#[test]
fn div_mod_reconstruction() {
    let a = U256::from_dec_str("340282366920938463463374607431768211455").unwrap();
    let b = U256::from(997u64);
    let quotient = run_returning_top(&[push(b), push(a), Operation::Div]);
    let remainder = run_returning_top(&[push(b), push(a), Operation::Mod]);
    assert_eq!(quotient * b + remainder, a);
}

// === Comparison, bitwise ===================================================

#[test]
fn comparisons() {
    assert_eq!(
        run_returning_top(&[push(2u64), push(1u64), Operation::Lt]),
        U256::one()
    );
    assert_eq!(
        run_returning_top(&[push(1u64), push(2u64), Operation::Gt]),
        U256::one()
    );
    // -1 < 1 signed
    assert_eq!(
        run_returning_top(&[push(1u64), push(U256::max_value()), Operation::Slt]),
        U256::one()
    );
    assert_eq!(
        run_returning_top(&[push(0u64), Operation::IsZero]),
        U256::one()
    );
}

#[test]
fn byte_shl_shr_sar() {
    // byte 31 of 0x..ff is 0xff
    assert_eq!(
        run_returning_top(&[push(0xffu64), push(31u64), Operation::Byte]),
        U256::from(0xff)
    );
    assert_eq!(
        run_returning_top(&[push(0xffu64), push(32u64), Operation::Byte]),
        U256::zero()
    );
    assert_eq!(
        run_returning_top(&[push(1u64), push(4u64), Operation::Shl]),
        U256::from(16)
    );
    assert_eq!(
        run_returning_top(&[push(16u64), push(4u64), Operation::Shr]),
        U256::one()
    );
    // SAR keeps the sign
    assert_eq!(
        run_returning_top(&[push(U256::max_value()), push(8u64), Operation::Sar]),
        U256::max_value()
    );
    assert_eq!(
        run_returning_top(&[push(U256::max_value()), push(300u64), Operation::Sar]),
        U256::max_value()
    );
}

// === Keccak ================================================================

#[test]
fn keccak256_of_empty_region() {
    let result = run_returning_top(&[push(0u64), push(0u64), Operation::Keccak256]);
    assert_eq!(
        result,
        U256::from_big_endian(&hex!(
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        ))
    );
}

// === Control flow ==========================================================

#[test]
fn jump_to_jumpdest() {
    // PUSH1 3, JUMP, JUMPDEST, STOP
    let report = run_ops(&[
        Operation::Push((1, U256::from(3))),
        Operation::Jump,
        Operation::Jumpdest,
        Operation::Stop,
    ]);
    assert!(report.is_success());
    assert_eq!(report.gas_used, 3 + 8 + 1);
}

#[test]
fn jump_into_push_immediate_is_invalid() {
    // PUSH1 4, JUMP, PUSH2 0x5b5b: byte 4 is 0x5b but sits in the immediate
    let mut state = state_with(vec![(
        contract_a(),
        GenesisAccount {
            code: Bytes::from_static(&hex!("600456615b5b")),
            ..Default::default()
        },
    )]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert_eq!(report.result, TxResult::Revert(VMError::InvalidJump));
    assert_eq!(report.gas_used, GAS);
}

#[test]
fn jumpi_falls_through_on_zero() {
    let report = run_ops(&[
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::from(6))),
        Operation::Jumpi,
        Operation::Stop,
        Operation::Jumpdest,
        Operation::Invalid,
    ]);
    assert!(report.is_success());
}

// === Memory ================================================================

#[test]
fn memory_grows_in_words() {
    // MSTORE8 at offset 0, then MSIZE
    let result = run_returning_top(&[
        push(0xaau64),
        push(0u64),
        Operation::Mstore8,
        Operation::Msize,
    ]);
    assert_eq!(result, U256::from(32));
}

#[test]
fn mcopy_copies_with_overlap() {
    // Store a word at 0, copy 0..32 to 16, read back word at 16
    let result = {
        let ops = [
            push(U256::from(0x1122334455667788u64)),
            push(0u64),
            Operation::Mstore,
            push(32u64),
            push(0u64),
            push(16u64),
            Operation::Mcopy,
            push(16u64),
            Operation::Mload,
        ];
        let mut program = ops.to_vec();
        program.extend([
            Operation::Push((1, U256::zero())),
            Operation::Mstore,
            Operation::Push((1, U256::from(32))),
            Operation::Push((1, U256::zero())),
            Operation::Return,
        ]);
        let mut state = state_with(vec![(contract_a(), account(&program, 0))]);
        let report = run(&mut state, Fork::Cancun, contract_a());
        assert!(report.is_success());
        U256::from_big_endian(&report.output)
    };
    assert_eq!(result, U256::from(0x1122334455667788u64));
}

// === Storage and transient storage =========================================

#[test]
fn sstore_sload_roundtrip() {
    let result = run_returning_top(&[
        push(42u64),
        push(7u64),
        Operation::Sstore,
        push(7u64),
        Operation::Sload,
    ]);
    assert_eq!(result, U256::from(42));
}

#[test]
fn sload_warm_costs_less() {
    // Two SLOADs of the same slot: 2100 cold + 100 warm (plus pushes)
    let report = run_ops(&[
        push(1u64),
        Operation::Sload,
        Operation::Pop,
        push(1u64),
        Operation::Sload,
        Operation::Stop,
    ]);
    assert_eq!(report.gas_used, 3 + 2100 + 2 + 3 + 100);
}

#[test]
fn transient_storage_is_tx_scoped() {
    let ops = [
        push(99u64),
        push(1u64),
        Operation::Tstore,
        push(1u64),
        Operation::Tload,
    ];
    let mut program = ops.to_vec();
    program.extend([
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ]);
    let mut state = state_with(vec![(contract_a(), account(&program, 0))]);
    let report = run(&mut state, Fork::Cancun, contract_a());
    assert_eq!(U256::from_big_endian(&report.output), U256::from(99));

    // The write never reaches persistent storage, and a new transaction
    // starts with cleared transient storage.
    assert_eq!(state.get_storage(contract_a(), U256::one()), U256::zero());
    state.begin_transaction();
    assert_eq!(state.get_transient(contract_a(), U256::one()), U256::zero());
}

// === Calls =================================================================

/// CALL with all-zero memory regions; pushes in reverse stack order.
fn call_ops(callee: Address, value: u64, gas: u64) -> Vec<Operation> {
    vec![
        Operation::Push((1, U256::zero())), // ret size
        Operation::Push((1, U256::zero())), // ret offset
        Operation::Push((1, U256::zero())), // args size
        Operation::Push((1, U256::zero())), // args offset
        Operation::Push((32, U256::from(value))),
        Operation::Push((32, U256::from_big_endian(callee.as_bytes()))),
        Operation::Push((32, U256::from(gas))),
        Operation::Call,
    ]
}

#[test]
fn call_transfers_value_and_runs_callee() {
    // B stores its callvalue at slot 0
    let callee = [
        Operation::Callvalue,
        Operation::Push((1, U256::zero())),
        Operation::Sstore,
        Operation::Stop,
    ];
    let mut caller = call_ops(contract_b(), 5, 100_000);
    caller.push(Operation::Stop);

    let mut state = state_with(vec![
        (contract_a(), account(&caller, 100)),
        (contract_b(), account(&callee, 0)),
    ]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert!(report.is_success());
    assert_eq!(state.get_storage(contract_b(), U256::zero()), U256::from(5));
    assert_eq!(state.get_balance(contract_a()), U256::from(95));
    assert_eq!(state.get_balance(contract_b()), U256::from(5));
}

#[test]
fn call_with_insufficient_balance_pushes_zero() {
    let mut caller = call_ops(contract_b(), 101, 100_000);
    // return the flag
    caller.extend([
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ]);
    let mut state = state_with(vec![
        (contract_a(), account(&caller, 100)),
        (contract_b(), account(&[Operation::Stop], 0)),
    ]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::zero());
    assert_eq!(state.get_balance(contract_a()), U256::from(100));
}

#[test]
fn staticcall_blocks_sstore() {
    let callee = [
        Operation::Push((1, U256::one())),
        Operation::Push((1, U256::zero())),
        Operation::Sstore,
        Operation::Stop,
    ];
    let caller = vec![
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((32, U256::from_big_endian(contract_b().as_bytes()))),
        Operation::Push((32, U256::from(100_000))),
        Operation::StaticCall,
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ];
    let mut state = state_with(vec![
        (contract_a(), account(&caller, 0)),
        (contract_b(), account(&callee, 0)),
    ]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert!(report.is_success());
    // the static child failed and pushed 0; nothing was written
    assert_eq!(U256::from_big_endian(&report.output), U256::zero());
    assert_eq!(state.get_storage(contract_b(), U256::zero()), U256::zero());
}

#[test]
fn static_context_propagates_to_nested_calls() {
    // B CALLs itself with value 1; inside a static context that is write
    // protection even though B's own frame came from a plain CALL.
    let callee: Vec<Operation> = call_ops(contract_b(), 1, 50_000)
        .into_iter()
        .chain([Operation::Stop])
        .collect();
    let caller = vec![
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((32, U256::from_big_endian(contract_b().as_bytes()))),
        Operation::Push((32, U256::from(200_000))),
        Operation::StaticCall,
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ];
    let mut state = state_with(vec![
        (contract_a(), account(&caller, 0)),
        (contract_b(), account(&callee, 100)),
    ]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::zero());
}

#[test]
fn delegatecall_keeps_caller_context() {
    // B writes CALLER to slot 0 and ADDRESS to slot 1
    let callee = [
        Operation::Caller,
        Operation::Push((1, U256::zero())),
        Operation::Sstore,
        Operation::Address,
        Operation::Push((1, U256::one())),
        Operation::Sstore,
        Operation::Stop,
    ];
    let caller = vec![
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((32, U256::from_big_endian(contract_b().as_bytes()))),
        Operation::Push((32, U256::from(100_000))),
        Operation::DelegateCall,
        Operation::Stop,
    ];
    let mut state = state_with(vec![
        (contract_a(), account(&caller, 0)),
        (contract_b(), account(&callee, 0)),
    ]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert!(report.is_success());

    // storage written under A, not B; caller is the origin, address is A
    assert_eq!(
        state.get_storage(contract_a(), U256::zero()),
        U256::from_big_endian(sender().as_bytes())
    );
    assert_eq!(
        state.get_storage(contract_a(), U256::one()),
        U256::from_big_endian(contract_a().as_bytes())
    );
    assert_eq!(state.get_storage(contract_b(), U256::zero()), U256::zero());
}

#[test]
fn revert_rolls_back_child_state_and_returns_data() {
    // B stores then reverts with a word of data
    let callee = [
        push(7u64),
        push(0u64),
        Operation::Sstore,
        push(0xabcdu64),
        push(0u64),
        Operation::Mstore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Revert,
    ];
    // A calls B with a 32-byte return area at 0, then returns it
    let caller = vec![
        Operation::Push((1, U256::from(32))), // ret size
        Operation::Push((1, U256::zero())),   // ret offset
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((32, U256::from_big_endian(contract_b().as_bytes()))),
        Operation::Push((32, U256::from(100_000))),
        Operation::Call,
        Operation::Pop,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ];
    let mut state = state_with(vec![
        (contract_a(), account(&caller, 0)),
        (contract_b(), account(&callee, 0)),
    ]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::from(0xabcd));
    // the SSTORE in B was rolled back
    assert_eq!(state.get_storage(contract_b(), U256::zero()), U256::zero());
}

#[test]
fn call_depth_limit_pushes_zero() {
    // B calls itself unconditionally; the chain stops at the depth limit
    // and unwinds successfully.
    let callee: Vec<Operation> = call_ops(contract_b(), 0, 10_000_000)
        .into_iter()
        .chain([Operation::Stop])
        .collect();
    let mut state = state_with(vec![(contract_b(), account(&callee, 0))]);
    state.begin_transaction();
    let report = VM::new_call(
        environment(Fork::Shanghai),
        &mut state,
        contract_b(),
        30_000_000,
        U256::zero(),
        Bytes::new(),
    )
    .execute()
    .unwrap();
    assert!(report.is_success());
}

#[test]
fn ecrecover_precompile_via_call() {
    // A calls address 0x01 with a valid (hash, v, r, s) payload in memory.
    let mut ops = Vec::new();
    let words = [
        hex!("daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"),
        {
            let mut v = [0u8; 32];
            v[31] = 27;
            v
        },
        hex!("28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276"),
        hex!("67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"),
    ];
    for (i, word) in words.iter().enumerate() {
        ops.push(Operation::Push((32, U256::from_big_endian(word))));
        ops.push(Operation::Push((1, U256::from(i * 32))));
        ops.push(Operation::Mstore);
    }
    ops.extend([
        Operation::Push((1, U256::from(32))),  // ret size
        Operation::Push((1, U256::zero())),    // ret offset -> overwrite input
        Operation::Push((1, U256::from(128))), // args size
        Operation::Push((1, U256::zero())),    // args offset
        Operation::Push((1, U256::zero())),    // value
        Operation::Push((1, U256::one())),     // address 0x01
        Operation::Push((2, U256::from(5000))),
        Operation::Call,
        Operation::Pop,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ]);
    let report = run_ops(&ops);
    assert!(report.is_success());
    assert_eq!(
        &report.output[12..],
        hex!("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f")
    );
}

// === Logs ==================================================================

#[test]
fn log_appends_entry_with_topics() {
    // LOG1 pops offset, size, topic
    let ops = [
        push(0xfeedu64), // topic
        push(0u64),      // size
        push(0u64),      // offset
        Operation::Log(1),
        Operation::Stop,
    ];
    let mut state = state_with(vec![(contract_a(), account(&ops, 0))]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert!(report.is_success());
    assert_eq!(state.logs().len(), 1);
    assert_eq!(state.logs()[0].address, contract_a());
    assert_eq!(
        state.logs()[0].topics,
        vec![H256::from_low_u64_be(0xfeed)]
    );
}

#[test]
fn log_in_static_context_fails() {
    let callee = [
        push(0u64),
        push(0u64),
        Operation::Log(0),
        Operation::Stop,
    ];
    let caller = vec![
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((32, U256::from_big_endian(contract_b().as_bytes()))),
        Operation::Push((32, U256::from(100_000))),
        Operation::StaticCall,
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ];
    let mut state = state_with(vec![
        (contract_a(), account(&caller, 0)),
        (contract_b(), account(&callee, 0)),
    ]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::zero());
    assert!(state.logs().is_empty());
}

// === CREATE ================================================================

#[test]
fn create_deploys_runtime_code() {
    // init code: PUSH1 5, PUSH1 0, RETURN — returns 5 zero-initialized bytes
    let init = hex!("60056000f3");
    let mut word = [0u8; 32];
    word[..5].copy_from_slice(&init);

    let ops = [
        Operation::Push((32, U256::from_big_endian(&word))),
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::from(5))), // size
        Operation::Push((1, U256::zero())), // offset
        Operation::Push((1, U256::zero())), // value
        Operation::Create,
        Operation::Stop,
    ];
    let mut state = state_with(vec![(contract_a(), account(&ops, 0))]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert!(report.is_success());

    let created = calculate_create_address(contract_a(), 0);
    assert_eq!(state.get_code(created).as_ref(), &[0u8; 5]);
    assert_eq!(state.get_nonce(created), 1);
    assert_eq!(state.get_nonce(contract_a()), 1);
}

#[test]
fn create_collision_pushes_zero() {
    let init_word = {
        let mut word = [0u8; 32];
        word[..5].copy_from_slice(&hex!("60056000f3"));
        U256::from_big_endian(&word)
    };
    let ops = [
        Operation::Push((32, init_word)),
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::from(5))),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Create,
        Operation::Push((1, U256::zero())),
        Operation::Mstore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ];
    let created = calculate_create_address(contract_a(), 0);
    let mut state = state_with(vec![
        (contract_a(), account(&ops, 0)),
        (
            created,
            GenesisAccount {
                nonce: 1,
                ..Default::default()
            },
        ),
    ]);
    let report = run(&mut state, Fork::Shanghai, contract_a());
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::zero());
}

// === SELFDESTRUCT ==========================================================

#[test]
fn selfdestruct_moves_balance_and_removes_account() {
    let victim = [
        Operation::Push((32, U256::from_big_endian(contract_a().as_bytes()))),
        Operation::SelfDestruct,
    ];
    let mut state = state_with(vec![
        (contract_a(), account(&[Operation::Stop], 0)),
        (contract_b(), account(&victim, 50)),
    ]);
    let report = run(&mut state, Fork::Shanghai, contract_b());
    assert!(report.is_success());
    assert_eq!(state.get_balance(contract_a()), U256::from(50));
    assert_eq!(state.get_balance(contract_b()), U256::zero());

    state.process_destroyed_accounts();
    assert!(!state.account_exists(contract_b()));
}

#[test]
fn selfdestruct_post_cancun_keeps_old_accounts() {
    let victim = [
        Operation::Push((32, U256::from_big_endian(contract_a().as_bytes()))),
        Operation::SelfDestruct,
    ];
    let mut state = state_with(vec![
        (contract_a(), account(&[Operation::Stop], 0)),
        (contract_b(), account(&victim, 50)),
    ]);
    let report = run(&mut state, Fork::Cancun, contract_b());
    assert!(report.is_success());
    assert_eq!(state.get_balance(contract_a()), U256::from(50));

    state.process_destroyed_accounts();
    // pre-existing account survives EIP-6780, only its balance moved
    assert!(state.account_exists(contract_b()));
}

// === Snapshot/revert invariant =============================================

#[test]
fn reverted_execution_leaves_state_root_unchanged() {
    let callee = [
        push(7u64),
        push(0u64),
        Operation::Sstore,
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Revert,
    ];
    let mut state = state_with(vec![(contract_b(), account(&callee, 9))]);
    let root_before = state.state_root().unwrap();

    state.begin_transaction();
    let snapshot = state.snapshot();
    let report = VM::new_call(
        environment(Fork::Shanghai),
        &mut state,
        contract_b(),
        GAS,
        U256::zero(),
        Bytes::new(),
    )
    .execute()
    .unwrap();
    assert_eq!(report.result, TxResult::Revert(VMError::Revert));
    state.revert_to_snapshot(snapshot);

    assert_eq!(state.state_root().unwrap(), root_before);
}
