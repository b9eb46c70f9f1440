mod common;

use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
};
use solana_sdk::signature::{Keypair, Signer};
use std::rc::Rc;

use common::*;
use proxied_lottery::{
    storage::{Namespace, StorageKey},
    utils, InvokeContext, LotteryError, Program, Runtime, RuntimeConfig,
};

const COUNTER_NAMESPACE: Namespace = Namespace(0x90);

fn counter_key() -> StorageKey {
    StorageKey::new(COUNTER_NAMESPACE, b"count".to_vec())
}

/// Increments a counter, then calls itself `input[0]` more times
struct Recursor;

impl Program for Recursor {
    fn code(&self) -> &'static [u8] {
        b"test/recursor"
    }

    fn namespace(&self) -> Namespace {
        COUNTER_NAMESPACE
    }

    fn process(&self, ctx: &mut InvokeContext, input: &[u8]) -> Result<Vec<u8>, ProgramError> {
        let count: u64 = ctx.get(&counter_key())?.unwrap_or(0);
        ctx.set(counter_key(), &(count + 1))?;

        let remaining = input.first().copied().unwrap_or(0);
        if remaining > 0 {
            let this = *ctx.this();
            ctx.invoke(&this, 0, &[remaining - 1])?;
        }
        utils::encode(&(count + 1))
    }
}

fn call(program: &Pubkey, signer: &Pubkey, depth: u8) -> Instruction {
    Instruction {
        program_id: *program,
        accounts: vec![AccountMeta::new(*signer, true)],
        data: vec![depth],
    }
}

fn stored_count(runtime: &Runtime, program: &Pubkey) -> Option<u64> {
    runtime.storage(program).unwrap().get(&counter_key()).unwrap()
}

#[test]
fn test_nested_calls_commit_together() {
    let mut runtime = Runtime::default();
    let signer = Keypair::new().pubkey();
    let program = runtime.deploy(&signer, Rc::new(Recursor)).unwrap();

    runtime.process_instruction(&call(&program, &signer, 3), 0).unwrap();
    assert_eq!(stored_count(&runtime, &program), Some(4));
}

#[test]
fn test_call_depth_limit_rolls_back_everything() {
    let mut runtime = Runtime::new(RuntimeConfig {
        max_call_depth: 4,
        ..RuntimeConfig::default()
    });
    let signer = Keypair::new().pubkey();
    let program = runtime.deploy(&signer, Rc::new(Recursor)).unwrap();

    runtime.process_instruction(&call(&program, &signer, 3), 0).unwrap();
    assert_eq!(stored_count(&runtime, &program), Some(4));

    assert_lottery_error(
        runtime.process_instruction(&call(&program, &signer, 4), 0),
        LotteryError::CallDepthExceeded,
    );
    assert_eq!(stored_count(&runtime, &program), Some(4));
}

#[test]
fn test_simulate_never_commits() {
    let mut runtime = Runtime::default();
    let signer = Keypair::new().pubkey();
    let program = runtime.deploy(&signer, Rc::new(Recursor)).unwrap();

    let data = runtime.simulate(&call(&program, &signer, 0)).unwrap();
    assert_eq!(utils::decode::<u64>(&data).unwrap(), 1);
    assert_eq!(stored_count(&runtime, &program), None);
}

#[test]
fn test_calls_need_code_and_a_signer() {
    let mut runtime = Runtime::default();
    let signer = Keypair::new().pubkey();
    let empty = Keypair::new().pubkey();

    assert_lottery_error(
        runtime.process_instruction(&call(&empty, &signer, 0), 0),
        LotteryError::AccountHasNoCode,
    );

    let program = runtime.deploy(&signer, Rc::new(Recursor)).unwrap();
    let unsigned = Instruction {
        program_id: program,
        accounts: vec![AccountMeta::new_readonly(signer, false)],
        data: vec![0],
    };
    assert_eq!(
        runtime.process_instruction(&unsigned, 0).unwrap_err(),
        ProgramError::MissingRequiredSignature
    );
}

#[test]
fn test_value_moves_with_the_call() {
    let mut runtime = Runtime::default();
    let payer = Keypair::new();
    runtime.airdrop(&payer.pubkey(), 1_000).unwrap();
    let program = runtime.deploy(&payer.pubkey(), Rc::new(Recursor)).unwrap();

    runtime.process_instruction(&call(&program, &payer.pubkey(), 0), 400).unwrap();
    assert_eq!(runtime.balance(&payer.pubkey()), 600);
    assert_eq!(runtime.balance(&program), 400);

    assert_eq!(
        runtime.process_instruction(&call(&program, &payer.pubkey(), 0), 601).unwrap_err(),
        ProgramError::InsufficientFunds
    );
    assert_eq!(runtime.balance(&payer.pubkey()), 600);
}

#[test]
fn test_deploys_get_distinct_addresses() {
    let mut runtime = Runtime::default();
    let deployer = Keypair::new().pubkey();
    let first = runtime.deploy(&deployer, Rc::new(Recursor)).unwrap();
    let second = runtime.deploy(&deployer, Rc::new(Recursor)).unwrap();
    assert_ne!(first, second);
    assert_eq!(first, utils::derive_deploy_address(&deployer, 0).unwrap());
}

#[test]
fn test_warp_moves_clock_and_blockhash() {
    let mut runtime = Runtime::default();
    let (now, blockhash) = (runtime.clock().unix_timestamp, runtime.recent_blockhash());

    runtime.warp_forward(ONE_HOUR);
    assert_eq!(runtime.clock().unix_timestamp, now + 3600);
    assert_ne!(runtime.recent_blockhash(), blockhash);
}
