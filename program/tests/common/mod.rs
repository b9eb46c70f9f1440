#![allow(dead_code)]

use borsh::BorshDeserialize;
use solana_program::{
    instruction::Instruction, native_token::LAMPORTS_PER_SOL, program_error::ProgramError, pubkey::Pubkey,
};
use solana_sdk::signature::{Keypair, Signer};
use std::rc::Rc;

use proxied_lottery::{
    instruction,
    processor::LotteryEngine,
    proxy::{self, Proxy},
    ticket::{self, TicketLedger},
    utils, LotteryError, Runtime,
};

pub const TICKET_PRICE: u64 = LAMPORTS_PER_SOL / 1_000; // 0.001 SOL
pub const DURATION_HOURS: u64 = 1;
pub const ONE_HOUR: u64 = 3600;
pub const TICKET_NAME: &str = "TicketName";
pub const TICKET_SYMBOL: &str = "TN";

pub struct Fixture {
    pub runtime: Runtime,
    pub owner: Keypair,
    pub buyers: Vec<Keypair>,
    /// Address lottery instructions are sent to (the proxy, or the bare engine)
    pub lottery: Pubkey,
    pub engine: Pubkey,
    pub ledger: Pubkey,
}

impl Fixture {
    pub fn owner_key(&self) -> Pubkey {
        self.owner.pubkey()
    }

    pub fn buyer(&self, index: usize) -> Pubkey {
        self.buyers[index].pubkey()
    }

    pub fn start(&mut self, duration_hours: u64, ticket_price: u64) -> Result<Vec<u8>, ProgramError> {
        let ix = instruction::start_new_lottery(&self.lottery, &self.owner_key(), duration_hours, ticket_price);
        self.runtime.process_instruction(&ix, 0)
    }

    pub fn buy(&mut self, buyer: usize, count: u64, value: u64) -> Result<Vec<u8>, ProgramError> {
        let ix = instruction::buy_tickets(&self.lottery, &self.buyer(buyer), count);
        self.runtime.process_instruction(&ix, value)
    }

    pub fn select_winner(&mut self) -> Result<Vec<u8>, ProgramError> {
        let ix = instruction::select_winner(&self.lottery, &self.owner_key());
        self.runtime.process_instruction(&ix, 0)
    }

    pub fn query<T: BorshDeserialize>(&mut self, ix: Instruction) -> T {
        query(&mut self.runtime, &ix)
    }

    pub fn is_active(&mut self) -> bool {
        let ix = instruction::is_active(&self.lottery, &self.owner_key());
        self.query(ix)
    }

    pub fn prize_pool(&mut self) -> u64 {
        let ix = instruction::prize_pool(&self.lottery, &self.owner_key());
        self.query(ix)
    }

    pub fn stake_of(&mut self, account: &Pubkey) -> u64 {
        let ix = instruction::stake_of(&self.lottery, &self.owner_key(), account);
        self.query(ix)
    }

    pub fn ticket_balance(&mut self, holder: &Pubkey) -> u64 {
        let ix = ticket::balance_of(&self.ledger, &self.owner_key(), holder).unwrap();
        self.query(ix)
    }
}

pub fn query<T: BorshDeserialize>(runtime: &mut Runtime, ix: &Instruction) -> T {
    let data = runtime.simulate(ix).unwrap();
    utils::decode(&data).unwrap()
}

pub fn assert_lottery_error<T: std::fmt::Debug>(result: Result<T, ProgramError>, expected: LotteryError) {
    assert_eq!(result.unwrap_err(), ProgramError::from(expected));
}

fn funded_runtime(buyer_count: usize) -> (Runtime, Keypair, Vec<Keypair>) {
    let mut runtime = Runtime::default();
    let owner = Keypair::new();
    runtime.airdrop(&owner.pubkey(), 100 * LAMPORTS_PER_SOL).unwrap();

    let buyers: Vec<Keypair> = (0..buyer_count).map(|_| Keypair::new()).collect();
    for buyer in &buyers {
        runtime.airdrop(&buyer.pubkey(), 10 * LAMPORTS_PER_SOL).unwrap();
    }
    (runtime, owner, buyers)
}

/// Deploy a ticket ledger whose only minter is `minter`
pub fn deploy_ledger(runtime: &mut Runtime, deployer: &Pubkey, minter: &Pubkey) -> Pubkey {
    let ledger = runtime.deploy(deployer, Rc::new(TicketLedger)).unwrap();
    runtime
        .process_instruction(
            &ticket::initialize(&ledger, deployer, TICKET_NAME, TICKET_SYMBOL, minter).unwrap(),
            0,
        )
        .unwrap();
    ledger
}

/// Engine behind an initialized proxy, with a bound ticket ledger
pub fn setup() -> Fixture {
    let (mut runtime, owner, buyers) = funded_runtime(5);
    let deployer = owner.pubkey();

    let engine = runtime.deploy(&deployer, Rc::new(LotteryEngine)).unwrap();
    let lottery = runtime.deploy(&deployer, Rc::new(Proxy)).unwrap();
    runtime
        .process_instruction(&proxy::initialize(&lottery, &deployer, &engine, None), 0)
        .unwrap();

    let ledger = deploy_ledger(&mut runtime, &deployer, &lottery);
    runtime
        .process_instruction(&instruction::set_entry_ledger(&lottery, &deployer, &ledger), 0)
        .unwrap();

    Fixture {
        runtime,
        owner,
        buyers,
        lottery,
        engine,
        ledger,
    }
}

/// Engine used directly, without a proxy
pub fn setup_standalone() -> Fixture {
    let (mut runtime, owner, buyers) = funded_runtime(5);
    let deployer = owner.pubkey();

    let engine = runtime.deploy(&deployer, Rc::new(LotteryEngine)).unwrap();
    runtime
        .process_instruction(&instruction::initialize(&engine, &deployer), 0)
        .unwrap();

    let ledger = deploy_ledger(&mut runtime, &deployer, &engine);
    runtime
        .process_instruction(&instruction::set_entry_ledger(&engine, &deployer, &ledger), 0)
        .unwrap();

    Fixture {
        runtime,
        owner,
        buyers,
        lottery: engine,
        engine,
        ledger,
    }
}
