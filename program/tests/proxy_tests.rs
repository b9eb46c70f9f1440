mod common;

use solana_program::{program_error::ProgramError, pubkey::Pubkey};
use solana_sdk::signature::{Keypair, Signer};
use std::rc::Rc;

use common::*;
use proxied_lottery::{
    event::Event,
    instruction,
    processor::LotteryEngine,
    proxy::{self, Proxy},
    storage::{Namespace, StorageKey},
    ticket::TicketLedger,
    InvokeContext, LotteryError, Program, Runtime,
};

#[test]
fn test_initialize_records_implementation_and_owner() {
    let mut fixture = setup();
    let owner = fixture.owner_key();

    let implementation: Option<Pubkey> = fixture.query(proxy::implementation(&fixture.lottery, &owner));
    assert_eq!(implementation, Some(fixture.engine));

    let stored_owner: Option<Pubkey> = fixture.query(proxy::owner(&fixture.lottery, &owner));
    assert_eq!(stored_owner, Some(owner));

    let initialized = fixture
        .runtime
        .events(&fixture.lottery)
        .into_iter()
        .any(|event| {
            *event
                == Event::ProxyInitialized {
                    implementation: fixture.engine,
                    owner,
                }
        });
    assert!(initialized);
}

#[test]
fn test_implementation_query_is_owner_only() {
    let mut fixture = setup();
    let stranger = fixture.buyer(0);
    let ix = proxy::implementation(&fixture.lottery, &stranger);
    assert_lottery_error(fixture.runtime.simulate(&ix), LotteryError::NotOwner);

    // Anyone may read the owner
    let stored_owner: Option<Pubkey> = fixture.query(proxy::owner(&fixture.lottery, &stranger));
    assert_eq!(stored_owner, Some(fixture.owner_key()));
}

#[test]
fn test_initialize_only_once() {
    let mut fixture = setup();
    let owner = fixture.owner_key();
    let other_engine = fixture.runtime.deploy(&owner, Rc::new(LotteryEngine)).unwrap();

    let ix = proxy::initialize(&fixture.lottery, &owner, &other_engine, None);
    assert_lottery_error(fixture.runtime.process_instruction(&ix, 0), LotteryError::AlreadyInitialized);

    // The engine's own initializer cannot claim the proxy either
    let stranger = fixture.buyer(0);
    let ix = instruction::initialize(&fixture.lottery, &stranger);
    assert_lottery_error(fixture.runtime.process_instruction(&ix, 0), LotteryError::AlreadyInitialized);
}

#[test]
fn test_uninitialized_proxy_rejects_forwarded_calls() {
    let mut runtime = Runtime::default();
    let deployer = Keypair::new();
    let lottery = runtime.deploy(&deployer.pubkey(), Rc::new(Proxy)).unwrap();

    let ix = instruction::buy_tickets(&lottery, &deployer.pubkey(), 1);
    assert_lottery_error(runtime.process_instruction(&ix, 0), LotteryError::ImplementationNotSet);

    let ix = instruction::is_active(&lottery, &deployer.pubkey());
    assert_lottery_error(runtime.simulate(&ix), LotteryError::ImplementationNotSet);

    let owner: Option<Pubkey> = query(&mut runtime, &proxy::owner(&lottery, &deployer.pubkey()));
    assert_eq!(owner, None);
}

#[test]
fn test_initialize_rejects_invalid_implementation() {
    let mut runtime = Runtime::default();
    let deployer = Keypair::new().pubkey();
    let lottery = runtime.deploy(&deployer, Rc::new(Proxy)).unwrap();
    let another_proxy = runtime.deploy(&deployer, Rc::new(Proxy)).unwrap();
    let no_code = Keypair::new().pubkey();

    for implementation in [no_code, another_proxy] {
        let ix = proxy::initialize(&lottery, &deployer, &implementation, None);
        assert_lottery_error(runtime.process_instruction(&ix, 0), LotteryError::InvalidImplementation);
    }

    let owner: Option<Pubkey> = query(&mut runtime, &proxy::owner(&lottery, &deployer));
    assert_eq!(owner, None);
}

#[test]
fn test_delegated_calls_keep_caller_and_value() {
    let mut fixture = setup();
    fixture.start(DURATION_HOURS, TICKET_PRICE).unwrap();
    fixture.buy(0, 3, 3 * TICKET_PRICE).unwrap();

    let (buyer, lottery) = (fixture.buyer(0), fixture.lottery);
    assert_eq!(fixture.stake_of(&buyer), 3);
    assert_eq!(fixture.ticket_balance(&buyer), 3);
    assert_eq!(fixture.ticket_balance(&lottery), 0);

    // Lamports stay with the proxy
    assert_eq!(fixture.runtime.balance(&fixture.lottery), 3 * TICKET_PRICE);
    assert_eq!(fixture.runtime.balance(&fixture.engine), 0);
}

#[test]
fn test_engine_state_lives_in_proxy_storage() {
    let mut fixture = setup();
    fixture.start(DURATION_HOURS, TICKET_PRICE).unwrap();
    fixture.buy(0, 1, TICKET_PRICE).unwrap();

    let namespaces = fixture.runtime.storage(&fixture.lottery).unwrap().namespaces();
    assert!(namespaces.contains(&Namespace::PROXY));
    assert!(namespaces.contains(&Namespace::ACCESS));
    assert!(namespaces.contains(&Namespace::ENGINE));

    assert!(fixture.runtime.storage(&fixture.engine).unwrap().is_empty());

    // The bare engine knows nothing about the proxied round
    let owner = fixture.owner_key();
    let active: bool = query(&mut fixture.runtime, &instruction::is_active(&fixture.engine, &owner));
    assert!(!active);
    assert!(fixture.is_active());
}

#[test]
fn test_upgrade_keeps_state() {
    let mut fixture = setup();
    let owner = fixture.owner_key();
    fixture.start(DURATION_HOURS, TICKET_PRICE).unwrap();
    fixture.buy(0, 2, 2 * TICKET_PRICE).unwrap();

    let upgraded = fixture.runtime.deploy(&owner, Rc::new(LotteryEngine)).unwrap();

    let stranger = fixture.buyer(0);
    let ix = proxy::upgrade_to(&fixture.lottery, &stranger, &upgraded);
    assert_lottery_error(fixture.runtime.process_instruction(&ix, 0), LotteryError::NotOwner);

    let ix = proxy::upgrade_to(&fixture.lottery, &owner, &upgraded);
    fixture.runtime.process_instruction(&ix, 0).unwrap();
    assert_eq!(
        fixture.runtime.events(&fixture.lottery).last().map(|event| (*event).clone()),
        Some(Event::Upgraded { implementation: upgraded })
    );

    let implementation: Option<Pubkey> = fixture.query(proxy::implementation(&fixture.lottery, &owner));
    assert_eq!(implementation, Some(upgraded));
    assert!(fixture.is_active());
    assert_eq!(fixture.prize_pool(), 2 * TICKET_PRICE);

    fixture.runtime.warp_forward(ONE_HOUR);
    fixture.select_winner().unwrap();
    assert_eq!(fixture.runtime.balance(&fixture.lottery), TICKET_PRICE);
}

#[test]
fn test_upgrade_rejects_invalid_implementation() {
    let mut fixture = setup();
    let (owner, lottery) = (fixture.owner_key(), fixture.lottery);

    for implementation in [Keypair::new().pubkey(), lottery] {
        let ix = proxy::upgrade_to(&lottery, &owner, &implementation);
        assert_lottery_error(fixture.runtime.process_instruction(&ix, 0), LotteryError::InvalidImplementation);
    }

    let implementation: Option<Pubkey> = fixture.query(proxy::implementation(&lottery, &owner));
    assert_eq!(implementation, Some(fixture.engine));
}

#[test]
fn test_transfer_ownership() {
    let mut fixture = setup();
    let (owner, successor) = (fixture.owner_key(), fixture.buyer(4));

    let ix = proxy::transfer_ownership(&fixture.lottery, &successor, &successor);
    assert_lottery_error(fixture.runtime.process_instruction(&ix, 0), LotteryError::NotOwner);

    let ix = proxy::transfer_ownership(&fixture.lottery, &owner, &Pubkey::default());
    assert_eq!(
        fixture.runtime.process_instruction(&ix, 0).unwrap_err(),
        ProgramError::InvalidArgument
    );

    let ix = proxy::transfer_ownership(&fixture.lottery, &owner, &successor);
    fixture.runtime.process_instruction(&ix, 0).unwrap();
    assert_eq!(
        fixture.runtime.events(&fixture.lottery).last().map(|event| (*event).clone()),
        Some(Event::OwnershipTransferred {
            previous_owner: owner,
            new_owner: successor,
        })
    );

    // The engine consults the same owner record
    assert_lottery_error(fixture.start(DURATION_HOURS, TICKET_PRICE), LotteryError::NotOwner);
    let ix = instruction::start_new_lottery(&fixture.lottery, &successor, DURATION_HOURS, TICKET_PRICE);
    fixture.runtime.process_instruction(&ix, 0).unwrap();

    let stored_owner: Option<Pubkey> = fixture.query(instruction::owner(&fixture.lottery, &owner));
    assert_eq!(stored_owner, Some(successor));
}

const INTRUDER_NAMESPACE: Namespace = Namespace(0x81);

/// Implementation that tries to overwrite the proxy's implementation slot
struct SlotClobber;

impl Program for SlotClobber {
    fn code(&self) -> &'static [u8] {
        b"test/slot-clobber"
    }

    fn namespace(&self) -> Namespace {
        INTRUDER_NAMESPACE
    }

    fn process(&self, ctx: &mut InvokeContext, _input: &[u8]) -> Result<Vec<u8>, ProgramError> {
        ctx.set(StorageKey::new(INTRUDER_NAMESPACE, b"touched".to_vec()), &true)?;
        let this = *ctx.this();
        ctx.set(StorageKey::new(Namespace::PROXY, b"implementation".to_vec()), &this)?;
        Ok(Vec::new())
    }
}

#[test]
fn test_implementation_cannot_touch_proxy_slots() {
    let mut fixture = setup();
    let owner = fixture.owner_key();
    let clobber = fixture.runtime.deploy(&owner, Rc::new(SlotClobber)).unwrap();

    let ix = proxy::upgrade_to(&fixture.lottery, &owner, &clobber);
    fixture.runtime.process_instruction(&ix, 0).unwrap();

    let ix = instruction::select_winner(&fixture.lottery, &owner);
    assert_lottery_error(
        fixture.runtime.process_instruction(&ix, 0),
        LotteryError::StorageNamespaceViolation,
    );

    let storage = fixture.runtime.storage(&fixture.lottery).unwrap();
    assert!(!storage.namespaces().contains(&INTRUDER_NAMESPACE));
    let implementation: Option<Pubkey> = storage
        .get(&StorageKey::new(Namespace::PROXY, b"implementation".to_vec()))
        .unwrap();
    assert_eq!(implementation, Some(clobber));
}

#[test]
fn test_implementation_errors_pass_through() {
    let mut runtime = Runtime::default();
    let deployer = Keypair::new();
    let ledger = runtime.deploy(&deployer.pubkey(), Rc::new(TicketLedger)).unwrap();
    let lottery = runtime.deploy(&deployer.pubkey(), Rc::new(Proxy)).unwrap();

    // Any code outside the reserved namespaces is accepted
    let ix = proxy::initialize(&lottery, &deployer.pubkey(), &ledger, None);
    runtime.process_instruction(&ix, 0).unwrap();

    let ix = instruction::is_active(&lottery, &deployer.pubkey());
    assert_eq!(runtime.simulate(&ix).unwrap_err(), ProgramError::InvalidInstructionData);
}
