// Proxied Lottery - Entry Ticket Ledger
//
// Transferable entry tickets with sequential ids. The engine only relies on the
// capability surface: mint, owner_of and the entry ledger interface.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    entrypoint::ProgramResult,
    instruction::{AccountMeta, Instruction},
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    error::LotteryError,
    event::Event,
    runtime::{InterfaceId, InvokeContext, Program},
    storage::{Namespace, StorageKey},
    utils,
};

pub const TICKET_CODE: &[u8] = b"proxied-lottery/ticket-ledger/v1";

/// Advertised by ledgers the engine can mint entries on
pub const ENTRY_LEDGER_INTERFACE: InterfaceId = InterfaceId(*b"entrytkt");

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum TicketInstruction {
    /// Set metadata and the only address allowed to mint
    ///
    /// Accounts expected:
    /// 0. `[signer]` The deployer
    Initialize {
        name: String,
        symbol: String,
        minter: Pubkey,
    },

    /// Mint `count` tickets to `to`; returns the first ticket id
    ///
    /// Accounts expected:
    /// 0. `[signer]` The minter
    Mint { to: Pubkey, count: u64 },

    /// Move a ticket held by the caller
    ///
    /// Accounts expected:
    /// 0. `[signer]` The ticket holder
    Transfer { to: Pubkey, ticket_id: u64 },

    BalanceOf { owner: Pubkey },
    OwnerOf { ticket_id: u64 },
    TotalSupply,
    Name,
    Symbol,
}

impl TicketInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| ProgramError::InvalidInstructionData)
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        utils::encode(self)
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct TicketMetadata {
    pub name: String,
    pub symbol: String,
    pub minter: Pubkey,
}

#[derive(BorshSerialize)]
enum LedgerKey {
    Metadata,
    TotalSupply,
    Owner(u64),
    Balance(Pubkey),
}

fn ledger_key(key: LedgerKey) -> Result<StorageKey, ProgramError> {
    StorageKey::encoded(Namespace::LEDGER, &key)
}

/// Entry ticket ledger program
pub struct TicketLedger;

impl Program for TicketLedger {
    fn code(&self) -> &'static [u8] {
        TICKET_CODE
    }

    fn namespace(&self) -> Namespace {
        Namespace::LEDGER
    }

    fn supports_interface(&self, interface: &InterfaceId) -> bool {
        *interface == ENTRY_LEDGER_INTERFACE
    }

    fn process(&self, ctx: &mut InvokeContext, input: &[u8]) -> Result<Vec<u8>, ProgramError> {
        match TicketInstruction::unpack(input)? {
            TicketInstruction::Initialize { name, symbol, minter } => {
                msg!("Instruction: Initialize Ticket Ledger");
                Self::process_initialize(ctx, name, symbol, minter)?;
                Ok(Vec::new())
            }
            TicketInstruction::Mint { to, count } => {
                msg!("Instruction: Mint Tickets");
                utils::encode(&Self::process_mint(ctx, &to, count)?)
            }
            TicketInstruction::Transfer { to, ticket_id } => {
                msg!("Instruction: Transfer Ticket");
                Self::process_transfer(ctx, &to, ticket_id)?;
                Ok(Vec::new())
            }
            TicketInstruction::BalanceOf { owner } => utils::encode(&Self::balance(ctx, &owner)?),
            TicketInstruction::OwnerOf { ticket_id } => utils::encode(&Self::holder(ctx, ticket_id)?),
            TicketInstruction::TotalSupply => utils::encode(&Self::total_supply(ctx)?),
            TicketInstruction::Name => utils::encode(&Self::metadata(ctx)?.name),
            TicketInstruction::Symbol => utils::encode(&Self::metadata(ctx)?.symbol),
        }
    }
}

impl TicketLedger {
    fn metadata(ctx: &InvokeContext) -> Result<TicketMetadata, ProgramError> {
        ctx.get(&ledger_key(LedgerKey::Metadata)?)?
            .ok_or(ProgramError::UninitializedAccount)
    }

    fn total_supply(ctx: &InvokeContext) -> Result<u64, ProgramError> {
        Ok(ctx.get(&ledger_key(LedgerKey::TotalSupply)?)?.unwrap_or(0))
    }

    fn balance(ctx: &InvokeContext, owner: &Pubkey) -> Result<u64, ProgramError> {
        Ok(ctx.get(&ledger_key(LedgerKey::Balance(*owner))?)?.unwrap_or(0))
    }

    fn set_balance(ctx: &mut InvokeContext, owner: &Pubkey, balance: u64) -> ProgramResult {
        ctx.set(ledger_key(LedgerKey::Balance(*owner))?, &balance)
    }

    fn holder(ctx: &InvokeContext, ticket_id: u64) -> Result<Pubkey, ProgramError> {
        ctx.get(&ledger_key(LedgerKey::Owner(ticket_id))?)?
            .ok_or_else(|| LotteryError::TicketNotFound.into())
    }

    fn process_initialize(
        ctx: &mut InvokeContext,
        name: String,
        symbol: String,
        minter: Pubkey,
    ) -> ProgramResult {
        let key = ledger_key(LedgerKey::Metadata)?;
        if ctx.get_raw(&key)?.is_some() {
            msg!("Ticket ledger is already initialized");
            return Err(LotteryError::AlreadyInitialized.into());
        }
        msg!("Ticket ledger {} ({}) minter={}", name, symbol, minter);
        ctx.set(key, &TicketMetadata { name, symbol, minter })
    }

    fn process_mint(ctx: &mut InvokeContext, to: &Pubkey, count: u64) -> Result<u64, ProgramError> {
        let metadata = Self::metadata(ctx)?;
        if *ctx.caller() != metadata.minter {
            msg!("Caller {} is not the minter", ctx.caller());
            return Err(LotteryError::NotMinter.into());
        }
        if count == 0 {
            return Err(LotteryError::ZeroTickets.into());
        }

        let first_ticket_id = Self::total_supply(ctx)?;
        let total_supply = first_ticket_id
            .checked_add(count)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        for ticket_id in first_ticket_id..total_supply {
            ctx.set(ledger_key(LedgerKey::Owner(ticket_id))?, to)?;
        }
        let balance = Self::balance(ctx, to)?
            .checked_add(count)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        Self::set_balance(ctx, to, balance)?;
        ctx.set(ledger_key(LedgerKey::TotalSupply)?, &total_supply)?;

        ctx.emit(Event::TicketsMinted {
            to: *to,
            first_ticket_id,
            count,
        });
        Ok(first_ticket_id)
    }

    fn process_transfer(ctx: &mut InvokeContext, to: &Pubkey, ticket_id: u64) -> ProgramResult {
        let from = *ctx.caller();
        if Self::holder(ctx, ticket_id)? != from {
            return Err(LotteryError::NotTicketOwner.into());
        }
        if from == *to {
            return Ok(());
        }

        // Holder owns the ticket, so the balance is at least one
        let from_balance = Self::balance(ctx, &from)?.saturating_sub(1);
        let to_balance = Self::balance(ctx, to)?
            .checked_add(1)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        Self::set_balance(ctx, &from, from_balance)?;
        Self::set_balance(ctx, to, to_balance)?;
        ctx.set(ledger_key(LedgerKey::Owner(ticket_id))?, to)?;

        ctx.emit(Event::TicketTransferred {
            from,
            to: *to,
            ticket_id,
        });
        Ok(())
    }
}

/// Mint through the ledger on behalf of the executing account
pub fn mint(ctx: &mut InvokeContext, ledger: &Pubkey, to: &Pubkey, count: u64) -> Result<u64, ProgramError> {
    let data = TicketInstruction::Mint { to: *to, count }.pack()?;
    utils::decode(&ctx.invoke(ledger, 0, &data)?)
}

/// Current holder of `ticket_id`
pub fn owner_of(ctx: &mut InvokeContext, ledger: &Pubkey, ticket_id: u64) -> Result<Pubkey, ProgramError> {
    let data = TicketInstruction::OwnerOf { ticket_id }.pack()?;
    utils::decode(&ctx.invoke(ledger, 0, &data)?)
}

fn ticket_instruction(
    ledger: &Pubkey,
    signer: &Pubkey,
    instruction: TicketInstruction,
) -> Result<Instruction, ProgramError> {
    let data = instruction.pack()?;
    Ok(Instruction {
        program_id: *ledger,
        accounts: vec![AccountMeta::new(*signer, true)],
        data,
    })
}

/// Create initialize instruction
pub fn initialize(
    ledger: &Pubkey,
    deployer: &Pubkey,
    name: &str,
    symbol: &str,
    minter: &Pubkey,
) -> Result<Instruction, ProgramError> {
    ticket_instruction(
        ledger,
        deployer,
        TicketInstruction::Initialize {
            name: name.to_string(),
            symbol: symbol.to_string(),
            minter: *minter,
        },
    )
}

/// Create mint instruction
pub fn mint_to(
    ledger: &Pubkey,
    minter: &Pubkey,
    to: &Pubkey,
    count: u64,
) -> Result<Instruction, ProgramError> {
    ticket_instruction(ledger, minter, TicketInstruction::Mint { to: *to, count })
}

/// Create transfer instruction
pub fn transfer(
    ledger: &Pubkey,
    holder: &Pubkey,
    to: &Pubkey,
    ticket_id: u64,
) -> Result<Instruction, ProgramError> {
    ticket_instruction(ledger, holder, TicketInstruction::Transfer { to: *to, ticket_id })
}

pub fn balance_of(ledger: &Pubkey, reader: &Pubkey, owner: &Pubkey) -> Result<Instruction, ProgramError> {
    ticket_instruction(ledger, reader, TicketInstruction::BalanceOf { owner: *owner })
}

pub fn ticket_owner(ledger: &Pubkey, reader: &Pubkey, ticket_id: u64) -> Result<Instruction, ProgramError> {
    ticket_instruction(ledger, reader, TicketInstruction::OwnerOf { ticket_id })
}

pub fn total_supply(ledger: &Pubkey, reader: &Pubkey) -> Result<Instruction, ProgramError> {
    ticket_instruction(ledger, reader, TicketInstruction::TotalSupply)
}

pub fn name(ledger: &Pubkey, reader: &Pubkey) -> Result<Instruction, ProgramError> {
    ticket_instruction(ledger, reader, TicketInstruction::Name)
}

pub fn symbol(ledger: &Pubkey, reader: &Pubkey) -> Result<Instruction, ProgramError> {
    ticket_instruction(ledger, reader, TicketInstruction::Symbol)
}
