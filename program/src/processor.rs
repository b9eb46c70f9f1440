// Proxied Lottery - Engine Processor
use solana_program::{
    clock::UnixTimestamp,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
};

use crate::{
    access,
    error::LotteryError,
    event::Event,
    instruction::LotteryInstruction,
    runtime::{InvokeContext, Program},
    state::{self, Round, RoundStatus, TicketRange},
    storage::Namespace,
    ticket::{self, ENTRY_LEDGER_INTERFACE},
    utils,
};

pub const ENGINE_CODE: &[u8] = b"proxied-lottery/engine/v1";

/// Upper bound of a single purchase (one-byte domain)
pub const MAX_TICKETS_PER_PURCHASE: u64 = u8::MAX as u64;
pub const SECONDS_PER_HOUR: i64 = 3600;
/// Winner receives prize_pool / PAYOUT_DIVISOR
pub const PAYOUT_DIVISOR: u64 = 2;

/// Lottery engine program
pub struct LotteryEngine;

impl Program for LotteryEngine {
    fn code(&self) -> &'static [u8] {
        ENGINE_CODE
    }

    fn namespace(&self) -> Namespace {
        Namespace::ENGINE
    }

    fn process(&self, ctx: &mut InvokeContext, input: &[u8]) -> Result<Vec<u8>, ProgramError> {
        Processor::process(ctx, input)
    }
}

/// Program state handler.
pub struct Processor {}

impl Processor {
    /// Process a lottery instruction against the executing account's storage
    pub fn process(ctx: &mut InvokeContext, instruction_data: &[u8]) -> Result<Vec<u8>, ProgramError> {
        let instruction = LotteryInstruction::unpack(instruction_data)?;

        match instruction {
            LotteryInstruction::Initialize {} => {
                msg!("Instruction: Initialize");
                Self::process_initialize(ctx)?;
            }
            LotteryInstruction::StartNewLottery {
                duration_hours,
                ticket_price,
            } => {
                msg!("Instruction: Start New Lottery");
                Self::process_start_new_lottery(ctx, duration_hours, ticket_price)?;
            }
            LotteryInstruction::BuyTickets { count } => {
                msg!("Instruction: Buy Tickets");
                Self::process_buy_tickets(ctx, count)?;
            }
            LotteryInstruction::SelectWinner {} => {
                msg!("Instruction: Select Winner");
                Self::process_select_winner(ctx)?;
            }
            LotteryInstruction::SetEntryLedger { ledger } => {
                msg!("Instruction: Set Entry Ledger");
                Self::process_set_entry_ledger(ctx, &ledger)?;
            }
            LotteryInstruction::IsActive {} => {
                let now = Self::now(ctx);
                let round = state::load_round(ctx)?;
                let active = state::status_of(round.as_ref(), now) == RoundStatus::Active;
                return utils::encode(&active);
            }
            LotteryInstruction::PrizePool {} => {
                let pool = state::load_round(ctx)?.map_or(0, |round| round.prize_pool);
                return utils::encode(&pool);
            }
            LotteryInstruction::TicketPrice {} => {
                let price = state::load_round(ctx)?.map_or(0, |round| round.ticket_price);
                return utils::encode(&price);
            }
            LotteryInstruction::EntryLedger {} => {
                return utils::encode(&state::load_ledger(ctx)?);
            }
            LotteryInstruction::CurrentRound {} => {
                return match state::load_round(ctx)? {
                    Some(round) => {
                        let mut data = vec![0u8; Round::LEN];
                        Round::pack(round, &mut data)?;
                        Ok(data)
                    }
                    None => Ok(Vec::new()),
                };
            }
            LotteryInstruction::StakeOf { account } => {
                let stake = match state::load_round(ctx)? {
                    Some(round) => state::load_stake(ctx, round.iteration, &account)?,
                    None => 0,
                };
                return utils::encode(&stake);
            }
            LotteryInstruction::Owner {} => {
                return utils::encode(&access::owner(ctx)?);
            }
        }
        Ok(Vec::new())
    }

    fn now(ctx: &InvokeContext) -> UnixTimestamp {
        ctx.clock().unix_timestamp
    }

    /// Standalone deployments record their owner here; behind a proxy the
    /// owner already exists and this fails
    fn process_initialize(ctx: &mut InvokeContext) -> ProgramResult {
        let owner = *ctx.caller();
        access::set_owner(ctx, &owner)?;
        msg!("Lottery engine owner set to {}", owner);
        Ok(())
    }

    fn process_start_new_lottery(ctx: &mut InvokeContext, duration_hours: u64, ticket_price: u64) -> ProgramResult {
        access::require_owner(ctx)?;

        let now = Self::now(ctx);
        let previous = state::load_round(ctx)?;
        if let Some(round) = &previous {
            if round.is_open(now) {
                return Err(LotteryError::LotteryAlreadyActive.into());
            }
            if !round.claimed {
                return Err(LotteryError::LotteryNotClaimed.into());
            }
        }

        let ledger = state::load_ledger(ctx)?.ok_or(LotteryError::LedgerNotSet)?;

        if duration_hours == 0 {
            msg!("Lottery duration must be at least one hour");
            return Err(ProgramError::InvalidArgument);
        }
        let duration_secs = i64::try_from(duration_hours)
            .ok()
            .and_then(|hours| hours.checked_mul(SECONDS_PER_HOUR))
            .ok_or(LotteryError::ArithmeticOverflow)?;

        let iteration = previous.map_or(1, |round| round.iteration.saturating_add(1));
        let round = Round::new(iteration, now, duration_secs, ticket_price, ledger)?;
        state::save_round(ctx, &round)?;

        msg!(
            "Lottery {} started: start={}, end={}, ticket_price={}",
            round.iteration,
            round.start_time,
            round.end_time,
            round.ticket_price
        );
        ctx.emit(Event::LotteryStarted {
            start_time: round.start_time,
            end_time: round.end_time,
            ticket_price: round.ticket_price,
        });
        Ok(())
    }

    fn process_buy_tickets(ctx: &mut InvokeContext, count: u64) -> ProgramResult {
        let now = Self::now(ctx);
        let mut round = match state::load_round(ctx)? {
            Some(round) if round.is_open(now) => round,
            _ => return Err(LotteryError::LotteryNotActive.into()),
        };

        if count == 0 {
            return Err(LotteryError::ZeroTickets.into());
        }
        if count > MAX_TICKETS_PER_PURCHASE {
            msg!("Cannot buy {} tickets, limit is {}", count, MAX_TICKETS_PER_PURCHASE);
            return Err(LotteryError::TicketCountOutOfBounds.into());
        }

        let cost = round
            .ticket_price
            .checked_mul(count)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        if ctx.value() < cost {
            msg!("Attached {} lamports, tickets cost {}", ctx.value(), cost);
            return Err(LotteryError::InsufficientFunds.into());
        }

        let buyer = *ctx.caller();
        round.prize_pool = round
            .prize_pool
            .checked_add(cost)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        round.tickets_sold = round
            .tickets_sold
            .checked_add(count)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        state::save_round(ctx, &round)?;
        state::add_stake(ctx, round.iteration, &buyer, count)?;

        let first_ticket_id = ticket::mint(ctx, &round.ledger, &buyer, count)?;
        state::append_entries(
            ctx,
            round.iteration,
            TicketRange {
                first_ticket_id,
                count,
            },
        )?;

        msg!("{} bought {} tickets for {} lamports", buyer, count, cost);
        ctx.emit(Event::TicketsBought { buyer, count });
        Ok(())
    }

    fn process_select_winner(ctx: &mut InvokeContext) -> ProgramResult {
        access::require_owner(ctx)?;

        let now = Self::now(ctx);
        let mut round = state::load_round(ctx)?.ok_or(LotteryError::LotteryNotActive)?;
        if !round.has_ended(now) {
            return Err(LotteryError::LotteryStillActive.into());
        }
        if round.claimed {
            return Err(LotteryError::AlreadyClaimed.into());
        }

        let winner = Self::draw_winner(ctx, &round)?;
        let payout = round.prize_pool / PAYOUT_DIVISOR;

        // Effects are persisted before any lamports leave the account
        round.claimed = true;
        round.winner = winner;
        round.prize_pool -= payout;
        state::save_round(ctx, &round)?;

        msg!(
            "Lottery {} winner {} receives {} lamports",
            round.iteration,
            winner,
            payout
        );
        ctx.emit(Event::WinnerSelected {
            winner,
            payout,
            iteration: round.iteration,
        });

        if payout > 0 {
            ctx.transfer(&winner, payout)?;
        }
        Ok(())
    }

    /// Current holder of a uniformly drawn ticket from this round
    fn draw_winner(ctx: &mut InvokeContext, round: &Round) -> Result<Pubkey, ProgramError> {
        if round.tickets_sold == 0 {
            msg!("Lottery {} sold no tickets", round.iteration);
            return Ok(Pubkey::default());
        }

        let seed = utils::draw_seed(
            &ctx.recent_blockhash(),
            ctx.this(),
            round.iteration,
            round.tickets_sold,
        );
        let index = utils::generate_random_value(seed.as_ref(), round.tickets_sold);
        let entries = state::load_entries(ctx, round.iteration)?;
        let ticket_id = state::ticket_at(&entries, index).ok_or(ProgramError::InvalidAccountData)?;
        msg!("Winning ticket {} (entry {} of {})", ticket_id, index, round.tickets_sold);

        ticket::owner_of(ctx, &round.ledger, ticket_id)
    }

    fn process_set_entry_ledger(ctx: &mut InvokeContext, ledger: &Pubkey) -> ProgramResult {
        access::require_owner(ctx)?;

        if !ctx.supports_interface(ledger, &ENTRY_LEDGER_INTERFACE) {
            msg!("{} does not support the entry ledger interface", ledger);
            return Err(LotteryError::UnsupportedLedger.into());
        }

        let now = Self::now(ctx);
        if state::status_of(state::load_round(ctx)?.as_ref(), now) == RoundStatus::Active {
            return Err(LotteryError::LedgerLocked.into());
        }

        state::save_ledger(ctx, ledger)?;
        msg!("Entry ledger set to {}", ledger);
        ctx.emit(Event::EntryLedgerChanged { ledger: *ledger });
        Ok(())
    }
}
