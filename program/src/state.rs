// Proxied Lottery - Engine State
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    entrypoint::ProgramResult,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};

use crate::{
    error::LotteryError,
    runtime::InvokeContext,
    storage::{Namespace, StorageKey},
};

/// Lifecycle of the latest round, derived from stored fields and the clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundStatus {
    /// No round has ever started
    Idle,
    /// Open for entries
    Active,
    /// End time reached, winner not selected yet
    EndedUnclaimed,
    Claimed,
}

/// One lottery iteration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Round {
    /// Is the record initialized
    pub is_initialized: bool,
    /// Sequential round number starting at 1
    pub iteration: u64,
    pub start_time: UnixTimestamp,
    pub end_time: UnixTimestamp,
    /// Price per ticket in lamports, fixed for the round
    pub ticket_price: u64,
    /// Lamports collected from ticket sales, reduced once by the payout
    pub prize_pool: u64,
    pub tickets_sold: u64,
    pub claimed: bool,
    /// Entry ledger bound when the round started
    pub ledger: Pubkey,
    /// Winner of the round (zero until claimed, or if nothing was sold)
    pub winner: Pubkey,
}

impl Sealed for Round {}

impl IsInitialized for Round {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Round {
    pub fn new(
        iteration: u64,
        start_time: UnixTimestamp,
        duration_secs: i64,
        ticket_price: u64,
        ledger: Pubkey,
    ) -> Result<Self, ProgramError> {
        let end_time = start_time
            .checked_add(duration_secs)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        Ok(Self {
            is_initialized: true,
            iteration,
            start_time,
            end_time,
            ticket_price,
            prize_pool: 0,
            tickets_sold: 0,
            claimed: false,
            ledger,
            winner: Pubkey::default(),
        })
    }

    /// Open for entries
    pub fn is_open(&self, now: UnixTimestamp) -> bool {
        !self.claimed && now < self.end_time
    }

    pub fn has_ended(&self, now: UnixTimestamp) -> bool {
        now >= self.end_time
    }

    pub fn status(&self, now: UnixTimestamp) -> RoundStatus {
        if self.claimed {
            RoundStatus::Claimed
        } else if self.is_open(now) {
            RoundStatus::Active
        } else {
            RoundStatus::EndedUnclaimed
        }
    }
}

/// Status of the stored round, `Idle` when none has started
pub fn status_of(round: Option<&Round>, now: UnixTimestamp) -> RoundStatus {
    round.map_or(RoundStatus::Idle, |round| round.status(now))
}

impl Pack for Round {
    const LEN: usize = 1 + 8 + 8 + 8 + 8 + 8 + 8 + 1 + 32 + 32;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Round::LEN];
        let (
            is_initialized,
            iteration,
            start_time,
            end_time,
            ticket_price,
            prize_pool,
            tickets_sold,
            claimed,
            ledger,
            winner,
        ) = array_refs![src, 1, 8, 8, 8, 8, 8, 8, 1, 32, 32];

        Ok(Round {
            is_initialized: is_initialized[0] != 0,
            iteration: u64::from_le_bytes(*iteration),
            start_time: UnixTimestamp::from_le_bytes(*start_time),
            end_time: UnixTimestamp::from_le_bytes(*end_time),
            ticket_price: u64::from_le_bytes(*ticket_price),
            prize_pool: u64::from_le_bytes(*prize_pool),
            tickets_sold: u64::from_le_bytes(*tickets_sold),
            claimed: claimed[0] != 0,
            ledger: Pubkey::new_from_array(*ledger),
            winner: Pubkey::new_from_array(*winner),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Round::LEN];
        let (
            is_initialized_dst,
            iteration_dst,
            start_time_dst,
            end_time_dst,
            ticket_price_dst,
            prize_pool_dst,
            tickets_sold_dst,
            claimed_dst,
            ledger_dst,
            winner_dst,
        ) = mut_array_refs![dst, 1, 8, 8, 8, 8, 8, 8, 1, 32, 32];

        is_initialized_dst[0] = self.is_initialized as u8;
        *iteration_dst = self.iteration.to_le_bytes();
        *start_time_dst = self.start_time.to_le_bytes();
        *end_time_dst = self.end_time.to_le_bytes();
        *ticket_price_dst = self.ticket_price.to_le_bytes();
        *prize_pool_dst = self.prize_pool.to_le_bytes();
        *tickets_sold_dst = self.tickets_sold.to_le_bytes();
        claimed_dst[0] = self.claimed as u8;
        ledger_dst.copy_from_slice(self.ledger.as_ref());
        winner_dst.copy_from_slice(self.winner.as_ref());
    }
}

/// Contiguous ticket ids minted by one purchase
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TicketRange {
    pub first_ticket_id: u64,
    pub count: u64,
}

/// Ticket id at position `index` across the round's purchases
pub fn ticket_at(ranges: &[TicketRange], index: u64) -> Option<u64> {
    let mut remaining = index;
    for range in ranges {
        if remaining < range.count {
            return range.first_ticket_id.checked_add(remaining);
        }
        remaining -= range.count;
    }
    None
}

#[derive(BorshSerialize)]
enum EngineKey {
    Round,
    Ledger,
    Entries(u64),
    Stake(u64, Pubkey),
}

fn engine_key(key: EngineKey) -> Result<StorageKey, ProgramError> {
    StorageKey::encoded(Namespace::ENGINE, &key)
}

pub fn load_round(ctx: &InvokeContext) -> Result<Option<Round>, ProgramError> {
    ctx.get_raw(&engine_key(EngineKey::Round)?)?
        .map(|data| Round::unpack(&data))
        .transpose()
}

pub fn save_round(ctx: &mut InvokeContext, round: &Round) -> ProgramResult {
    let mut data = vec![0u8; Round::LEN];
    Round::pack(*round, &mut data)?;
    ctx.set_raw(engine_key(EngineKey::Round)?, data)
}

pub fn load_ledger(ctx: &InvokeContext) -> Result<Option<Pubkey>, ProgramError> {
    ctx.get(&engine_key(EngineKey::Ledger)?)
}

pub fn save_ledger(ctx: &mut InvokeContext, ledger: &Pubkey) -> ProgramResult {
    ctx.set(engine_key(EngineKey::Ledger)?, ledger)
}

pub fn load_entries(ctx: &InvokeContext, iteration: u64) -> Result<Vec<TicketRange>, ProgramError> {
    Ok(ctx
        .get(&engine_key(EngineKey::Entries(iteration))?)?
        .unwrap_or_default())
}

pub fn append_entries(ctx: &mut InvokeContext, iteration: u64, range: TicketRange) -> ProgramResult {
    let mut entries = load_entries(ctx, iteration)?;
    entries.push(range);
    ctx.set(engine_key(EngineKey::Entries(iteration))?, &entries)
}

pub fn load_stake(ctx: &InvokeContext, iteration: u64, buyer: &Pubkey) -> Result<u64, ProgramError> {
    Ok(ctx
        .get(&engine_key(EngineKey::Stake(iteration, *buyer))?)?
        .unwrap_or(0))
}

pub fn add_stake(ctx: &mut InvokeContext, iteration: u64, buyer: &Pubkey, count: u64) -> ProgramResult {
    let stake = load_stake(ctx, iteration, buyer)?
        .checked_add(count)
        .ok_or(LotteryError::ArithmeticOverflow)?;
    ctx.set(engine_key(EngineKey::Stake(iteration, *buyer))?, &stake)
}
