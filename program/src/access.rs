// Proxied Lottery - Access Control
//
// Single-owner authorization shared by the proxy and the engine.
//
// The owner record lives in Namespace::ACCESS of the executing account, so a
// proxy and the implementation it delegates to consult the same owner.
use solana_program::{entrypoint::ProgramResult, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LotteryError,
    event::Event,
    runtime::InvokeContext,
    storage::{Namespace, StorageKey},
};

fn owner_key() -> StorageKey {
    StorageKey::new(Namespace::ACCESS, b"owner".to_vec())
}

pub fn owner(ctx: &InvokeContext) -> Result<Option<Pubkey>, ProgramError> {
    ctx.get(&owner_key())
}

/// Record the first owner; fails once one exists
pub fn set_owner(ctx: &mut InvokeContext, owner: &Pubkey) -> ProgramResult {
    if self::owner(ctx)?.is_some() {
        msg!("Owner is already set");
        return Err(LotteryError::AlreadyInitialized.into());
    }
    ctx.set(owner_key(), owner)
}

pub fn is_owner(ctx: &InvokeContext, who: &Pubkey) -> Result<bool, ProgramError> {
    Ok(owner(ctx)?.map_or(false, |owner| owner == *who))
}

/// Gate for owner-only operations
pub fn require_owner(ctx: &InvokeContext) -> ProgramResult {
    if !is_owner(ctx, ctx.caller())? {
        msg!("Caller {} is not the owner", ctx.caller());
        return Err(LotteryError::NotOwner.into());
    }
    Ok(())
}

pub fn transfer_owner(ctx: &mut InvokeContext, new_owner: &Pubkey) -> ProgramResult {
    require_owner(ctx)?;
    if *new_owner == Pubkey::default() {
        msg!("New owner cannot be the zero address");
        return Err(ProgramError::InvalidArgument);
    }
    let previous_owner = *ctx.caller();
    ctx.set(owner_key(), new_owner)?;
    ctx.emit(Event::OwnershipTransferred {
        previous_owner,
        new_owner: *new_owner,
    });
    Ok(())
}
