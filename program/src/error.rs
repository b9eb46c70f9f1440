// Proxied Lottery - Errors
use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Errors that may be returned by the lottery, proxy, factory and ticket programs
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum LotteryError {
    /// Caller is not the instance owner
    #[error("Caller is not the owner")]
    NotOwner,

    /// No round is open for entries
    #[error("Lottery is not active")]
    LotteryNotActive,

    /// A round is already open
    #[error("There is an active lottery")]
    LotteryAlreadyActive,

    /// The last finished round has not been claimed yet
    #[error("Current lottery is still not claimed")]
    LotteryNotClaimed,

    /// The round has already paid out
    #[error("Lottery has already been claimed")]
    AlreadyClaimed,

    /// The round end time has not been reached
    #[error("Lottery is still active")]
    LotteryStillActive,

    /// Ledger does not advertise the entry ledger interface
    #[error("Ledger does not support the entry ledger interface")]
    UnsupportedLedger,

    /// Proxy has no implementation to delegate to
    #[error("Implementation is not set")]
    ImplementationNotSet,

    /// Cannot buy 0 tickets
    #[error("Cannot buy 0 tickets")]
    ZeroTickets,

    /// Attached value does not cover the tickets
    #[error("Not enough funds")]
    InsufficientFunds,

    /// Ticket count above the per-purchase bound
    #[error("Ticket count out of bounds")]
    TicketCountOutOfBounds,

    /// No entry ledger has been bound
    #[error("Entry ledger is not set")]
    LedgerNotSet,

    #[error("Cannot change ledger while there is active lottery")]
    LedgerLocked,

    /// Implementation has no code or uses a reserved storage namespace
    #[error("Invalid implementation")]
    InvalidImplementation,

    #[error("Already initialized")]
    AlreadyInitialized,

    /// Deterministic address is already occupied
    #[error("Address already in use")]
    AddressInUse,

    #[error("Caller is not the ticket minter")]
    NotMinter,

    #[error("Caller does not hold the ticket")]
    NotTicketOwner,

    #[error("Ticket does not exist")]
    TicketNotFound,

    /// Code touched a storage namespace it does not own
    #[error("Storage namespace violation")]
    StorageNamespaceViolation,

    #[error("Call depth exceeded")]
    CallDepthExceeded,

    /// Called address holds no code
    #[error("Account has no code")]
    AccountHasNoCode,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl From<LotteryError> for ProgramError {
    fn from(e: LotteryError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl TryFrom<u32> for LotteryError {
    type Error = &'static str;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        use LotteryError::*;
        Ok(match code {
            0 => NotOwner,
            1 => LotteryNotActive,
            2 => LotteryAlreadyActive,
            3 => LotteryNotClaimed,
            4 => AlreadyClaimed,
            5 => LotteryStillActive,
            6 => UnsupportedLedger,
            7 => ImplementationNotSet,
            8 => ZeroTickets,
            9 => InsufficientFunds,
            10 => TicketCountOutOfBounds,
            11 => LedgerNotSet,
            12 => LedgerLocked,
            13 => InvalidImplementation,
            14 => AlreadyInitialized,
            15 => AddressInUse,
            16 => NotMinter,
            17 => NotTicketOwner,
            18 => TicketNotFound,
            19 => StorageNamespaceViolation,
            20 => CallDepthExceeded,
            21 => AccountHasNoCode,
            22 => ArithmeticOverflow,
            _ => return Err("Unknown lottery error code"),
        })
    }
}

impl LotteryError {
    /// Recovers the named failure carried by a `ProgramError::Custom`.
    pub fn from_program_error(err: &ProgramError) -> Option<Self> {
        match err {
            ProgramError::Custom(code) => Self::try_from(*code).ok(),
            _ => None,
        }
    }
}

impl<T> DecodeError<T> for LotteryError {
    fn type_of() -> &'static str {
        "Lottery Error"
    }
}

impl PrintProgramError for LotteryError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
