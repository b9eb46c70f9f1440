// Proxied Lottery - Engine Instructions
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::{Pubkey, PUBKEY_BYTES},
};
use std::convert::TryInto;
use std::mem::size_of;

#[derive(Clone, Debug, PartialEq)]
pub enum LotteryInstruction {
    /// Record the caller as owner of a standalone engine
    ///
    /// Accounts expected:
    /// 0. `[signer]` The future owner
    Initialize {},

    /// Open a new round
    ///
    /// Accounts expected:
    /// 0. `[signer]` The owner
    StartNewLottery {
        /// Round length in hours
        duration_hours: u64,
        /// Price per ticket in lamports
        ticket_price: u64,
    },

    /// Buy tickets in the open round; the attached value pays for them
    ///
    /// Accounts expected:
    /// 0. `[signer]` The buyer
    BuyTickets {
        /// Number of tickets, 1 to 255
        count: u64,
    },

    /// Draw the winner of an ended round and pay half the pool
    ///
    /// Accounts expected:
    /// 0. `[signer]` The owner
    SelectWinner {},

    /// Bind a different entry ledger
    ///
    /// Accounts expected:
    /// 0. `[signer]` The owner
    SetEntryLedger { ledger: Pubkey },

    /// Returns `bool`
    IsActive {},
    /// Returns `u64`
    PrizePool {},
    /// Returns `u64`
    TicketPrice {},
    /// Returns `Option<Pubkey>`
    EntryLedger {},
    /// Returns the packed `Round`, if any
    CurrentRound {},
    /// Returns `u64` entries held by `account` in the current round
    StakeOf { account: Pubkey },
    /// Returns `Option<Pubkey>`
    Owner {},
}

impl LotteryInstruction {
    /// Unpacks a byte buffer into a LotteryInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input.split_first().ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match tag {
            0 => Self::Initialize {},
            1 => {
                let (duration_hours, rest) = Self::unpack_u64(rest)?;
                let (ticket_price, _) = Self::unpack_u64(rest)?;
                Self::StartNewLottery {
                    duration_hours,
                    ticket_price,
                }
            }
            2 => {
                let (count, _) = Self::unpack_u64(rest)?;
                Self::BuyTickets { count }
            }
            3 => Self::SelectWinner {},
            4 => {
                let (ledger, _) = Self::unpack_pubkey(rest)?;
                Self::SetEntryLedger { ledger }
            }
            5 => Self::IsActive {},
            6 => Self::PrizePool {},
            7 => Self::TicketPrice {},
            8 => Self::EntryLedger {},
            9 => Self::CurrentRound {},
            10 => {
                let (account, _) = Self::unpack_pubkey(rest)?;
                Self::StakeOf { account }
            }
            11 => Self::Owner {},
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(u64::from_le_bytes)
            .ok_or(ProgramError::InvalidInstructionData)?;
        Ok((value, &input[8..]))
    }

    fn unpack_pubkey(input: &[u8]) -> Result<(Pubkey, &[u8]), ProgramError> {
        let key = input
            .get(..PUBKEY_BYTES)
            .and_then(|slice| <[u8; PUBKEY_BYTES]>::try_from(slice).ok())
            .map(Pubkey::new_from_array)
            .ok_or(ProgramError::InvalidInstructionData)?;
        Ok((key, &input[PUBKEY_BYTES..]))
    }

    /// Packs a LotteryInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match *self {
            Self::Initialize {} => buf.push(0),
            Self::StartNewLottery {
                duration_hours,
                ticket_price,
            } => {
                buf.push(1);
                buf.extend_from_slice(&duration_hours.to_le_bytes());
                buf.extend_from_slice(&ticket_price.to_le_bytes());
            }
            Self::BuyTickets { count } => {
                buf.push(2);
                buf.extend_from_slice(&count.to_le_bytes());
            }
            Self::SelectWinner {} => buf.push(3),
            Self::SetEntryLedger { ref ledger } => {
                buf.push(4);
                buf.extend_from_slice(ledger.as_ref());
            }
            Self::IsActive {} => buf.push(5),
            Self::PrizePool {} => buf.push(6),
            Self::TicketPrice {} => buf.push(7),
            Self::EntryLedger {} => buf.push(8),
            Self::CurrentRound {} => buf.push(9),
            Self::StakeOf { ref account } => {
                buf.push(10);
                buf.extend_from_slice(account.as_ref());
            }
            Self::Owner {} => buf.push(11),
        }
        buf
    }
}

fn lottery_instruction(lottery: &Pubkey, signer: &Pubkey, instruction: LotteryInstruction) -> Instruction {
    Instruction {
        program_id: *lottery,
        accounts: vec![AccountMeta::new(*signer, true)],
        data: instruction.pack(),
    }
}

/// Create initialize instruction
pub fn initialize(lottery: &Pubkey, owner: &Pubkey) -> Instruction {
    lottery_instruction(lottery, owner, LotteryInstruction::Initialize {})
}

/// Create start_new_lottery instruction
pub fn start_new_lottery(lottery: &Pubkey, owner: &Pubkey, duration_hours: u64, ticket_price: u64) -> Instruction {
    lottery_instruction(
        lottery,
        owner,
        LotteryInstruction::StartNewLottery {
            duration_hours,
            ticket_price,
        },
    )
}

/// Create buy_tickets instruction
pub fn buy_tickets(lottery: &Pubkey, buyer: &Pubkey, count: u64) -> Instruction {
    lottery_instruction(lottery, buyer, LotteryInstruction::BuyTickets { count })
}

/// Create select_winner instruction
pub fn select_winner(lottery: &Pubkey, owner: &Pubkey) -> Instruction {
    lottery_instruction(lottery, owner, LotteryInstruction::SelectWinner {})
}

/// Create set_entry_ledger instruction
pub fn set_entry_ledger(lottery: &Pubkey, owner: &Pubkey, ledger: &Pubkey) -> Instruction {
    lottery_instruction(lottery, owner, LotteryInstruction::SetEntryLedger { ledger: *ledger })
}

pub fn is_active(lottery: &Pubkey, reader: &Pubkey) -> Instruction {
    lottery_instruction(lottery, reader, LotteryInstruction::IsActive {})
}

pub fn prize_pool(lottery: &Pubkey, reader: &Pubkey) -> Instruction {
    lottery_instruction(lottery, reader, LotteryInstruction::PrizePool {})
}

pub fn ticket_price(lottery: &Pubkey, reader: &Pubkey) -> Instruction {
    lottery_instruction(lottery, reader, LotteryInstruction::TicketPrice {})
}

pub fn entry_ledger(lottery: &Pubkey, reader: &Pubkey) -> Instruction {
    lottery_instruction(lottery, reader, LotteryInstruction::EntryLedger {})
}

pub fn current_round(lottery: &Pubkey, reader: &Pubkey) -> Instruction {
    lottery_instruction(lottery, reader, LotteryInstruction::CurrentRound {})
}

pub fn stake_of(lottery: &Pubkey, reader: &Pubkey, account: &Pubkey) -> Instruction {
    lottery_instruction(lottery, reader, LotteryInstruction::StakeOf { account: *account })
}

pub fn owner(lottery: &Pubkey, reader: &Pubkey) -> Instruction {
    lottery_instruction(lottery, reader, LotteryInstruction::Owner {})
}
