// Proxied Lottery - Events
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

/// Events appended to the runtime log, tagged with the emitting address
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    LotteryStarted {
        start_time: UnixTimestamp,
        end_time: UnixTimestamp,
        ticket_price: u64,
    },
    TicketsBought {
        buyer: Pubkey,
        count: u64,
    },
    /// `winner` is the zero address when the round sold no tickets
    WinnerSelected {
        winner: Pubkey,
        payout: u64,
        iteration: u64,
    },
    EntryLedgerChanged {
        ledger: Pubkey,
    },
    ProxyInitialized {
        implementation: Pubkey,
        owner: Pubkey,
    },
    Upgraded {
        implementation: Pubkey,
    },
    OwnershipTransferred {
        previous_owner: Pubkey,
        new_owner: Pubkey,
    },
    Deployed {
        address: Pubkey,
    },
    TicketsMinted {
        to: Pubkey,
        first_ticket_id: u64,
        count: u64,
    },
    TicketTransferred {
        from: Pubkey,
        to: Pubkey,
        ticket_id: u64,
    },
}
