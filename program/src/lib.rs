// Proxied Lottery
// A round-based lottery whose logic runs behind a delegating proxy, deployed at
// deterministic addresses, on an in-process host ledger.

// Host ledger
pub mod runtime;
pub mod storage;
pub mod event;
pub mod error;
pub mod utils;

// Shared owner gate
pub mod access;

// Lottery engine
pub mod state;
pub mod instruction;
pub mod processor;

// Entry tickets
pub mod ticket;

// Delegation and deployment
pub mod proxy;
pub mod factory;

pub use error::LotteryError;
pub use runtime::{InvokeContext, Program, Runtime, RuntimeConfig};
