//! Settlement core: turns unprocessed ledger withdrawals into confirmed chain
//! transactions.
//!
//! The [`SettlementCoordinator`] routes each row to a per-class executor
//! ([`NftSettlementExecutor`] or [`CurrencySettlementExecutor`]), which submits
//! one call through the shared [`Submitter`] and writes the outcome back. The
//! [`PollingDriver`] repeats this on a fixed interval; [`SettlerBuilder`] wires
//! everything from configuration.

pub mod builder;
pub mod coordinator;
pub mod driver;
pub mod error;
pub mod executor;
pub mod submission;

#[cfg(test)]
mod testing;

pub use builder::{Settler, SettlerBuilder};
pub use coordinator::{PollSummary, SettlementCoordinator};
pub use driver::PollingDriver;
pub use error::{SettlementError, SubmittedTx};
pub use executor::{to_chain_units, CurrencySettlementExecutor, NftSettlementExecutor};
pub use submission::{Confirmed, Submitter};
