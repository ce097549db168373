//! Shared types for the asset settlement system.
//!
//! This crate defines the ledger rows this system consumes and mutates
//! (withdrawal requests, asset and user records) as well as the chain-side
//! transaction types returned by submission and confirmation.

pub mod asset;
pub mod currency;
pub mod delivery;
pub mod withdrawal;

pub use asset::*;
pub use currency::*;
pub use delivery::*;
pub use withdrawal::*;
