//! Ledger module for the asset settlement system.
//!
//! This module provides the narrow interface through which settlement reads
//! withdrawal rows, asset records and users from the off-chain ledger and
//! writes outcomes back. The relational schema itself lives elsewhere;
//! backends only have to honour the conditional-claim semantics.

use async_trait::async_trait;
use settler_types::{
	AssetClass, AssetRecord, CurrencyWithdrawalRequest, UserRecord, WithdrawalRequest,
	WithdrawalState, WithdrawalUpdate,
};
use std::time::Duration;
use thiserror::Error;

pub mod snapshot;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

pub use snapshot::LedgerSnapshot;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
	/// A requested row does not exist.
	#[error("Not found: {0}")]
	NotFound(String),
	/// A write would move a row along a transition that is not allowed.
	#[error("Invalid transition for {id}: {from} -> {to}")]
	InvalidTransition {
		id: String,
		from: WithdrawalState,
		to: WithdrawalState,
	},
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the ledger backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Trait defining the low-level interface for ledger backends.
///
/// Claims must be conditional: a claim only succeeds for a row that is
/// still `Unprocessed`, so two workers can never both submit for it.
#[async_trait]
pub trait LedgerInterface: Send + Sync {
	/// Lists NFT withdrawal rows still waiting to be processed.
	async fn unprocessed_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, LedgerError>;

	/// Lists currency withdrawal rows still waiting to be processed.
	async fn unprocessed_currency_withdrawals(
		&self,
	) -> Result<Vec<CurrencyWithdrawalRequest>, LedgerError>;

	/// Loads the asset record behind an NFT withdrawal.
	async fn asset(&self, asset_class: AssetClass, token_id: u64) -> Result<AssetRecord, LedgerError>;

	/// Looks up a user by id.
	async fn user(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError>;

	/// Looks up the user registered under a wallet, ignoring address casing.
	async fn user_by_wallet(&self, wallet: &str) -> Result<Option<UserRecord>, LedgerError>;

	/// Moves an NFT row from `Unprocessed` to `InProgress`. Returns false if
	/// the row had already left `Unprocessed`.
	async fn claim_withdrawal(&self, id: &str) -> Result<bool, LedgerError>;

	/// Currency counterpart of [`LedgerInterface::claim_withdrawal`].
	async fn claim_currency_withdrawal(&self, id: &str) -> Result<bool, LedgerError>;

	/// Writes the outcome of a claimed NFT row.
	async fn update_withdrawal(&self, id: &str, update: &WithdrawalUpdate) -> Result<(), LedgerError>;

	/// Writes the outcome of a claimed currency row.
	async fn update_currency_withdrawal(
		&self,
		id: &str,
		update: &WithdrawalUpdate,
	) -> Result<(), LedgerError>;

	/// Resets the asset to in-custody and clears its placement.
	async fn release_asset(&self, asset_class: AssetClass, token_id: u64) -> Result<(), LedgerError>;
}

/// High-level ledger service used by the executors.
///
/// Wraps a backend and retries the compensation write, which runs after a
/// failed withdrawal and has no caller left to retry it.
pub struct LedgerService {
	/// The underlying ledger backend implementation.
	backend: Box<dyn LedgerInterface>,
	/// How long a transient compensation failure is retried.
	retry_window: Duration,
}

impl LedgerService {
	/// Creates a new LedgerService with the specified backend.
	pub fn new(backend: Box<dyn LedgerInterface>) -> Self {
		Self {
			backend,
			retry_window: Duration::from_secs(30),
		}
	}

	pub fn with_retry_window(mut self, retry_window: Duration) -> Self {
		self.retry_window = retry_window;
		self
	}

	pub async fn unprocessed_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, LedgerError> {
		self.backend.unprocessed_withdrawals().await
	}

	pub async fn unprocessed_currency_withdrawals(
		&self,
	) -> Result<Vec<CurrencyWithdrawalRequest>, LedgerError> {
		self.backend.unprocessed_currency_withdrawals().await
	}

	pub async fn asset(&self, asset_class: AssetClass, token_id: u64) -> Result<AssetRecord, LedgerError> {
		self.backend.asset(asset_class, token_id).await
	}

	pub async fn user(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError> {
		self.backend.user(user_id).await
	}

	pub async fn user_by_wallet(&self, wallet: &str) -> Result<Option<UserRecord>, LedgerError> {
		self.backend.user_by_wallet(wallet).await
	}

	pub async fn claim_withdrawal(&self, id: &str) -> Result<bool, LedgerError> {
		self.backend.claim_withdrawal(id).await
	}

	pub async fn claim_currency_withdrawal(&self, id: &str) -> Result<bool, LedgerError> {
		self.backend.claim_currency_withdrawal(id).await
	}

	pub async fn update_withdrawal(&self, id: &str, update: &WithdrawalUpdate) -> Result<(), LedgerError> {
		self.backend.update_withdrawal(id, update).await
	}

	pub async fn update_currency_withdrawal(
		&self,
		id: &str,
		update: &WithdrawalUpdate,
	) -> Result<(), LedgerError> {
		self.backend.update_currency_withdrawal(id, update).await
	}

	/// Puts an asset back in custody, retrying backend failures with
	/// exponential backoff for up to the retry window.
	pub async fn release_asset(&self, asset_class: AssetClass, token_id: u64) -> Result<(), LedgerError> {
		let policy = backoff::ExponentialBackoff {
			max_elapsed_time: Some(self.retry_window),
			..backoff::ExponentialBackoff::default()
		};

		let backend = &self.backend;
		backoff::future::retry(policy, move || async move {
			backend
				.release_asset(asset_class, token_id)
				.await
				.map_err(|e| match e {
					LedgerError::Backend(_) => {
						tracing::warn!(%asset_class, token_id, error = %e, "Retrying asset release");
						backoff::Error::transient(e)
					}
					other => backoff::Error::permanent(other),
				})
		})
		.await
	}
}

/// Factory function type for building a ledger backend from its config table.
pub type LedgerFactory = fn(&toml::Value) -> Result<Box<dyn LedgerInterface>, LedgerError>;

/// Returns the factory registered for a backend name.
pub fn ledger_factory(backend: &str) -> Option<LedgerFactory> {
	match backend {
		"memory" => Some(implementations::memory::create_ledger),
		"file" => Some(implementations::file::create_ledger),
		_ => None,
	}
}
