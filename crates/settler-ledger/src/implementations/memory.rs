//! In-memory ledger backend.
//!
//! Holds the ledger tables in process memory. Used for dry runs and as the
//! ledger double in tests.

use crate::{LedgerError, LedgerInterface, LedgerSnapshot};
use async_trait::async_trait;
use settler_types::{
	AssetClass, AssetRecord, CurrencyWithdrawalRequest, UserRecord, WithdrawalRequest,
	WithdrawalUpdate,
};
use tokio::sync::RwLock;

/// Ledger backend kept entirely in memory.
#[derive(Default)]
pub struct MemoryLedger {
	state: RwLock<LedgerSnapshot>,
}

impl MemoryLedger {
	pub fn new(snapshot: LedgerSnapshot) -> Self {
		Self {
			state: RwLock::new(snapshot),
		}
	}

	/// Returns a copy of the current tables.
	pub async fn snapshot(&self) -> LedgerSnapshot {
		self.state.read().await.clone()
	}

	/// Inserts a new NFT withdrawal row.
	pub async fn insert_withdrawal(&self, row: WithdrawalRequest) {
		self.state.write().await.withdrawals.push(row);
	}

	/// Inserts a new currency withdrawal row.
	pub async fn insert_currency_withdrawal(&self, row: CurrencyWithdrawalRequest) {
		self.state.write().await.currency_withdrawals.push(row);
	}
}

#[async_trait]
impl LedgerInterface for MemoryLedger {
	async fn unprocessed_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, LedgerError> {
		Ok(self.state.read().await.unprocessed_withdrawals())
	}

	async fn unprocessed_currency_withdrawals(
		&self,
	) -> Result<Vec<CurrencyWithdrawalRequest>, LedgerError> {
		Ok(self.state.read().await.unprocessed_currency_withdrawals())
	}

	async fn asset(&self, asset_class: AssetClass, token_id: u64) -> Result<AssetRecord, LedgerError> {
		self.state
			.read()
			.await
			.asset(asset_class, token_id)
			.cloned()
			.ok_or_else(|| LedgerError::NotFound(format!("{} {}", asset_class, token_id)))
	}

	async fn user(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError> {
		Ok(self.state.read().await.user(user_id).cloned())
	}

	async fn user_by_wallet(&self, wallet: &str) -> Result<Option<UserRecord>, LedgerError> {
		Ok(self.state.read().await.user_by_wallet(wallet).cloned())
	}

	async fn claim_withdrawal(&self, id: &str) -> Result<bool, LedgerError> {
		self.state.write().await.claim_withdrawal(id)
	}

	async fn claim_currency_withdrawal(&self, id: &str) -> Result<bool, LedgerError> {
		self.state.write().await.claim_currency_withdrawal(id)
	}

	async fn update_withdrawal(&self, id: &str, update: &WithdrawalUpdate) -> Result<(), LedgerError> {
		self.state.write().await.update_withdrawal(id, update)
	}

	async fn update_currency_withdrawal(
		&self,
		id: &str,
		update: &WithdrawalUpdate,
	) -> Result<(), LedgerError> {
		self.state.write().await.update_currency_withdrawal(id, update)
	}

	async fn release_asset(&self, asset_class: AssetClass, token_id: u64) -> Result<(), LedgerError> {
		self.state.write().await.release_asset(asset_class, token_id)
	}
}

/// Factory function to create an empty in-memory ledger.
pub fn create_ledger(_config: &toml::Value) -> Result<Box<dyn LedgerInterface>, LedgerError> {
	Ok(Box::new(MemoryLedger::default()))
}
