//! JSON-file ledger backend.
//!
//! Keeps the ledger tables in a single JSON document and rewrites it after
//! every mutation. Suitable for local runs against a test chain; production
//! deployments plug in the relational ledger through [`LedgerInterface`].

use crate::{LedgerError, LedgerInterface, LedgerSnapshot};
use async_trait::async_trait;
use settler_types::{
	AssetClass, AssetRecord, CurrencyWithdrawalRequest, UserRecord, WithdrawalRequest,
	WithdrawalUpdate,
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// File-based ledger implementation.
pub struct FileLedger {
	/// Path of the JSON document.
	path: PathBuf,
	/// Tables as last written.
	state: Mutex<LedgerSnapshot>,
}

impl FileLedger {
	/// Opens the ledger at `path`, starting empty if the file does not exist.
	pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
		let path = path.as_ref().to_path_buf();
		let snapshot = match std::fs::read(&path) {
			Ok(bytes) => serde_json::from_slice(&bytes)
				.map_err(|e| LedgerError::Serialization(e.to_string()))?,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerSnapshot::default(),
			Err(e) => return Err(LedgerError::Backend(e.to_string())),
		};

		Ok(Self {
			path,
			state: Mutex::new(snapshot),
		})
	}

	/// Writes the tables atomically by writing a temp file and renaming it.
	async fn persist(&self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| LedgerError::Backend(e.to_string()))?;
		}

		let bytes = serde_json::to_vec_pretty(snapshot)
			.map_err(|e| LedgerError::Serialization(e.to_string()))?;

		let temp_path = self.path.with_extension("tmp");
		fs::write(&temp_path, bytes)
			.await
			.map_err(|e| LedgerError::Backend(e.to_string()))?;

		fs::rename(&temp_path, &self.path)
			.await
			.map_err(|e| LedgerError::Backend(e.to_string()))
	}

	/// Applies a mutation and persists the result. The in-memory copy is only
	/// replaced once the file write succeeded.
	async fn mutate<T>(
		&self,
		op: impl FnOnce(&mut LedgerSnapshot) -> Result<T, LedgerError>,
	) -> Result<T, LedgerError> {
		let mut state = self.state.lock().await;
		let mut next = state.clone();
		let out = op(&mut next)?;
		self.persist(&next).await?;
		*state = next;
		Ok(out)
	}
}

#[async_trait]
impl LedgerInterface for FileLedger {
	async fn unprocessed_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, LedgerError> {
		Ok(self.state.lock().await.unprocessed_withdrawals())
	}

	async fn unprocessed_currency_withdrawals(
		&self,
	) -> Result<Vec<CurrencyWithdrawalRequest>, LedgerError> {
		Ok(self.state.lock().await.unprocessed_currency_withdrawals())
	}

	async fn asset(&self, asset_class: AssetClass, token_id: u64) -> Result<AssetRecord, LedgerError> {
		self.state
			.lock()
			.await
			.asset(asset_class, token_id)
			.cloned()
			.ok_or_else(|| LedgerError::NotFound(format!("{} {}", asset_class, token_id)))
	}

	async fn user(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError> {
		Ok(self.state.lock().await.user(user_id).cloned())
	}

	async fn user_by_wallet(&self, wallet: &str) -> Result<Option<UserRecord>, LedgerError> {
		Ok(self.state.lock().await.user_by_wallet(wallet).cloned())
	}

	async fn claim_withdrawal(&self, id: &str) -> Result<bool, LedgerError> {
		self.mutate(|s| s.claim_withdrawal(id)).await
	}

	async fn claim_currency_withdrawal(&self, id: &str) -> Result<bool, LedgerError> {
		self.mutate(|s| s.claim_currency_withdrawal(id)).await
	}

	async fn update_withdrawal(&self, id: &str, update: &WithdrawalUpdate) -> Result<(), LedgerError> {
		self.mutate(|s| s.update_withdrawal(id, update)).await
	}

	async fn update_currency_withdrawal(
		&self,
		id: &str,
		update: &WithdrawalUpdate,
	) -> Result<(), LedgerError> {
		self.mutate(|s| s.update_currency_withdrawal(id, update)).await
	}

	async fn release_asset(&self, asset_class: AssetClass, token_id: u64) -> Result<(), LedgerError> {
		self.mutate(|s| s.release_asset(asset_class, token_id)).await
	}
}

/// Factory function to create a file ledger from configuration.
///
/// Configuration parameters:
/// - `path`: JSON document holding the tables (default: "./data/ledger.json")
pub fn create_ledger(config: &toml::Value) -> Result<Box<dyn LedgerInterface>, LedgerError> {
	let path = config
		.get("path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/ledger.json");

	Ok(Box::new(FileLedger::open(path)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal::Decimal;
	use settler_types::{CurrencyClass, WithdrawalState};

	#[tokio::test]
	async fn test_mutations_survive_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("ledger.json");

		let seed = LedgerSnapshot::default()
			.with_withdrawal(WithdrawalRequest::new("w1", AssetClass::MobileUnit, 11))
			.with_currency_withdrawal(CurrencyWithdrawalRequest::new(
				"c1",
				CurrencyClass::Usdc,
				Decimal::from(100),
				"0xabc",
			));
		std::fs::write(&path, serde_json::to_vec(&seed).unwrap()).unwrap();

		let ledger = FileLedger::open(&path).unwrap();
		assert_eq!(ledger.unprocessed_withdrawals().await.unwrap().len(), 1);
		assert!(ledger.claim_withdrawal("w1").await.unwrap());
		ledger
			.update_withdrawal("w1", &WithdrawalUpdate::pending("0x01", 3, "0xvault", None))
			.await
			.unwrap();

		let reopened = FileLedger::open(&path).unwrap();
		assert!(reopened.unprocessed_withdrawals().await.unwrap().is_empty());
		assert_eq!(reopened.unprocessed_currency_withdrawals().await.unwrap().len(), 1);

		let state = reopened.state.lock().await;
		let row = state.withdrawal("w1").unwrap();
		assert_eq!(row.state, WithdrawalState::Pending);
		assert_eq!(row.nonce, Some(3));
	}

	#[tokio::test]
	async fn test_missing_file_starts_empty() {
		let dir = tempfile::tempdir().unwrap();
		let ledger = FileLedger::open(dir.path().join("absent.json")).unwrap();
		assert!(ledger.unprocessed_withdrawals().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_failed_mutation_leaves_file_untouched() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("ledger.json");
		let ledger = FileLedger::open(&path).unwrap();

		assert!(ledger.claim_withdrawal("nope").await.is_err());
		assert!(!path.exists());
	}
}
