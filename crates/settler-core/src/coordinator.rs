//! Batch orchestration across executors.

use crate::executor::{record_nft_failure, CurrencySettlementExecutor, NftSettlementExecutor};
use crate::submission::error_update;
use crate::SettlementError;
use settler_ledger::LedgerService;
use settler_types::{AssetClass, CurrencyClass, CurrencyWithdrawalRequest, WithdrawalRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Counts from one pass over the ledger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
	/// Rows that ended up PENDING.
	pub submitted: usize,
	/// Rows that ended up ERROR.
	pub failed: usize,
	/// Rows another worker had already claimed.
	pub skipped: usize,
}

enum RowOutcome {
	Submitted,
	Failed,
	Skipped,
}

impl PollSummary {
	pub fn total(&self) -> usize {
		self.submitted + self.failed + self.skipped
	}

	fn record(&mut self, outcome: RowOutcome) {
		match outcome {
			RowOutcome::Submitted => self.submitted += 1,
			RowOutcome::Failed => self.failed += 1,
			RowOutcome::Skipped => self.skipped += 1,
		}
	}
}

/// Routes each unprocessed withdrawal to the executor for its class.
pub struct SettlementCoordinator {
	ledger: Arc<LedgerService>,
	nft: HashMap<AssetClass, NftSettlementExecutor>,
	currency: HashMap<CurrencyClass, CurrencySettlementExecutor>,
}

impl SettlementCoordinator {
	pub fn new(ledger: Arc<LedgerService>) -> Self {
		Self {
			ledger,
			nft: HashMap::new(),
			currency: HashMap::new(),
		}
	}

	pub fn with_nft_executor(mut self, executor: NftSettlementExecutor) -> Self {
		self.nft.insert(executor.asset_class(), executor);
		self
	}

	pub fn with_currency_executor(mut self, executor: CurrencySettlementExecutor) -> Self {
		self.currency.insert(executor.currency_class(), executor);
		self
	}

	/// Processes every unprocessed NFT row, then every unprocessed currency
	/// row, one at a time. A failing row never stops the batch; only a
	/// failure to load a batch is returned.
	pub async fn poll(&self) -> Result<PollSummary, SettlementError> {
		let mut summary = PollSummary::default();

		let withdrawals = self.ledger.unprocessed_withdrawals().await?;
		if !withdrawals.is_empty() {
			info!(count = withdrawals.len(), "Processing NFT withdrawals");
		}
		for request in &withdrawals {
			summary.record(self.process_nft(request).await);
		}

		let currency_withdrawals = self.ledger.unprocessed_currency_withdrawals().await?;
		if !currency_withdrawals.is_empty() {
			info!(count = currency_withdrawals.len(), "Processing currency withdrawals");
		}
		for request in &currency_withdrawals {
			summary.record(self.process_currency(request).await);
		}

		debug!(?summary, "Poll complete");
		Ok(summary)
	}

	async fn process_nft(&self, request: &WithdrawalRequest) -> RowOutcome {
		let withdrawal_id = request.id.as_str();
		match self.ledger.claim_withdrawal(withdrawal_id).await {
			Ok(true) => {}
			Ok(false) => {
				debug!(withdrawal_id, "Withdrawal already claimed");
				return RowOutcome::Skipped;
			}
			Err(e) => {
				warn!(withdrawal_id, error = %e, "Failed to claim withdrawal");
				return RowOutcome::Skipped;
			}
		}

		let Some(executor) = self.nft.get(&request.asset_class) else {
			let err = SettlementError::NotConfigured(request.asset_class.to_string());
			error!(withdrawal_id, error = %err, "Cannot settle withdrawal");
			record_nft_failure(
				&self.ledger,
				withdrawal_id,
				request.asset_class,
				request.token_id,
				&err,
				true,
			)
			.await;
			return RowOutcome::Failed;
		};

		let asset = match self.ledger.asset(request.asset_class, request.token_id).await {
			Ok(asset) => asset,
			Err(e) => {
				let err = SettlementError::from(e);
				error!(withdrawal_id, error = %err, "Failed to load asset");
				record_nft_failure(
					&self.ledger,
					withdrawal_id,
					request.asset_class,
					request.token_id,
					&err,
					false,
				)
				.await;
				return RowOutcome::Failed;
			}
		};

		match executor.withdraw(request, &asset).await {
			Ok(_) => RowOutcome::Submitted,
			Err(_) => RowOutcome::Failed,
		}
	}

	async fn process_currency(&self, request: &CurrencyWithdrawalRequest) -> RowOutcome {
		let withdrawal_id = request.id.as_str();
		match self.ledger.claim_currency_withdrawal(withdrawal_id).await {
			Ok(true) => {}
			Ok(false) => {
				debug!(withdrawal_id, "Currency withdrawal already claimed");
				return RowOutcome::Skipped;
			}
			Err(e) => {
				warn!(withdrawal_id, error = %e, "Failed to claim currency withdrawal");
				return RowOutcome::Skipped;
			}
		}

		let Some(executor) = self.currency.get(&request.currency_class) else {
			let err = SettlementError::NotConfigured(request.currency_class.to_string());
			error!(withdrawal_id, error = %err, "Cannot settle currency withdrawal");
			if let Err(e) = self
				.ledger
				.update_currency_withdrawal(withdrawal_id, &error_update(&err))
				.await
			{
				error!(withdrawal_id, error = %e, "Failed to record currency withdrawal error");
			}
			return RowOutcome::Failed;
		};

		match executor.withdraw(request).await {
			Ok(_) => RowOutcome::Submitted,
			Err(_) => RowOutcome::Failed,
		}
	}
}
