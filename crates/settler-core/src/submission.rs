//! Submit, confirm and record: the part every executor shares.

use crate::{SettlementError, SubmittedTx};
use settler_chain::{ChainError, FeeOptions, GasPriceProvider, PendingTransaction};
use settler_types::{TransactionReceipt, WithdrawalUpdate};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A transaction that was included and succeeded.
#[derive(Debug, Clone)]
pub struct Confirmed {
	pub tx: SubmittedTx,
	pub receipt: TransactionReceipt,
}

/// Fetches the fee, sends one call and waits for its receipt.
pub struct Submitter {
	gas: Arc<GasPriceProvider>,
	confirmations: u64,
	confirmation_timeout: Duration,
}

impl Submitter {
	pub fn new(gas: Arc<GasPriceProvider>, confirmations: u64, confirmation_timeout: Duration) -> Self {
		Self {
			gas,
			confirmations,
			confirmation_timeout,
		}
	}

	/// Runs `call` with the current adjusted gas price, then waits for the
	/// configured number of confirmations. A failed receipt is an error.
	pub async fn submit<F, Fut>(&self, signer: &str, call: F) -> Result<Confirmed, SettlementError>
	where
		F: FnOnce(FeeOptions) -> Fut,
		Fut: Future<Output = Result<Box<dyn PendingTransaction>, ChainError>>,
	{
		let gas_price = self.gas.gas_price().await?;
		let pending = call(FeeOptions { gas_price }).await?;

		let tx = SubmittedTx {
			hash: pending.hash().clone(),
			nonce: pending.nonce(),
			signer: signer.to_string(),
		};

		let receipt = match pending.wait(self.confirmations, self.confirmation_timeout).await {
			Ok(receipt) => receipt,
			Err(source) => return Err(SettlementError::Unconfirmed { tx, source }),
		};

		if !receipt.success {
			return Err(SettlementError::Reverted { tx });
		}

		info!(
			tx_hash = %tx.hash.truncated(),
			block = receipt.block_number,
			"Transaction confirmed"
		);
		Ok(Confirmed { tx, receipt })
	}
}

/// Row update for a confirmed submission.
pub fn pending_update(confirmed: &Confirmed) -> WithdrawalUpdate {
	WithdrawalUpdate::pending(
		confirmed.tx.hash.to_string(),
		confirmed.tx.nonce,
		confirmed.tx.signer.clone(),
		confirmed.receipt.raw.as_ref().map(|raw| raw.to_string()),
	)
}

/// Row update for a failure, keeping the transaction if one was sent.
pub fn error_update(err: &SettlementError) -> WithdrawalUpdate {
	let update = WithdrawalUpdate::failed(err.to_string());
	match err.submitted() {
		Some(tx) => update.with_transaction(tx.hash.to_string(), tx.nonce, tx.signer.clone()),
		None => update,
	}
}
