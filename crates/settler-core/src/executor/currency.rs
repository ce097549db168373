use crate::submission::{error_update, pending_update, Confirmed, Submitter};
use crate::SettlementError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use settler_chain::{CurrencyContract, U256};
use settler_ledger::LedgerService;
use settler_types::{CurrencyCallKind, CurrencyClass, CurrencyWithdrawalRequest};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument};

/// Largest power of ten a `Decimal` can hold.
const MAX_DECIMALS: u8 = 28;

/// Ledger-to-chain precision conversion for a currency.
struct Rescale {
	internal_scale: u64,
	decimals: OnceCell<u8>,
}

/// Settles withdrawals for one currency class.
pub struct CurrencySettlementExecutor {
	currency_class: CurrencyClass,
	contract: Arc<dyn CurrencyContract>,
	call: CurrencyCallKind,
	signer: String,
	rescale: Option<Rescale>,
	ledger: Arc<LedgerService>,
	submitter: Arc<Submitter>,
}

impl CurrencySettlementExecutor {
	pub fn new(
		currency_class: CurrencyClass,
		contract: Arc<dyn CurrencyContract>,
		call: CurrencyCallKind,
		signer: impl Into<String>,
		ledger: Arc<LedgerService>,
		submitter: Arc<Submitter>,
	) -> Self {
		Self {
			currency_class,
			contract,
			call,
			signer: signer.into(),
			rescale: None,
			ledger,
			submitter,
		}
	}

	/// Divides ledger amounts by `internal_scale` and scales them up to the
	/// token's on-chain `decimals()`, fetched on first use.
	pub fn with_internal_scale(mut self, internal_scale: u64) -> Self {
		self.rescale = Some(Rescale {
			internal_scale,
			decimals: OnceCell::new(),
		});
		self
	}

	pub fn currency_class(&self) -> CurrencyClass {
		self.currency_class
	}

	/// Settles a claimed row and writes the outcome back to the ledger.
	/// Failures are recorded on the row; nothing is compensated.
	#[instrument(skip_all, fields(withdrawal_id = %request.id, currency = %self.currency_class))]
	pub async fn withdraw(
		&self,
		request: &CurrencyWithdrawalRequest,
	) -> Result<Confirmed, SettlementError> {
		let outcome = self.settle(request).await;

		let update = match &outcome {
			Ok(confirmed) => pending_update(confirmed),
			Err(e) => {
				error!(error = %e, "Currency withdrawal failed");
				error_update(e)
			}
		};

		if let Err(e) = self.ledger.update_currency_withdrawal(&request.id, &update).await {
			error!(error = %e, "Failed to record currency withdrawal outcome");
			if outcome.is_ok() {
				return Err(e.into());
			}
		}

		if let Ok(confirmed) = &outcome {
			info!(tx_hash = %confirmed.tx.hash, nonce = confirmed.tx.nonce, "Currency withdrawal pending");
		}
		outcome
	}

	async fn settle(&self, request: &CurrencyWithdrawalRequest) -> Result<Confirmed, SettlementError> {
		let amount = self.chain_amount(request.amount).await?;
		let to = request.destination_address.as_str();
		debug!(%amount, "Submitting currency withdrawal");

		match self.call {
			CurrencyCallKind::Mint => {
				self.submitter
					.submit(&self.signer, |fee| self.contract.mint(to, amount, fee))
					.await
			}
			CurrencyCallKind::Transfer => {
				self.submitter
					.submit(&self.signer, |fee| self.contract.transfer(to, amount, fee))
					.await
			}
		}
	}

	async fn chain_amount(&self, amount: Decimal) -> Result<U256, SettlementError> {
		match &self.rescale {
			None => to_chain_units(amount, None),
			Some(rescale) => {
				let decimals = rescale
					.decimals
					.get_or_try_init(|| self.contract.decimals())
					.await?;
				to_chain_units(amount, Some((rescale.internal_scale, *decimals)))
			}
		}
	}
}

/// Converts a ledger amount to on-chain integer units.
///
/// With `rescale = Some((internal_scale, decimals))` the result is
/// `amount / internal_scale * 10^decimals`; otherwise the amount is taken as
/// integer units. Non-positive, fractional and overflowing results are
/// rejected.
pub fn to_chain_units(amount: Decimal, rescale: Option<(u64, u8)>) -> Result<U256, SettlementError> {
	if amount <= Decimal::ZERO {
		return Err(SettlementError::InvalidAmount(format!("{} is not positive", amount)));
	}

	let units = match rescale {
		None => amount,
		Some((0, _)) => {
			return Err(SettlementError::Config("internal scale must be non-zero".into()));
		}
		Some((_, decimals)) if decimals > MAX_DECIMALS => {
			return Err(SettlementError::InvalidAmount(format!(
				"{} token decimals cannot be represented",
				decimals
			)));
		}
		Some((internal_scale, decimals)) => {
			let overflow = || SettlementError::InvalidAmount(format!("{} overflows", amount));
			let mut factor = Decimal::ONE;
			for _ in 0..decimals {
				factor = factor.checked_mul(Decimal::TEN).ok_or_else(overflow)?;
			}
			// Multiply first so exact quotients stay exact.
			amount
				.checked_mul(factor)
				.and_then(|scaled| scaled.checked_div(Decimal::from(internal_scale)))
				.ok_or_else(overflow)?
		}
	};

	if !units.fract().is_zero() {
		return Err(SettlementError::InvalidAmount(format!(
			"{} leaves a fractional on-chain unit ({})",
			amount, units
		)));
	}

	units
		.trunc()
		.to_u128()
		.map(U256::from)
		.ok_or_else(|| SettlementError::InvalidAmount(format!("{} overflows", amount)))
}
