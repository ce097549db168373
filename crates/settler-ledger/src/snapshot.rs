//! In-process image of the ledger tables this system touches.
//!
//! Both bundled backends keep a [`LedgerSnapshot`] and differ only in
//! whether they persist it after a mutation.

use crate::LedgerError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use settler_types::{
	same_address, AssetClass, AssetRecord, AssetState, CurrencyWithdrawalRequest, UserRecord,
	WithdrawalRequest, WithdrawalState, WithdrawalUpdate,
};

/// Rows of the withdrawal, asset and user tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
	#[serde(default)]
	pub withdrawals: Vec<WithdrawalRequest>,
	#[serde(default)]
	pub currency_withdrawals: Vec<CurrencyWithdrawalRequest>,
	#[serde(default)]
	pub assets: Vec<AssetRecord>,
	#[serde(default)]
	pub users: Vec<UserRecord>,
}

/// Common access to the two withdrawal tables.
trait LedgerRow {
	fn id(&self) -> &str;
	fn state(&self) -> WithdrawalState;
	fn set_state(&mut self, state: WithdrawalState);
	fn apply(&mut self, update: &WithdrawalUpdate);
}

macro_rules! impl_ledger_row {
	($row:ty) => {
		impl LedgerRow for $row {
			fn id(&self) -> &str {
				&self.id
			}

			fn state(&self) -> WithdrawalState {
				self.state
			}

			fn set_state(&mut self, state: WithdrawalState) {
				self.state = state;
				self.updated_at = Some(Utc::now());
			}

			fn apply(&mut self, update: &WithdrawalUpdate) {
				self.error_message = update.error_message.clone();
				self.tx_hash = update.tx_hash.clone();
				self.nonce = update.nonce;
				self.signer_address = update.signer_address.clone();
				self.raw_response = update.raw_response.clone();
				self.set_state(update.state);
			}
		}
	};
}

impl_ledger_row!(WithdrawalRequest);
impl_ledger_row!(CurrencyWithdrawalRequest);

fn claim_row<R: LedgerRow>(rows: &mut [R], id: &str) -> Result<bool, LedgerError> {
	let row = rows
		.iter_mut()
		.find(|r| r.id() == id)
		.ok_or_else(|| LedgerError::NotFound(format!("withdrawal {}", id)))?;

	if row.state() != WithdrawalState::Unprocessed {
		return Ok(false);
	}
	row.set_state(WithdrawalState::InProgress);
	Ok(true)
}

fn update_row<R: LedgerRow>(
	rows: &mut [R],
	id: &str,
	update: &WithdrawalUpdate,
) -> Result<(), LedgerError> {
	let row = rows
		.iter_mut()
		.find(|r| r.id() == id)
		.ok_or_else(|| LedgerError::NotFound(format!("withdrawal {}", id)))?;

	if row.state() != WithdrawalState::InProgress {
		return Err(LedgerError::InvalidTransition {
			id: id.to_string(),
			from: row.state(),
			to: update.state,
		});
	}
	row.apply(update);
	Ok(())
}

impl LedgerSnapshot {
	pub fn with_withdrawal(mut self, row: WithdrawalRequest) -> Self {
		self.withdrawals.push(row);
		self
	}

	pub fn with_currency_withdrawal(mut self, row: CurrencyWithdrawalRequest) -> Self {
		self.currency_withdrawals.push(row);
		self
	}

	pub fn with_asset(mut self, asset: AssetRecord) -> Self {
		self.assets.push(asset);
		self
	}

	pub fn with_user(mut self, user: UserRecord) -> Self {
		self.users.push(user);
		self
	}

	pub fn unprocessed_withdrawals(&self) -> Vec<WithdrawalRequest> {
		self.withdrawals
			.iter()
			.filter(|r| r.state == WithdrawalState::Unprocessed)
			.cloned()
			.collect()
	}

	pub fn unprocessed_currency_withdrawals(&self) -> Vec<CurrencyWithdrawalRequest> {
		self.currency_withdrawals
			.iter()
			.filter(|r| r.state == WithdrawalState::Unprocessed)
			.cloned()
			.collect()
	}

	pub fn withdrawal(&self, id: &str) -> Option<&WithdrawalRequest> {
		self.withdrawals.iter().find(|r| r.id == id)
	}

	pub fn currency_withdrawal(&self, id: &str) -> Option<&CurrencyWithdrawalRequest> {
		self.currency_withdrawals.iter().find(|r| r.id == id)
	}

	pub fn asset(&self, asset_class: AssetClass, token_id: u64) -> Option<&AssetRecord> {
		self.assets
			.iter()
			.find(|a| a.asset_class == asset_class && a.token_id == token_id)
	}

	pub fn user(&self, user_id: &str) -> Option<&UserRecord> {
		self.users.iter().find(|u| u.id == user_id)
	}

	pub fn user_by_wallet(&self, wallet: &str) -> Option<&UserRecord> {
		self.users.iter().find(|u| {
			u.wallet_address
				.as_deref()
				.is_some_and(|w| same_address(w, wallet))
		})
	}

	pub fn claim_withdrawal(&mut self, id: &str) -> Result<bool, LedgerError> {
		claim_row(&mut self.withdrawals, id)
	}

	pub fn claim_currency_withdrawal(&mut self, id: &str) -> Result<bool, LedgerError> {
		claim_row(&mut self.currency_withdrawals, id)
	}

	pub fn update_withdrawal(
		&mut self,
		id: &str,
		update: &WithdrawalUpdate,
	) -> Result<(), LedgerError> {
		update_row(&mut self.withdrawals, id, update)
	}

	pub fn update_currency_withdrawal(
		&mut self,
		id: &str,
		update: &WithdrawalUpdate,
	) -> Result<(), LedgerError> {
		update_row(&mut self.currency_withdrawals, id, update)
	}

	/// Puts the asset back in custody and drops its placement.
	pub fn release_asset(&mut self, asset_class: AssetClass, token_id: u64) -> Result<(), LedgerError> {
		let asset = self
			.assets
			.iter_mut()
			.find(|a| a.asset_class == asset_class && a.token_id == token_id)
			.ok_or_else(|| LedgerError::NotFound(format!("{} {}", asset_class, token_id)))?;

		asset.state = AssetState::InCustody;
		asset.placement = None;
		Ok(())
	}
}
