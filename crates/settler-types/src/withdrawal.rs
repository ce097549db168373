//! Withdrawal rows and the outcome written back for them.

use crate::{AssetClass, CurrencyClass};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing state of a withdrawal row.
///
/// Rows are created `Unprocessed`, claimed as `InProgress` before any chain
/// call and end up `Pending` (submitted and confirmed once) or `Error`.
/// No transition leads back to `Unprocessed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalState {
	Unprocessed,
	InProgress,
	Pending,
	Error,
}

impl fmt::Display for WithdrawalState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			WithdrawalState::Unprocessed => "UNPROCESSED",
			WithdrawalState::InProgress => "IN_PROGRESS",
			WithdrawalState::Pending => "PENDING",
			WithdrawalState::Error => "ERROR",
		};
		f.write_str(s)
	}
}

/// Request to move an NFT out of custody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
	pub id: String,
	pub asset_class: AssetClass,
	pub token_id: u64,
	pub state: WithdrawalState,
	#[serde(default)]
	pub error_message: Option<String>,
	#[serde(default)]
	pub tx_hash: Option<String>,
	#[serde(default)]
	pub nonce: Option<u64>,
	#[serde(default)]
	pub signer_address: Option<String>,
	#[serde(default)]
	pub raw_response: Option<String>,
	#[serde(default)]
	pub updated_at: Option<DateTime<Utc>>,
}

impl WithdrawalRequest {
	pub fn new(id: impl Into<String>, asset_class: AssetClass, token_id: u64) -> Self {
		Self {
			id: id.into(),
			asset_class,
			token_id,
			state: WithdrawalState::Unprocessed,
			error_message: None,
			tx_hash: None,
			nonce: None,
			signer_address: None,
			raw_response: None,
			updated_at: None,
		}
	}
}

/// Request to pay out a fungible balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyWithdrawalRequest {
	pub id: String,
	pub currency_class: CurrencyClass,
	/// Ledger amount, in the ledger's internal scale for rescaled classes.
	pub amount: Decimal,
	pub destination_address: String,
	pub state: WithdrawalState,
	#[serde(default)]
	pub error_message: Option<String>,
	#[serde(default)]
	pub tx_hash: Option<String>,
	#[serde(default)]
	pub nonce: Option<u64>,
	#[serde(default)]
	pub signer_address: Option<String>,
	#[serde(default)]
	pub raw_response: Option<String>,
	#[serde(default)]
	pub updated_at: Option<DateTime<Utc>>,
}

impl CurrencyWithdrawalRequest {
	pub fn new(
		id: impl Into<String>,
		currency_class: CurrencyClass,
		amount: Decimal,
		destination_address: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			currency_class,
			amount,
			destination_address: destination_address.into(),
			state: WithdrawalState::Unprocessed,
			error_message: None,
			tx_hash: None,
			nonce: None,
			signer_address: None,
			raw_response: None,
			updated_at: None,
		}
	}
}

/// Fields written back to a withdrawal row once it leaves `InProgress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalUpdate {
	pub state: WithdrawalState,
	pub error_message: Option<String>,
	pub tx_hash: Option<String>,
	pub nonce: Option<u64>,
	pub signer_address: Option<String>,
	pub raw_response: Option<String>,
}

impl WithdrawalUpdate {
	/// Submitted and confirmed.
	pub fn pending(
		tx_hash: impl Into<String>,
		nonce: u64,
		signer_address: impl Into<String>,
		raw_response: Option<String>,
	) -> Self {
		Self {
			state: WithdrawalState::Pending,
			error_message: None,
			tx_hash: Some(tx_hash.into()),
			nonce: Some(nonce),
			signer_address: Some(signer_address.into()),
			raw_response,
		}
	}

	/// Failed with a human-readable reason.
	pub fn failed(message: impl Into<String>) -> Self {
		Self {
			state: WithdrawalState::Error,
			error_message: Some(message.into()),
			tx_hash: None,
			nonce: None,
			signer_address: None,
			raw_response: None,
		}
	}

	/// Attaches the submitted transaction to a failed update.
	pub fn with_transaction(
		mut self,
		tx_hash: impl Into<String>,
		nonce: u64,
		signer_address: impl Into<String>,
	) -> Self {
		self.tx_hash = Some(tx_hash.into());
		self.nonce = Some(nonce);
		self.signer_address = Some(signer_address.into());
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_state_serializes_like_ledger_enum() {
		let json = serde_json::to_string(&WithdrawalState::InProgress).unwrap();
		assert_eq!(json, "\"IN_PROGRESS\"");
		assert_eq!(WithdrawalState::Pending.to_string(), "PENDING");
	}

	#[test]
	fn test_failed_update_with_transaction() {
		let update = WithdrawalUpdate::failed("receipt status failed").with_transaction("0x01", 7, "0xsigner");
		assert_eq!(update.state, WithdrawalState::Error);
		assert_eq!(update.tx_hash.as_deref(), Some("0x01"));
		assert_eq!(update.nonce, Some(7));
		assert_eq!(update.error_message.as_deref(), Some("receipt status failed"));
	}

	#[test]
	fn test_new_rows_start_unprocessed() {
		let row = WithdrawalRequest::new("w1", AssetClass::Part, 3);
		assert_eq!(row.state, WithdrawalState::Unprocessed);
		let row = CurrencyWithdrawalRequest::new("c1", CurrencyClass::Usdc, Decimal::from(100), "0xabc");
		assert_eq!(row.state, WithdrawalState::Unprocessed);
		assert!(row.tx_hash.is_none());
	}
}
