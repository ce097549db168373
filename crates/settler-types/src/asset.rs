//! Asset and user records read from the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of non-fungible game asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
	MobileUnit,
	Part,
	Venue,
}

impl AssetClass {
	pub const ALL: [AssetClass; 3] = [AssetClass::MobileUnit, AssetClass::Part, AssetClass::Venue];

	pub fn as_str(&self) -> &'static str {
		match self {
			AssetClass::MobileUnit => "mobile_unit",
			AssetClass::Part => "part",
			AssetClass::Venue => "venue",
		}
	}
}

impl fmt::Display for AssetClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Lifecycle state of an asset.
///
/// Owned by the game-side subsystem. Settlement only ever writes
/// `InCustody` back when a withdrawal fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
	/// Held for the player and usable in game.
	InCustody,
	/// Assigned to a venue or slot.
	Placed,
	/// Handed over to settlement for withdrawal.
	Withdrawing,
}

/// An NFT-backed asset as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
	pub asset_class: AssetClass,
	pub token_id: u64,
	/// Wallet the asset should end up in.
	pub destination_wallet_address: String,
	/// Current on-chain holder: `None` if never minted, the vault address
	/// if held in custody, anything else is outside our control.
	pub custody_location: Option<String>,
	/// Linked ledger user, if any.
	pub user_id: Option<String>,
	pub state: AssetState,
	/// Venue or slot assignment.
	pub placement: Option<String>,
}

/// A ledger user and their registered wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
	pub id: String,
	pub wallet_address: Option<String>,
}

/// Compares two hex addresses ignoring checksum casing.
pub fn same_address(a: &str, b: &str) -> bool {
	a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_same_address_ignores_case() {
		assert!(same_address(
			"0xAbCdEf0000000000000000000000000000000001",
			"0xabcdef0000000000000000000000000000000001"
		));
		assert!(!same_address("0xabc", "0xabd"));
	}

	#[test]
	fn test_asset_class_serde_names() {
		let json = serde_json::to_string(&AssetClass::MobileUnit).unwrap();
		assert_eq!(json, "\"mobile_unit\"");
		let parsed: AssetClass = serde_json::from_str("\"venue\"").unwrap();
		assert_eq!(parsed, AssetClass::Venue);
		assert_eq!(AssetClass::Part.to_string(), "part");
	}
}
