//! Fungible currency classes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of fungible currency that can be withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyClass {
	/// In-game currency minted through the vault on withdrawal.
	Akir,
	/// In-game token transferred from the treasury.
	Akv,
	/// Externally issued stablecoin transferred from the treasury.
	Usdc,
}

impl CurrencyClass {
	pub const ALL: [CurrencyClass; 3] = [CurrencyClass::Akir, CurrencyClass::Akv, CurrencyClass::Usdc];
}

impl fmt::Display for CurrencyClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CurrencyClass::Akir => f.write_str("AKIR"),
			CurrencyClass::Akv => f.write_str("AKV"),
			CurrencyClass::Usdc => f.write_str("USDC"),
		}
	}
}

/// Contract call used to pay out a currency class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCallKind {
	/// Vault mints fresh units to the recipient.
	Mint,
	/// Treasury transfers existing units to the recipient.
	Transfer,
}

impl CurrencyClass {
	/// Call kind used when the configuration does not name one.
	pub fn default_call(&self) -> CurrencyCallKind {
		match self {
			CurrencyClass::Akir => CurrencyCallKind::Mint,
			CurrencyClass::Akv | CurrencyClass::Usdc => CurrencyCallKind::Transfer,
		}
	}

	/// Internal ledger scale for classes whose ledger amount is normalized
	/// rather than stored in on-chain units.
	pub fn default_internal_scale(&self) -> Option<u64> {
		match self {
			CurrencyClass::Usdc => Some(100),
			CurrencyClass::Akir | CurrencyClass::Akv => None,
		}
	}
}
