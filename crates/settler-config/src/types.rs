//! Configuration types for the settler.

use serde::{Deserialize, Serialize};
use settler_types::{AssetClass, CurrencyCallKind, CurrencyClass};

/// Complete settler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Polling and confirmation settings
	pub settler: SettlerSettings,
	/// Ledger backend selection
	pub ledger: LedgerSettings,
	/// Chain connection
	pub chain: ChainSettings,
	/// Fee estimation
	#[serde(default)]
	pub gas: GasSettings,
	/// Signing keys by role
	pub signers: SignerSettings,
	/// NFT contracts by asset class
	#[serde(default)]
	pub assets: AssetContracts,
	/// Currency contracts by currency class
	#[serde(default)]
	pub currencies: CurrencyContracts,
}

/// One optional table per asset class
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AssetContracts {
	pub mobile_unit: Option<AssetSettings>,
	pub part: Option<AssetSettings>,
	pub venue: Option<AssetSettings>,
}

impl AssetContracts {
	pub fn get(&self, class: AssetClass) -> Option<&AssetSettings> {
		match class {
			AssetClass::MobileUnit => self.mobile_unit.as_ref(),
			AssetClass::Part => self.part.as_ref(),
			AssetClass::Venue => self.venue.as_ref(),
		}
	}

	/// Configured classes with their settings.
	pub fn iter(&self) -> impl Iterator<Item = (AssetClass, &AssetSettings)> {
		AssetClass::ALL
			.into_iter()
			.filter_map(move |class| self.get(class).map(|settings| (class, settings)))
	}

	pub fn is_empty(&self) -> bool {
		self.iter().next().is_none()
	}
}

/// One optional table per currency class
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CurrencyContracts {
	pub akir: Option<CurrencySettings>,
	pub akv: Option<CurrencySettings>,
	pub usdc: Option<CurrencySettings>,
}

impl CurrencyContracts {
	pub fn get(&self, class: CurrencyClass) -> Option<&CurrencySettings> {
		match class {
			CurrencyClass::Akir => self.akir.as_ref(),
			CurrencyClass::Akv => self.akv.as_ref(),
			CurrencyClass::Usdc => self.usdc.as_ref(),
		}
	}

	/// Configured classes with their settings.
	pub fn iter(&self) -> impl Iterator<Item = (CurrencyClass, &CurrencySettings)> {
		CurrencyClass::ALL
			.into_iter()
			.filter_map(move |class| self.get(class).map(|settings| (class, settings)))
	}

	pub fn is_empty(&self) -> bool {
		self.iter().next().is_none()
	}
}

/// Settler identity and scheduling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettlerSettings {
	/// Name used in log lines
	#[serde(default = "default_name")]
	pub name: String,
	/// Seconds between the end of one poll and the start of the next
	#[serde(default = "default_poll_interval_secs")]
	pub poll_interval_secs: u64,
	/// Blocks to wait for after submission
	#[serde(default = "default_confirmations")]
	pub confirmations: u64,
	/// Upper bound on a single confirmation wait
	#[serde(default = "default_confirmation_timeout_secs")]
	pub confirmation_timeout_secs: u64,
	/// Log filter used when neither RUST_LOG nor --log-level is set
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

/// Ledger backend and its backend-specific table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerSettings {
	/// Backend name ("memory" or "file")
	pub backend: String,
	/// Seconds a failed compensation write is retried
	#[serde(default = "default_ledger_retry_secs")]
	pub retry_window_secs: u64,
	/// Passed through to the backend factory
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

/// Chain connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainSettings {
	/// HTTP JSON-RPC endpoint
	pub rpc_url: String,
	/// Expected chain id
	pub chain_id: u64,
	/// Custodial vault contract; also the custody marker in asset records
	pub vault_address: String,
}

/// Gas price adjustment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GasSettings {
	/// Percentage applied to the node's estimate (120 = +20%)
	#[serde(default = "default_adjustment_percent")]
	pub adjustment_percent: u64,
	/// Seconds a failing estimate fetch is retried
	#[serde(default = "default_gas_retry_secs")]
	pub retry_window_secs: u64,
}

impl Default for GasSettings {
	fn default() -> Self {
		Self {
			adjustment_percent: default_adjustment_percent(),
			retry_window_secs: default_gas_retry_secs(),
		}
	}
}

/// Private keys per signing role
#[derive(Clone, Deserialize, Serialize)]
pub struct SignerSettings {
	/// Operator of the vault; signs transfer-from-vault
	pub vault: String,
	/// Minter; signs NFT mints and vault currency mints
	pub minter: String,
	/// Treasury; signs currency transfers
	pub treasury: String,
}

impl std::fmt::Debug for SignerSettings {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SignerSettings")
			.field("vault", &"<redacted>")
			.field("minter", &"<redacted>")
			.field("treasury", &"<redacted>")
			.finish()
	}
}

/// NFT contract for one asset class
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetSettings {
	/// Token contract
	pub contract: String,
	/// Prefix of the metadata URI passed to mint; the token id is appended
	pub metadata_base_uri: String,
}

/// Payout contract for one currency class
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CurrencySettings {
	/// Token (transfer) or currency vault (mint) contract
	pub contract: String,
	/// Overrides the class's default call kind
	#[serde(default)]
	pub call: Option<CurrencyCallKind>,
	/// Overrides the class's default internal scale
	#[serde(default)]
	pub internal_scale: Option<u64>,
}

impl CurrencySettings {
	pub fn call_kind(&self, class: CurrencyClass) -> CurrencyCallKind {
		self.call.unwrap_or_else(|| class.default_call())
	}

	pub fn effective_internal_scale(&self, class: CurrencyClass) -> Option<u64> {
		self.internal_scale.or_else(|| class.default_internal_scale())
	}
}

fn default_name() -> String {
	"asset-settler".to_string()
}

fn default_poll_interval_secs() -> u64 {
	10
}

fn default_confirmations() -> u64 {
	1
}

fn default_confirmation_timeout_secs() -> u64 {
	600
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_ledger_retry_secs() -> u64 {
	30
}

fn default_adjustment_percent() -> u64 {
	120
}

fn default_gas_retry_secs() -> u64 {
	10
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}
