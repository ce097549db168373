// settler-config/src/lib.rs

use regex::Regex;
use std::env;
use std::path::Path;
use thiserror::Error;

mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "SETTLER_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		// Load base configuration from file
		let mut config = if let Some(file_path) = &self.file_path {
			self.load_from_file(file_path).await?
		} else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		// Apply environment variable overrides
		self.apply_env_overrides(&mut config)?;

		validate_config(&config)?;

		Ok(config)
	}

	/// Parses and validates configuration text, substituting `${VAR}` first.
	pub fn from_toml(content: &str) -> Result<Config, ConfigError> {
		let substituted = substitute_env_vars(content)?;
		let config: Config =
			toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))?;
		validate_config(&config)?;
		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<Config, ConfigError> {
		let content = match tokio::fs::read_to_string(file_path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(ConfigError::FileNotFound(file_path.to_string()))
			}
			Err(e) => return Err(e.into()),
		};

		let substituted_content = substitute_env_vars(&content)?;
		tracing::debug!(path = %file_path, "Read configuration file");

		toml::from_str(&substituted_content).map_err(|e| ConfigError::ParseError(e.to_string()))
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			config.settler.log_level = log_level;
		}

		if let Ok(interval) = env::var(format!("{}POLL_INTERVAL_SECS", self.env_prefix)) {
			config.settler.poll_interval_secs = interval.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid poll interval: {}", e))
			})?;
		}

		Ok(())
	}
}

/// Replaces `${VAR_NAME}` patterns with the variable's value.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let mut result = content.to_string();

	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
	let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

	if config.settler.poll_interval_secs == 0 {
		return invalid("poll_interval_secs must be greater than zero".into());
	}
	if config.settler.confirmations == 0 {
		return invalid("confirmations must be at least 1".into());
	}
	if config.settler.confirmation_timeout_secs == 0 {
		return invalid("confirmation_timeout_secs must be greater than zero".into());
	}
	if config.gas.adjustment_percent == 0 {
		return invalid("gas adjustment_percent must be greater than zero".into());
	}

	let rpc = &config.chain.rpc_url;
	if !(rpc.starts_with("http://") || rpc.starts_with("https://")) {
		return invalid("RPC URL must start with http:// or https://".into());
	}
	validate_address("chain.vault_address", &config.chain.vault_address)?;

	validate_private_key("signers.vault", &config.signers.vault)?;
	validate_private_key("signers.minter", &config.signers.minter)?;
	validate_private_key("signers.treasury", &config.signers.treasury)?;

	if config.assets.is_empty() && config.currencies.is_empty() {
		return invalid("At least one asset or currency class must be configured".into());
	}

	for (class, asset) in config.assets.iter() {
		validate_address(&format!("assets.{}.contract", class), &asset.contract)?;
	}

	for (class, currency) in config.currencies.iter() {
		validate_address(&format!("currencies.{}.contract", class), &currency.contract)?;
		if currency.effective_internal_scale(class) == Some(0) {
			return invalid(format!("currencies.{}.internal_scale must be positive", class));
		}
	}

	Ok(())
}

fn validate_address(field: &str, value: &str) -> Result<(), ConfigError> {
	let hex_part = value.strip_prefix("0x").unwrap_or(value);
	if hex_part.len() != 40 || hex::decode(hex_part).is_err() {
		return Err(ConfigError::ValidationError(format!(
			"{} must be a 20-byte hex address",
			field
		)));
	}
	Ok(())
}

fn validate_private_key(field: &str, value: &str) -> Result<(), ConfigError> {
	let key = value.strip_prefix("0x").unwrap_or(value);

	if key.len() != 64 {
		return Err(ConfigError::ValidationError(format!(
			"{} must be 64 hex characters (32 bytes)",
			field
		)));
	}

	if hex::decode(key).is_err() {
		return Err(ConfigError::ValidationError(format!(
			"{} must be valid hexadecimal",
			field
		)));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use settler_types::{AssetClass, CurrencyCallKind, CurrencyClass};

	const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

	fn sample(extra: &str) -> String {
		format!(
			r#"
[settler]
name = "test-settler"

[ledger]
backend = "memory"

[chain]
rpc_url = "http://localhost:8545"
chain_id = 31337
vault_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

[signers]
vault = "{KEY}"
minter = "{KEY}"
treasury = "{KEY}"

[assets.mobile_unit]
contract = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
metadata_base_uri = "https://assets.example.com/mobile-unit/"

[currencies.usdc]
contract = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
{extra}
"#
		)
	}

	#[test]
	fn test_toml_parsing_with_defaults() {
		let config = ConfigLoader::from_toml(&sample("")).unwrap();
		assert_eq!(config.settler.name, "test-settler");
		assert_eq!(config.settler.poll_interval_secs, 10);
		assert_eq!(config.settler.confirmations, 1);
		assert_eq!(config.gas.adjustment_percent, 120);
		assert!(config.assets.get(AssetClass::MobileUnit).is_some());
		assert!(config.assets.get(AssetClass::Venue).is_none());
		assert_eq!(config.currencies.iter().count(), 1);

		let usdc = config.currencies.get(CurrencyClass::Usdc).unwrap();
		assert_eq!(usdc.call_kind(CurrencyClass::Usdc), CurrencyCallKind::Transfer);
		assert_eq!(usdc.effective_internal_scale(CurrencyClass::Usdc), Some(100));
	}

	#[test]
	fn test_currency_overrides() {
		let config = ConfigLoader::from_toml(&sample(
			"call = \"mint\"\ninternal_scale = 10000",
		))
		.unwrap();
		let usdc = config.currencies.get(CurrencyClass::Usdc).unwrap();
		assert_eq!(usdc.call_kind(CurrencyClass::Usdc), CurrencyCallKind::Mint);
		assert_eq!(usdc.effective_internal_scale(CurrencyClass::Usdc), Some(10000));
	}

	#[test]
	fn test_zero_internal_scale_rejected() {
		let result = ConfigLoader::from_toml(&sample("internal_scale = 0"));
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[test]
	fn test_env_substitution() {
		env::set_var("SETTLER_TEST_RPC_URL", "https://rpc.example.com");
		let content = sample("").replace("http://localhost:8545", "${SETTLER_TEST_RPC_URL}");
		let config = ConfigLoader::from_toml(&content).unwrap();
		assert_eq!(config.chain.rpc_url, "https://rpc.example.com");
	}

	#[test]
	fn test_missing_env_var() {
		let content = sample("").replace("http://localhost:8545", "${SETTLER_TEST_UNSET_VAR}");
		let result = ConfigLoader::from_toml(&content);
		assert!(matches!(result, Err(ConfigError::EnvVarNotFound(name)) if name == "SETTLER_TEST_UNSET_VAR"));
	}

	#[test]
	fn test_invalid_vault_address() {
		let content = sample("").replace("0x5FbDB2315678afecb367f032d93F642f64180aa3", "0x1234");
		let result = ConfigLoader::from_toml(&content);
		assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("vault_address")));
	}

	#[test]
	fn test_short_private_key_rejected() {
		let content = sample("").replacen(KEY, "0xdeadbeef", 1);
		assert!(ConfigLoader::from_toml(&content).is_err());
	}

	#[test]
	fn test_signer_keys_are_redacted_in_debug() {
		let config = ConfigLoader::from_toml(&sample("")).unwrap();
		let debug = format!("{:?}", config.signers);
		assert!(!debug.contains(KEY));
	}

	#[tokio::test]
	async fn test_load_from_file_with_override() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("settler.toml");
		std::fs::write(&path, sample("")).unwrap();

		env::set_var("SETTLERTEST_POLL_INTERVAL_SECS", "3");
		let config = ConfigLoader::new()
			.with_file(&path)
			.with_env_prefix("SETTLERTEST_")
			.load()
			.await
			.unwrap();
		assert_eq!(config.settler.poll_interval_secs, 3);
	}

	#[tokio::test]
	async fn test_missing_file() {
		let result = ConfigLoader::new().with_file("/nonexistent/settler.toml").load().await;
		assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
	}
}
