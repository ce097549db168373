use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use settler_config::{Config, ConfigLoader};
use settler_core::SettlerBuilder;
use std::path::PathBuf;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "asset-settler")]
#[command(about = "Settles in-game asset and currency withdrawals on chain", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/settler.toml")]
	config: PathBuf,

	/// Overrides `settler.log_level` from the configuration file
	#[arg(long, env = "SETTLER_LOG_LEVEL")]
	log_level: Option<String>,

	#[arg(long, value_enum, default_value_t = LogFormat::Text)]
	log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
	/// Poll the ledger until interrupted
	Start,
	/// Validate the configuration file
	Validate,
	/// Run a single settlement pass and exit
	PollOnce,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
	Text,
	Json,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	// Tracing needs the configured log level, so the file is read first.
	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

	setup_tracing(log_level(&cli, &config), cli.log_format)?;
	info!("Loaded configuration from: {:?}", cli.config);

	match cli.command {
		Some(Commands::Start) | None => start_service(config).await,
		Some(Commands::Validate) => validate_config(config),
		Some(Commands::PollOnce) => poll_once(config).await,
	}
}

/// The CLI flag (or `SETTLER_LOG_LEVEL`) wins over the file's `settler.log_level`.
fn log_level<'a>(cli: &'a Cli, config: &'a Config) -> &'a str {
	cli.log_level
		.as_deref()
		.unwrap_or(config.settler.log_level.as_str())
}

async fn start_service(config: Config) -> Result<()> {
	info!(name = %config.settler.name, "Starting asset settler");

	let settler = SettlerBuilder::new(config)
		.build()
		.await
		.context("Failed to build settler")?;

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let driver = tokio::spawn(async move { settler.driver.run(shutdown_rx).await });

	setup_shutdown_signal().await;
	info!("Shutdown signal received, finishing current cycle...");

	// The receiver may already be gone if the driver exited on its own.
	let _ = shutdown_tx.send(true);
	driver.await.context("Settlement driver panicked")?;

	info!("Asset settler stopped");
	Ok(())
}

async fn poll_once(config: Config) -> Result<()> {
	let settler = SettlerBuilder::new(config)
		.build()
		.await
		.context("Failed to build settler")?;

	let summary = settler
		.coordinator
		.poll()
		.await
		.context("Settlement pass failed")?;

	info!(
		submitted = summary.submitted,
		failed = summary.failed,
		skipped = summary.skipped,
		"Settlement pass finished"
	);
	Ok(())
}

fn validate_config(config: Config) -> Result<()> {
	info!("Configuration is valid");
	info!("Settler name: {}", config.settler.name);
	info!("Ledger backend: {}", config.ledger.backend);
	info!("Chain ID: {}", config.chain.chain_id);

	for (class, asset) in config.assets.iter() {
		info!("  Asset: {} ({})", class, asset.contract);
	}
	for (class, currency) in config.currencies.iter() {
		info!(
			"  Currency: {} ({}, {:?})",
			class,
			currency.contract,
			currency.call_kind(class)
		);
	}

	Ok(())
}

fn setup_tracing(log_level: &str, format: LogFormat) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
		.context("Invalid log level")?;

	let registry = tracing_subscriber::registry().with(env_filter);
	match format {
		LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
		LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
	}

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c()
			.await
			.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_command_and_format() {
		let cli = Cli::parse_from(["asset-settler"]);
		assert!(cli.command.is_none());
		assert_eq!(cli.config, PathBuf::from("config/settler.toml"));
		assert!(matches!(cli.log_format, LogFormat::Text));
	}

	fn config() -> Config {
		settler_config::ConfigLoader::from_toml(
			r#"
[settler]
log_level = "warn,settler_core=debug"

[ledger]
backend = "memory"

[chain]
rpc_url = "http://localhost:8545"
chain_id = 31337
vault_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

[signers]
vault = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
minter = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
treasury = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[currencies.akv]
contract = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
"#,
		)
		.unwrap()
	}

	#[test]
	fn test_log_level_falls_back_to_config() {
		let cli = Cli {
			command: None,
			config: PathBuf::from("settler.toml"),
			log_level: None,
			log_format: LogFormat::Text,
		};
		assert_eq!(log_level(&cli, &config()), "warn,settler_core=debug");

		let cli = Cli::parse_from(["asset-settler", "--log-level", "trace"]);
		assert_eq!(log_level(&cli, &config()), "trace");
	}

	#[test]
	fn test_poll_once_with_json_logs() {
		let cli = Cli::parse_from([
			"asset-settler",
			"--config",
			"other.toml",
			"--log-format",
			"json",
			"poll-once",
		]);
		assert!(matches!(cli.command, Some(Commands::PollOnce)));
		assert!(matches!(cli.log_format, LogFormat::Json));
		assert_eq!(cli.config, PathBuf::from("other.toml"));
	}
}
