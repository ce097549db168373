//! Wires configuration into a ready-to-run settler.

use crate::executor::{CurrencySettlementExecutor, NftSettlementExecutor};
use crate::{PollingDriver, SettlementCoordinator, SettlementError, Submitter};
use settler_chain::implementations::evm::{AlloyChain, SignerKeys};
use settler_chain::{GasPriceProvider, SignerRole};
use settler_config::Config;
use settler_ledger::{ledger_factory, LedgerInterface, LedgerService};
use settler_types::CurrencyCallKind;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A fully wired settler.
pub struct Settler {
	pub coordinator: Arc<SettlementCoordinator>,
	pub driver: PollingDriver,
}

pub struct SettlerBuilder {
	config: Config,
	ledger: Option<Box<dyn LedgerInterface>>,
}

impl SettlerBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			ledger: None,
		}
	}

	/// Uses `ledger` instead of the backend named in `[ledger]`.
	pub fn with_ledger(mut self, ledger: Box<dyn LedgerInterface>) -> Self {
		self.ledger = Some(ledger);
		self
	}

	fn build_ledger(&mut self) -> Result<Arc<LedgerService>, SettlementError> {
		let settings = &self.config.ledger;
		let backend = match self.ledger.take() {
			Some(backend) => backend,
			None => {
				let factory = ledger_factory(&settings.backend).ok_or_else(|| {
					SettlementError::Config(format!("Unknown ledger backend: {}", settings.backend))
				})?;
				factory(&settings.config)?
			}
		};

		Ok(Arc::new(
			LedgerService::new(backend)
				.with_retry_window(Duration::from_secs(settings.retry_window_secs)),
		))
	}

	/// Opens the ledger, connects to the chain and registers an executor for
	/// every configured asset and currency class.
	pub async fn build(mut self) -> Result<Settler, SettlementError> {
		let ledger = self.build_ledger()?;
		let config = &self.config;

		let keys = SignerKeys {
			vault: &config.signers.vault,
			minter: &config.signers.minter,
			treasury: &config.signers.treasury,
		};
		let chain = AlloyChain::connect(&config.chain.rpc_url, config.chain.chain_id, &keys).await?;

		let gas = GasPriceProvider::new(Arc::new(chain.gas_oracle()), config.gas.adjustment_percent)
			.with_retry_window(Duration::from_secs(config.gas.retry_window_secs));
		let submitter = Arc::new(Submitter::new(
			Arc::new(gas),
			config.settler.confirmations,
			Duration::from_secs(config.settler.confirmation_timeout_secs),
		));

		let mut coordinator = SettlementCoordinator::new(ledger.clone());

		for (asset_class, settings) in config.assets.iter() {
			let contract = chain.asset_contract(&settings.contract, &config.chain.vault_address)?;
			coordinator = coordinator.with_nft_executor(NftSettlementExecutor::new(
				asset_class,
				Arc::new(contract),
				config.chain.vault_address.clone(),
				chain.signer_address(SignerRole::Vault),
				chain.signer_address(SignerRole::Minter),
				settings.metadata_base_uri.clone(),
				ledger.clone(),
				submitter.clone(),
			));
			info!(%asset_class, contract = %settings.contract, "Registered NFT executor");
		}

		for (currency_class, settings) in config.currencies.iter() {
			let call = settings.call_kind(currency_class);
			let role = match call {
				CurrencyCallKind::Mint => SignerRole::Minter,
				CurrencyCallKind::Transfer => SignerRole::Treasury,
			};
			let contract = chain.currency_contract(&settings.contract)?;
			let mut executor = CurrencySettlementExecutor::new(
				currency_class,
				Arc::new(contract),
				call,
				chain.signer_address(role),
				ledger.clone(),
				submitter.clone(),
			);
			if let Some(internal_scale) = settings.effective_internal_scale(currency_class) {
				executor = executor.with_internal_scale(internal_scale);
			}
			coordinator = coordinator.with_currency_executor(executor);
			info!(%currency_class, contract = %settings.contract, ?call, "Registered currency executor");
		}

		let coordinator = Arc::new(coordinator);
		let driver = PollingDriver::new(
			coordinator.clone(),
			Duration::from_secs(config.settler.poll_interval_secs),
		);

		Ok(Settler {
			coordinator,
			driver,
		})
	}
}
