//! Alloy-backed chain collaborators.
//!
//! One wallet-bound provider per [`SignerRole`] submits contract calls; a
//! plain provider serves reads. Nonces are fetched explicitly and set on
//! each call so the submitted nonce can be recorded in the ledger.

use crate::{
	AssetContract, ChainError, CurrencyContract, FeeOptions, GasOracle, PendingTransaction,
	SignerRole, U256,
};
use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::Address;
use alloy::providers::{
	DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder,
	WatchTxError,
};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use settler_types::{TransactionHash, TransactionReceipt};
use std::time::Duration;

sol! {
	/// Game NFT contract.
	#[sol(rpc)]
	interface IGameAsset {
		function mint(address to, uint256 tokenId, string uri) external;
	}

	/// Custodial vault holding NFTs for players.
	#[sol(rpc)]
	interface IAssetVault {
		function transferFromVault(address token, address to, uint256 tokenId) external;
	}

	/// Vault that mints in-game currency on withdrawal.
	#[sol(rpc)]
	interface ICurrencyVault {
		function mint(address to, uint256 amount) external;
	}

	#[sol(rpc)]
	interface IERC20 {
		function transfer(address to, uint256 amount) external returns (bool);
		function decimals() external view returns (uint8);
	}
}

/// Private keys for each signing role.
pub struct SignerKeys<'a> {
	pub vault: &'a str,
	pub minter: &'a str,
	pub treasury: &'a str,
}

/// A provider that signs with one role's key.
#[derive(Clone)]
struct RoleWallet {
	address: Address,
	provider: DynProvider,
}

impl RoleWallet {
	fn new(url: Url, chain_id: u64, private_key: &str) -> Result<Self, ChainError> {
		let signer = private_key
			.parse::<PrivateKeySigner>()
			.map_err(|e| ChainError::Config(format!("Invalid private key: {}", e)))?
			.with_chain_id(Some(chain_id));

		let address = signer.address();
		let provider = ProviderBuilder::new()
			.wallet(EthereumWallet::from(signer))
			.connect_http(url)
			.erased();

		Ok(Self { address, provider })
	}

	/// Next nonce including transactions still in the mempool.
	async fn next_nonce(&self) -> Result<u64, ChainError> {
		self.provider
			.get_transaction_count(self.address)
			.pending()
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to get nonce: {}", e)))
	}
}

fn parse_address(value: &str) -> Result<Address, ChainError> {
	value
		.parse::<Address>()
		.map_err(|e| ChainError::InvalidAddress(format!("{}: {}", value, e)))
}

fn parse_url(rpc_url: &str) -> Result<Url, ChainError> {
	rpc_url
		.parse()
		.map_err(|e| ChainError::Config(format!("Invalid RPC URL: {}", e)))
}

/// Connection to one EVM chain with all signing roles loaded.
pub struct AlloyChain {
	read: DynProvider,
	vault: RoleWallet,
	minter: RoleWallet,
	treasury: RoleWallet,
}

impl AlloyChain {
	/// Connects to `rpc_url` and verifies the node serves `chain_id`.
	pub async fn connect(rpc_url: &str, chain_id: u64, keys: &SignerKeys<'_>) -> Result<Self, ChainError> {
		let url = parse_url(rpc_url)?;
		let read = ProviderBuilder::new().connect_http(url.clone()).erased();

		let remote_chain_id = read
			.get_chain_id()
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to get chain ID: {}", e)))?;
		if remote_chain_id != chain_id {
			return Err(ChainError::Config(format!(
				"Chain ID mismatch: expected {}, got {}",
				chain_id, remote_chain_id
			)));
		}

		let chain = Self {
			read,
			vault: RoleWallet::new(url.clone(), chain_id, keys.vault)?,
			minter: RoleWallet::new(url.clone(), chain_id, keys.minter)?,
			treasury: RoleWallet::new(url, chain_id, keys.treasury)?,
		};

		tracing::info!(
			chain_id,
			vault_signer = %chain.vault.address,
			minter = %chain.minter.address,
			treasury = %chain.treasury.address,
			"Connected to chain"
		);

		Ok(chain)
	}

	fn wallet(&self, role: SignerRole) -> &RoleWallet {
		match role {
			SignerRole::Vault => &self.vault,
			SignerRole::Minter => &self.minter,
			SignerRole::Treasury => &self.treasury,
		}
	}

	/// Checksummed address of the key used for `role`.
	pub fn signer_address(&self, role: SignerRole) -> String {
		self.wallet(role).address.to_string()
	}

	/// NFT calls for the token at `token`, held in custody by `vault`.
	pub fn asset_contract(&self, token: &str, vault: &str) -> Result<AlloyAssetContract, ChainError> {
		Ok(AlloyAssetContract {
			token: parse_address(token)?,
			vault: parse_address(vault)?,
			vault_wallet: self.vault.clone(),
			minter: self.minter.clone(),
		})
	}

	/// Currency calls against `contract` (the token for transfers, the
	/// currency vault for mints).
	pub fn currency_contract(&self, contract: &str) -> Result<AlloyCurrencyContract, ChainError> {
		Ok(AlloyCurrencyContract {
			contract: parse_address(contract)?,
			read: self.read.clone(),
			minter: self.minter.clone(),
			treasury: self.treasury.clone(),
		})
	}

	pub fn gas_oracle(&self) -> AlloyGasOracle {
		AlloyGasOracle {
			provider: self.read.clone(),
		}
	}
}

/// Submitted Alloy transaction.
pub struct AlloyPendingTransaction {
	hash: TransactionHash,
	nonce: u64,
	inner: PendingTransactionBuilder<Ethereum>,
}

impl AlloyPendingTransaction {
	fn new(inner: PendingTransactionBuilder<Ethereum>, nonce: u64) -> Self {
		let hash = TransactionHash(inner.tx_hash().0.to_vec());
		tracing::info!(tx_hash = %hash.truncated(), nonce, "Submitted transaction");
		Self { hash, nonce, inner }
	}
}

#[async_trait]
impl PendingTransaction for AlloyPendingTransaction {
	fn hash(&self) -> &TransactionHash {
		&self.hash
	}

	fn nonce(&self) -> u64 {
		self.nonce
	}

	async fn wait(
		self: Box<Self>,
		confirmations: u64,
		timeout: Duration,
	) -> Result<TransactionReceipt, ChainError> {
		let Self { hash, inner, .. } = *self;

		tracing::info!(
			tx_hash = %hash.truncated(),
			"Waiting for {} confirmations (timeout: {}s)",
			confirmations,
			timeout.as_secs()
		);

		let receipt = match inner
			.with_required_confirmations(confirmations)
			.with_timeout(Some(timeout))
			.get_receipt()
			.await
		{
			Ok(receipt) => receipt,
			Err(PendingTransactionError::TxWatcher(WatchTxError::Timeout)) => {
				return Err(ChainError::ConfirmationTimeout {
					hash,
					after_secs: timeout.as_secs(),
				})
			}
			Err(e) => {
				return Err(ChainError::Confirmation(format!(
					"Failed to get receipt: {}",
					e
				)))
			}
		};

		Ok(TransactionReceipt {
			hash: TransactionHash(receipt.transaction_hash.0.to_vec()),
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
			raw: serde_json::to_value(&receipt).ok(),
		})
	}
}

/// NFT contract calls for one asset class.
pub struct AlloyAssetContract {
	token: Address,
	vault: Address,
	vault_wallet: RoleWallet,
	minter: RoleWallet,
}

#[async_trait]
impl AssetContract for AlloyAssetContract {
	async fn mint(
		&self,
		to: &str,
		token_id: u64,
		uri: &str,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError> {
		let to = parse_address(to)?;
		let nonce = self.minter.next_nonce().await?;

		let token = IGameAsset::new(self.token, self.minter.provider.clone());
		let pending = token
			.mint(to, U256::from(token_id), uri.to_string())
			.nonce(nonce)
			.gas_price(fee.gas_price)
			.send()
			.await
			.map_err(|e| ChainError::Submission(format!("Failed to send mint: {}", e)))?;

		Ok(Box::new(AlloyPendingTransaction::new(pending, nonce)))
	}

	async fn transfer_from_vault(
		&self,
		to: &str,
		token_id: u64,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError> {
		let to = parse_address(to)?;
		let nonce = self.vault_wallet.next_nonce().await?;

		let vault = IAssetVault::new(self.vault, self.vault_wallet.provider.clone());
		let pending = vault
			.transferFromVault(self.token, to, U256::from(token_id))
			.nonce(nonce)
			.gas_price(fee.gas_price)
			.send()
			.await
			.map_err(|e| ChainError::Submission(format!("Failed to send vault transfer: {}", e)))?;

		Ok(Box::new(AlloyPendingTransaction::new(pending, nonce)))
	}
}

/// Currency payout calls for one currency class.
pub struct AlloyCurrencyContract {
	contract: Address,
	read: DynProvider,
	minter: RoleWallet,
	treasury: RoleWallet,
}

#[async_trait]
impl CurrencyContract for AlloyCurrencyContract {
	async fn mint(
		&self,
		to: &str,
		amount: U256,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError> {
		let to = parse_address(to)?;
		let nonce = self.minter.next_nonce().await?;

		let vault = ICurrencyVault::new(self.contract, self.minter.provider.clone());
		let pending = vault
			.mint(to, amount)
			.nonce(nonce)
			.gas_price(fee.gas_price)
			.send()
			.await
			.map_err(|e| ChainError::Submission(format!("Failed to send currency mint: {}", e)))?;

		Ok(Box::new(AlloyPendingTransaction::new(pending, nonce)))
	}

	async fn transfer(
		&self,
		to: &str,
		amount: U256,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError> {
		let to = parse_address(to)?;
		let nonce = self.treasury.next_nonce().await?;

		let token = IERC20::new(self.contract, self.treasury.provider.clone());
		let pending = token
			.transfer(to, amount)
			.nonce(nonce)
			.gas_price(fee.gas_price)
			.send()
			.await
			.map_err(|e| ChainError::Submission(format!("Failed to send transfer: {}", e)))?;

		Ok(Box::new(AlloyPendingTransaction::new(pending, nonce)))
	}

	async fn decimals(&self) -> Result<u8, ChainError> {
		IERC20::new(self.contract, self.read.clone())
			.decimals()
			.call()
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to read decimals: {}", e)))
	}
}

/// Gas price straight from the node.
pub struct AlloyGasOracle {
	provider: DynProvider,
}

#[async_trait]
impl GasOracle for AlloyGasOracle {
	async fn estimate(&self) -> Result<u128, ChainError> {
		self.provider
			.get_gas_price()
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to get gas price: {}", e)))
	}
}
