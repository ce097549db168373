//! Chain collaborators for the asset settlement system.
//!
//! Settlement talks to the chain through three narrow seams: asset
//! contracts (mint / transfer-from-vault), currency contracts (mint /
//! transfer / decimals) and the pending transaction handle returned by a
//! submission. The [`gas::GasPriceProvider`] supplies the fee for each
//! submission. [`implementations::evm`] backs all of them with Alloy.

use async_trait::async_trait;
use settler_types::{TransactionHash, TransactionReceipt};
use std::time::Duration;
use thiserror::Error;

pub mod gas;

/// Re-export implementations
pub mod implementations {
	pub mod evm;
}

pub use alloy::primitives::U256;
pub use gas::{GasOracle, GasPriceProvider};

#[derive(Debug, Error)]
pub enum ChainError {
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("RPC error: {0}")]
	Rpc(String),
	#[error("Submission failed: {0}")]
	Submission(String),
	#[error("Confirmation failed: {0}")]
	Confirmation(String),
	#[error("Timed out after {after_secs}s waiting for {hash}")]
	ConfirmationTimeout { hash: TransactionHash, after_secs: u64 },
}

/// Fee parameters attached to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeOptions {
	/// Gas price in wei.
	pub gas_price: u128,
}

/// Key that signs a class of calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignerRole {
	/// Vault operator; moves tokens out of custody.
	Vault,
	/// Minter; creates NFTs and vault-minted currency.
	Minter,
	/// Treasury; transfers currency it holds.
	Treasury,
}

/// A submitted transaction.
#[async_trait]
pub trait PendingTransaction: Send + Sync {
	fn hash(&self) -> &TransactionHash;

	fn nonce(&self) -> u64;

	/// Waits until the transaction is `confirmations` blocks deep, giving up
	/// after `timeout`.
	async fn wait(
		self: Box<Self>,
		confirmations: u64,
		timeout: Duration,
	) -> Result<TransactionReceipt, ChainError>;
}

/// NFT contract calls for one asset class.
#[async_trait]
pub trait AssetContract: Send + Sync {
	/// Mints a token that has never existed on chain directly to `to`.
	async fn mint(
		&self,
		to: &str,
		token_id: u64,
		uri: &str,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError>;

	/// Moves a token held by the vault to `to`.
	async fn transfer_from_vault(
		&self,
		to: &str,
		token_id: u64,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError>;
}

/// Payout calls for one currency class.
#[async_trait]
pub trait CurrencyContract: Send + Sync {
	/// Mints `amount` on-chain units to `to` through the vault.
	async fn mint(
		&self,
		to: &str,
		amount: U256,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError>;

	/// Transfers `amount` on-chain units held by the treasury to `to`.
	async fn transfer(
		&self,
		to: &str,
		amount: U256,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError>;

	/// Decimal precision reported by the token contract.
	async fn decimals(&self) -> Result<u8, ChainError>;
}
