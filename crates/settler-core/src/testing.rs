//! Recording chain doubles shared by the executor and coordinator tests.

use async_trait::async_trait;
use settler_chain::{
	AssetContract, ChainError, CurrencyContract, FeeOptions, GasOracle, GasPriceProvider,
	PendingTransaction, U256,
};
use settler_ledger::implementations::memory::MemoryLedger;
use settler_ledger::{LedgerError, LedgerInterface, LedgerService, LedgerSnapshot};
use settler_types::{
	AssetClass, AssetRecord, AssetState, CurrencyWithdrawalRequest, TransactionHash,
	TransactionReceipt, UserRecord, WithdrawalRequest, WithdrawalUpdate,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::Submitter;

pub const VAULT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const VAULT_SIGNER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const MINT_SIGNER: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
pub const TREASURY: &str = "0x90F79bf6EB2c4f870365E785982E1f101E93b906";
pub const GAS_PRICE: u128 = 1_000;

/// How a mocked submission ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Success,
	Reverted,
	SubmitFails,
	Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
	Mint { to: String, token_id: u64, uri: String, gas_price: u128 },
	TransferFromVault { to: String, token_id: u64, gas_price: u128 },
	CurrencyMint { to: String, amount: U256, gas_price: u128 },
	CurrencyTransfer { to: String, amount: U256, gas_price: u128 },
}

pub struct MockPending {
	hash: TransactionHash,
	nonce: u64,
	outcome: Outcome,
}

#[async_trait]
impl PendingTransaction for MockPending {
	fn hash(&self) -> &TransactionHash {
		&self.hash
	}

	fn nonce(&self) -> u64 {
		self.nonce
	}

	async fn wait(
		self: Box<Self>,
		_confirmations: u64,
		timeout: Duration,
	) -> Result<TransactionReceipt, ChainError> {
		match self.outcome {
			Outcome::Timeout => Err(ChainError::ConfirmationTimeout {
				hash: self.hash,
				after_secs: timeout.as_secs(),
			}),
			outcome => Ok(TransactionReceipt {
				hash: self.hash,
				block_number: 100,
				success: outcome == Outcome::Success,
				raw: None,
			}),
		}
	}
}

/// Records every call. Scripted outcomes are used first, in order; after
/// that every call ends with the default outcome.
pub struct MockChain {
	pub calls: Mutex<Vec<ChainCall>>,
	outcome: Outcome,
	script: Mutex<VecDeque<Outcome>>,
	pub decimals: u8,
	pub decimals_calls: AtomicUsize,
	next_nonce: AtomicU64,
}

impl MockChain {
	pub fn new(outcome: Outcome) -> Arc<Self> {
		Arc::new(Self {
			calls: Mutex::new(Vec::new()),
			outcome,
			script: Mutex::new(VecDeque::new()),
			decimals: 6,
			decimals_calls: AtomicUsize::new(0),
			next_nonce: AtomicU64::new(0),
		})
	}

	pub fn scripted(script: Vec<Outcome>, then: Outcome) -> Arc<Self> {
		let chain = Self::new(then);
		*chain.script.lock().unwrap() = script.into();
		chain
	}

	pub fn calls(&self) -> Vec<ChainCall> {
		self.calls.lock().unwrap().clone()
	}

	fn record(&self, call: ChainCall) -> Result<Box<dyn PendingTransaction>, ChainError> {
		self.calls.lock().unwrap().push(call);
		let outcome = self.script.lock().unwrap().pop_front().unwrap_or(self.outcome);
		if outcome == Outcome::SubmitFails {
			return Err(ChainError::Submission("nonce too low".into()));
		}
		let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst);
		Ok(Box::new(MockPending {
			hash: TransactionHash(vec![nonce as u8 + 1; 32]),
			nonce,
			outcome,
		}))
	}
}

#[async_trait]
impl AssetContract for MockChain {
	async fn mint(
		&self,
		to: &str,
		token_id: u64,
		uri: &str,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError> {
		self.record(ChainCall::Mint {
			to: to.to_string(),
			token_id,
			uri: uri.to_string(),
			gas_price: fee.gas_price,
		})
	}

	async fn transfer_from_vault(
		&self,
		to: &str,
		token_id: u64,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError> {
		self.record(ChainCall::TransferFromVault {
			to: to.to_string(),
			token_id,
			gas_price: fee.gas_price,
		})
	}
}

#[async_trait]
impl CurrencyContract for MockChain {
	async fn mint(
		&self,
		to: &str,
		amount: U256,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError> {
		self.record(ChainCall::CurrencyMint {
			to: to.to_string(),
			amount,
			gas_price: fee.gas_price,
		})
	}

	async fn transfer(
		&self,
		to: &str,
		amount: U256,
		fee: FeeOptions,
	) -> Result<Box<dyn PendingTransaction>, ChainError> {
		self.record(ChainCall::CurrencyTransfer {
			to: to.to_string(),
			amount,
			gas_price: fee.gas_price,
		})
	}

	async fn decimals(&self) -> Result<u8, ChainError> {
		self.decimals_calls.fetch_add(1, Ordering::SeqCst);
		Ok(self.decimals)
	}
}

pub struct FixedGas;

#[async_trait]
impl GasOracle for FixedGas {
	async fn estimate(&self) -> Result<u128, ChainError> {
		Ok(GAS_PRICE)
	}
}

pub fn submitter() -> Arc<Submitter> {
	let gas = GasPriceProvider::new(Arc::new(FixedGas), 100);
	Arc::new(Submitter::new(Arc::new(gas), 1, Duration::from_secs(60)))
}

/// Ledger service over a shared memory ledger the test can inspect.
pub fn ledger(snapshot: LedgerSnapshot) -> (Arc<MemoryLedger>, Arc<LedgerService>) {
	shared_ledger(snapshot, false)
}

/// Like [`ledger`], but every asset release fails permanently.
pub fn ledger_without_release(snapshot: LedgerSnapshot) -> (Arc<MemoryLedger>, Arc<LedgerService>) {
	shared_ledger(snapshot, true)
}

fn shared_ledger(
	snapshot: LedgerSnapshot,
	fail_release: bool,
) -> (Arc<MemoryLedger>, Arc<LedgerService>) {
	let memory = Arc::new(MemoryLedger::new(snapshot));
	let backend = SharedLedger {
		inner: memory.clone(),
		fail_release,
	};
	let service =
		LedgerService::new(Box::new(backend)).with_retry_window(Duration::from_millis(10));
	(memory, Arc::new(service))
}

pub fn asset(asset_class: AssetClass, token_id: u64, custody: Option<&str>) -> AssetRecord {
	AssetRecord {
		asset_class,
		token_id,
		destination_wallet_address: "0xabc".to_string(),
		custody_location: custody.map(str::to_string),
		user_id: None,
		state: AssetState::Withdrawing,
		placement: Some("venue-7/slot-2".to_string()),
	}
}

pub fn user(id: &str, wallet: &str) -> UserRecord {
	UserRecord {
		id: id.to_string(),
		wallet_address: Some(wallet.to_string()),
	}
}

/// Lets the test keep a handle on the memory ledger behind the service.
struct SharedLedger {
	inner: Arc<MemoryLedger>,
	fail_release: bool,
}

#[async_trait]
impl LedgerInterface for SharedLedger {
	async fn unprocessed_withdrawals(
		&self,
	) -> Result<Vec<WithdrawalRequest>, LedgerError> {
		self.inner.unprocessed_withdrawals().await
	}

	async fn unprocessed_currency_withdrawals(
		&self,
	) -> Result<Vec<CurrencyWithdrawalRequest>, LedgerError> {
		self.inner.unprocessed_currency_withdrawals().await
	}

	async fn asset(
		&self,
		asset_class: AssetClass,
		token_id: u64,
	) -> Result<AssetRecord, LedgerError> {
		self.inner.asset(asset_class, token_id).await
	}

	async fn user(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError> {
		self.inner.user(user_id).await
	}

	async fn user_by_wallet(
		&self,
		wallet: &str,
	) -> Result<Option<UserRecord>, LedgerError> {
		self.inner.user_by_wallet(wallet).await
	}

	async fn claim_withdrawal(&self, id: &str) -> Result<bool, LedgerError> {
		self.inner.claim_withdrawal(id).await
	}

	async fn claim_currency_withdrawal(&self, id: &str) -> Result<bool, LedgerError> {
		self.inner.claim_currency_withdrawal(id).await
	}

	async fn update_withdrawal(
		&self,
		id: &str,
		update: &WithdrawalUpdate,
	) -> Result<(), LedgerError> {
		self.inner.update_withdrawal(id, update).await
	}

	async fn update_currency_withdrawal(
		&self,
		id: &str,
		update: &WithdrawalUpdate,
	) -> Result<(), LedgerError> {
		self.inner.update_currency_withdrawal(id, update).await
	}

	async fn release_asset(
		&self,
		asset_class: AssetClass,
		token_id: u64,
	) -> Result<(), LedgerError> {
		if self.fail_release {
			return Err(LedgerError::Serialization(format!(
				"corrupt asset row {} {}",
				asset_class, token_id
			)));
		}
		self.inner.release_asset(asset_class, token_id).await
	}
}
