use settler_chain::ChainError;
use settler_ledger::LedgerError;
use settler_types::TransactionHash;
use thiserror::Error;

/// A transaction that made it to the mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTx {
	pub hash: TransactionHash,
	pub nonce: u64,
	pub signer: String,
}

#[derive(Debug, Error)]
pub enum SettlementError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("No executor configured for {0}")]
	NotConfigured(String),
	#[error("Ownership mismatch: {0}")]
	OwnershipMismatch(String),
	#[error("{asset} is held by untracked address {location}")]
	UntrackedCustody { asset: String, location: String },
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	#[error("Transaction {} reverted", .tx.hash)]
	Reverted { tx: SubmittedTx },
	#[error("Transaction {} was not confirmed: {source}", .tx.hash)]
	Unconfirmed { tx: SubmittedTx, source: ChainError },
	#[error(transparent)]
	Chain(#[from] ChainError),
	#[error(transparent)]
	Ledger(#[from] LedgerError),
}

impl SettlementError {
	/// The transaction behind the failure, if one was submitted.
	pub fn submitted(&self) -> Option<&SubmittedTx> {
		match self {
			SettlementError::Reverted { tx } | SettlementError::Unconfirmed { tx, .. } => Some(tx),
			_ => None,
		}
	}

	/// Whether the asset can safely be handed back to the player.
	///
	/// A confirmation timeout leaves the transaction's fate unknown; the
	/// asset may still leave custody, so it stays out of play.
	pub fn allows_compensation(&self) -> bool {
		!matches!(
			self,
			SettlementError::Unconfirmed {
				source: ChainError::ConfirmationTimeout { .. },
				..
			}
		)
	}
}
