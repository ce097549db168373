use super::record_nft_failure;
use crate::submission::{pending_update, Confirmed, Submitter};
use crate::SettlementError;
use settler_chain::AssetContract;
use settler_ledger::LedgerService;
use settler_types::{same_address, AssetClass, AssetRecord, WithdrawalRequest};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// How an asset leaves the game.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WithdrawalPath {
	/// Held by the vault; move it out.
	Transfer,
	/// Never minted; mint straight to the player.
	Mint { uri: String },
}

/// Settles withdrawals for one NFT asset class.
pub struct NftSettlementExecutor {
	asset_class: AssetClass,
	contract: Arc<dyn AssetContract>,
	vault_address: String,
	vault_signer: String,
	mint_signer: String,
	metadata_base_uri: String,
	ledger: Arc<LedgerService>,
	submitter: Arc<Submitter>,
}

impl NftSettlementExecutor {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		asset_class: AssetClass,
		contract: Arc<dyn AssetContract>,
		vault_address: impl Into<String>,
		vault_signer: impl Into<String>,
		mint_signer: impl Into<String>,
		metadata_base_uri: impl Into<String>,
		ledger: Arc<LedgerService>,
		submitter: Arc<Submitter>,
	) -> Self {
		Self {
			asset_class,
			contract,
			vault_address: vault_address.into(),
			vault_signer: vault_signer.into(),
			mint_signer: mint_signer.into(),
			metadata_base_uri: metadata_base_uri.into(),
			ledger,
			submitter,
		}
	}

	pub fn asset_class(&self) -> AssetClass {
		self.asset_class
	}

	/// Settles a claimed row and writes the outcome back to the ledger.
	///
	/// Failures are recorded on the row (with compensation where safe) before
	/// being returned.
	#[instrument(skip_all, fields(withdrawal_id = %request.id, token_id = request.token_id))]
	pub async fn withdraw(
		&self,
		request: &WithdrawalRequest,
		asset: &AssetRecord,
	) -> Result<Confirmed, SettlementError> {
		let confirmed = match self.settle(asset).await {
			Ok(confirmed) => confirmed,
			Err(e) => {
				error!(error = %e, "NFT withdrawal failed");
				record_nft_failure(
					&self.ledger,
					&request.id,
					self.asset_class,
					request.token_id,
					&e,
					true,
				)
				.await;
				return Err(e);
			}
		};

		// The transaction landed; compensating now would hand out a token twice.
		if let Err(e) = self.ledger.update_withdrawal(&request.id, &pending_update(&confirmed)).await {
			error!(
				tx_hash = %confirmed.tx.hash,
				error = %e,
				"Confirmed withdrawal could not be recorded"
			);
			return Err(e.into());
		}

		info!(tx_hash = %confirmed.tx.hash, nonce = confirmed.tx.nonce, "NFT withdrawal pending");
		Ok(confirmed)
	}

	async fn settle(&self, asset: &AssetRecord) -> Result<Confirmed, SettlementError> {
		self.check_ownership(asset).await?;

		let to = asset.destination_wallet_address.as_str();
		let token_id = asset.token_id;
		match self.select_path(asset)? {
			WithdrawalPath::Transfer => {
				self.submitter
					.submit(&self.vault_signer, |fee| {
						self.contract.transfer_from_vault(to, token_id, fee)
					})
					.await
			}
			WithdrawalPath::Mint { uri } => {
				self.submitter
					.submit(&self.mint_signer, |fee| self.contract.mint(to, token_id, &uri, fee))
					.await
			}
		}
	}

	/// The destination must belong to the linked user, or to nobody if the
	/// asset is unlinked.
	async fn check_ownership(&self, asset: &AssetRecord) -> Result<(), SettlementError> {
		let destination = asset.destination_wallet_address.as_str();

		match &asset.user_id {
			Some(user_id) => {
				let wallet = self
					.ledger
					.user(user_id)
					.await?
					.and_then(|user| user.wallet_address);
				match wallet {
					Some(wallet) if same_address(&wallet, destination) => Ok(()),
					Some(wallet) => Err(SettlementError::OwnershipMismatch(format!(
						"user {} has wallet {}, withdrawal targets {}",
						user_id, wallet, destination
					))),
					None => Err(SettlementError::OwnershipMismatch(format!(
						"user {} has no registered wallet, withdrawal targets {}",
						user_id, destination
					))),
				}
			}
			None => match self.ledger.user_by_wallet(destination).await? {
				Some(owner) => Err(SettlementError::OwnershipMismatch(format!(
					"asset is unlinked but {} belongs to user {}",
					destination, owner.id
				))),
				None => Ok(()),
			},
		}
	}

	fn select_path(&self, asset: &AssetRecord) -> Result<WithdrawalPath, SettlementError> {
		match asset.custody_location.as_deref() {
			None => Ok(WithdrawalPath::Mint {
				uri: format!("{}{}", self.metadata_base_uri, asset.token_id),
			}),
			Some(location) if same_address(location, &self.vault_address) => {
				Ok(WithdrawalPath::Transfer)
			}
			Some(location) => Err(SettlementError::UntrackedCustody {
				asset: format!("{} #{}", asset.asset_class, asset.token_id),
				location: location.to_string(),
			}),
		}
	}
}
