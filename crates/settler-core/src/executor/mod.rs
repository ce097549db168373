//! Per-class executors that turn one claimed withdrawal row into one
//! confirmed chain transaction.

pub mod currency;
pub mod nft;

pub use currency::{to_chain_units, CurrencySettlementExecutor};
pub use nft::NftSettlementExecutor;

use crate::submission::error_update;
use crate::SettlementError;
use settler_ledger::LedgerService;
use settler_types::AssetClass;
use tracing::{error, info, warn};

/// Marks an NFT row as failed and, unless the transaction's fate is unknown,
/// hands the asset back to the player.
///
/// Ledger write failures here are logged and swallowed so the batch keeps going.
pub(crate) async fn record_nft_failure(
	ledger: &LedgerService,
	withdrawal_id: &str,
	asset_class: AssetClass,
	token_id: u64,
	err: &SettlementError,
	compensate: bool,
) {
	if let Err(e) = ledger.update_withdrawal(withdrawal_id, &error_update(err)).await {
		error!(withdrawal_id, error = %e, "Failed to record withdrawal error");
	}

	if !compensate {
		return;
	}
	if !err.allows_compensation() {
		warn!(
			withdrawal_id,
			%asset_class,
			token_id,
			"Asset left out of custody; transaction outcome unknown"
		);
		return;
	}

	match ledger.release_asset(asset_class, token_id).await {
		Ok(()) => info!(withdrawal_id, %asset_class, token_id, "Asset returned to custody"),
		Err(e) => error!(
			withdrawal_id,
			%asset_class,
			token_id,
			error = %e,
			"Failed to return asset to custody"
		),
	}
}
