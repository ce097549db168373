//! Fixed-interval scheduler around [`SettlementCoordinator::poll`].

use crate::SettlementCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

pub struct PollingDriver {
	coordinator: Arc<SettlementCoordinator>,
	interval: Duration,
}

impl PollingDriver {
	pub fn new(coordinator: Arc<SettlementCoordinator>, interval: Duration) -> Self {
		Self {
			coordinator,
			interval,
		}
	}

	/// Polls until `shutdown` flips to `true` or its sender is dropped.
	///
	/// A poll that has started always runs to completion; shutdown is only
	/// observed between cycles and while sleeping.
	pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
		info!(interval_secs = self.interval.as_secs(), "Settlement driver started");

		loop {
			if *shutdown.borrow() {
				break;
			}

			match self.coordinator.poll().await {
				Ok(summary) if summary.total() > 0 => info!(
					submitted = summary.submitted,
					failed = summary.failed,
					skipped = summary.skipped,
					"Settlement cycle finished"
				),
				Ok(_) => {}
				Err(e) => error!(error = %e, "Settlement cycle failed; retrying next interval"),
			}

			tokio::select! {
				_ = tokio::time::sleep(self.interval) => {}
				changed = shutdown.changed() => {
					if changed.is_err() {
						break;
					}
				}
			}
		}

		info!("Settlement driver stopped");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::*;
	use settler_ledger::LedgerSnapshot;
	use settler_types::{AssetClass, WithdrawalRequest, WithdrawalState};

	#[tokio::test(start_paused = true)]
	async fn test_picks_up_new_rows_each_interval() {
		let (memory, ledger) = ledger(
			LedgerSnapshot::default()
				.with_asset(asset(AssetClass::Part, 1, Some(VAULT)))
				.with_asset(asset(AssetClass::Part, 2, None)),
		);
		let chain = MockChain::new(Outcome::Success);
		let executor = crate::NftSettlementExecutor::new(
			AssetClass::Part,
			chain.clone(),
			VAULT,
			VAULT_SIGNER,
			MINT_SIGNER,
			"ipfs://parts/",
			ledger.clone(),
			submitter(),
		);
		let coordinator = Arc::new(SettlementCoordinator::new(ledger).with_nft_executor(executor));
		let driver = PollingDriver::new(coordinator, Duration::from_secs(10));

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		memory.insert_withdrawal(WithdrawalRequest::new("p1", AssetClass::Part, 1)).await;
		let handle = tokio::spawn(async move { driver.run(shutdown_rx).await });

		tokio::time::sleep(Duration::from_secs(1)).await;
		assert_eq!(chain.calls().len(), 1);

		memory.insert_withdrawal(WithdrawalRequest::new("p2", AssetClass::Part, 2)).await;
		tokio::time::sleep(Duration::from_secs(10)).await;
		assert_eq!(chain.calls().len(), 2);

		shutdown_tx.send(true).unwrap();
		handle.await.unwrap();

		let snapshot = memory.snapshot().await;
		assert_eq!(snapshot.withdrawal("p1").unwrap().state, WithdrawalState::Pending);
		assert_eq!(snapshot.withdrawal("p2").unwrap().state, WithdrawalState::Pending);
	}

	#[tokio::test(start_paused = true)]
	async fn test_stops_when_sender_dropped() {
		let (_, ledger) = ledger(LedgerSnapshot::default());
		let coordinator = Arc::new(SettlementCoordinator::new(ledger));
		let driver = PollingDriver::new(coordinator, Duration::from_secs(3600));

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let handle = tokio::spawn(async move { driver.run(shutdown_rx).await });
		drop(shutdown_tx);

		tokio::time::timeout(Duration::from_secs(5), handle)
			.await
			.expect("driver did not stop")
			.unwrap();
	}
}
