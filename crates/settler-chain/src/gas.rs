//! Gas price estimation.

use crate::ChainError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Source of the node's current gas price estimate.
#[async_trait]
pub trait GasOracle: Send + Sync {
	async fn estimate(&self) -> Result<u128, ChainError>;
}

/// Current gas price scaled by a fixed adjustment.
///
/// Nothing is cached: every submission asks the oracle again.
pub struct GasPriceProvider {
	oracle: Arc<dyn GasOracle>,
	/// Percentage of the estimate to pay (120 = +20%).
	adjustment_percent: u64,
	/// How long a failing estimate fetch is retried.
	retry_window: Duration,
}

impl GasPriceProvider {
	pub fn new(oracle: Arc<dyn GasOracle>, adjustment_percent: u64) -> Self {
		Self {
			oracle,
			adjustment_percent,
			retry_window: Duration::from_secs(10),
		}
	}

	pub fn with_retry_window(mut self, retry_window: Duration) -> Self {
		self.retry_window = retry_window;
		self
	}

	/// Fetches the estimate and applies the adjustment.
	pub async fn gas_price(&self) -> Result<u128, ChainError> {
		let policy = backoff::ExponentialBackoff {
			max_elapsed_time: Some(self.retry_window),
			..backoff::ExponentialBackoff::default()
		};

		let oracle = &self.oracle;
		let estimate = backoff::future::retry(policy, move || async move {
			oracle.estimate().await.map_err(|e| match e {
				ChainError::Rpc(_) => {
					tracing::debug!(error = %e, "Retrying gas price estimate");
					backoff::Error::transient(e)
				}
				other => backoff::Error::permanent(other),
			})
		})
		.await?;

		let adjusted = self.adjust(estimate);
		tracing::debug!(estimate, adjusted, "Gas price");
		Ok(adjusted)
	}

	/// Caps at `u128::MAX` rather than wrapping.
	fn adjust(&self, estimate: u128) -> u128 {
		let percent = u128::from(self.adjustment_percent);
		(estimate / 100)
			.checked_mul(percent)
			.and_then(|whole| whole.checked_add(estimate % 100 * percent / 100))
			.unwrap_or(u128::MAX)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct FixedOracle {
		price: u128,
		failures: AtomicUsize,
		calls: AtomicUsize,
	}

	impl FixedOracle {
		fn new(price: u128, failures: usize) -> Self {
			Self {
				price,
				failures: AtomicUsize::new(failures),
				calls: AtomicUsize::new(0),
			}
		}
	}

	#[async_trait]
	impl GasOracle for FixedOracle {
		async fn estimate(&self) -> Result<u128, ChainError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			let left = self.failures.load(Ordering::SeqCst);
			if left > 0 {
				self.failures.store(left - 1, Ordering::SeqCst);
				return Err(ChainError::Rpc("503".into()));
			}
			Ok(self.price)
		}
	}

	#[tokio::test]
	async fn test_adjustment_applied() {
		let provider = GasPriceProvider::new(Arc::new(FixedOracle::new(30_000_000_000, 0)), 120);
		assert_eq!(provider.gas_price().await.unwrap(), 36_000_000_000);
	}

	#[tokio::test]
	async fn test_not_cached_between_calls() {
		let oracle = Arc::new(FixedOracle::new(100, 0));
		let provider = GasPriceProvider::new(oracle.clone(), 100);
		provider.gas_price().await.unwrap();
		provider.gas_price().await.unwrap();
		assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_transient_rpc_errors_retried() {
		let oracle = Arc::new(FixedOracle::new(1_000, 1));
		let provider = GasPriceProvider::new(oracle.clone(), 150);
		assert_eq!(provider.gas_price().await.unwrap(), 1_500);
		assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn test_adjustment_never_drops_below_estimate() {
		let provider = GasPriceProvider::new(Arc::new(FixedOracle::new(0, 0)), 120);
		let estimate = u128::MAX / 50;
		assert!(provider.adjust(estimate) >= estimate);
		assert_eq!(provider.adjust(u128::MAX), u128::MAX);
		assert_eq!(provider.adjust(250), 300);
		assert_eq!(provider.adjust(99), 118);
	}
}
