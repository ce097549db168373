//! EVM chain implementations.

pub mod alloy;

pub use self::alloy::{AlloyAssetContract, AlloyChain, AlloyCurrencyContract, AlloyGasOracle, SignerKeys};
