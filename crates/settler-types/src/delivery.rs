//! Transaction delivery types for the settlement system.
//!
//! This module defines types related to blockchain transaction submission
//! and confirmation, including transaction hashes and receipts.

use std::fmt;

/// Blockchain transaction hash representation.
///
/// Stores transaction hashes as raw bytes; displayed as 0x-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

impl TransactionHash {
	/// Short form for log lines.
	pub fn truncated(&self) -> String {
		let hash_str = hex::encode(&self.0);
		if hash_str.len() <= 8 {
			hash_str
		} else {
			format!("{}..", &hash_str[..8])
		}
	}
}

/// Transaction receipt containing execution details.
///
/// Provides information about a transaction after it has been included in a block,
/// including its success status and block number.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
	/// The receipt as returned by the node, kept for auditing.
	pub raw: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_display_is_prefixed_hex() {
		let hash = TransactionHash(vec![0xde, 0xad, 0xbe, 0xef]);
		assert_eq!(hash.to_string(), "0xdeadbeef");
	}

	#[test]
	fn test_truncated_hash() {
		let hash = TransactionHash(vec![0x11; 32]);
		assert_eq!(hash.truncated(), "11111111..");
		let short = TransactionHash(vec![0xab, 0xcd]);
		assert_eq!(short.truncated(), "abcd");
	}
}
