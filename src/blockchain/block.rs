use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::transaction::Transaction;

/// Previous-hash sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Fixed proof assigned to the genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// Represents a block in the blockchain.
///
/// A block does not store its own hash; the digest is always recomputed from
/// the block's fields, so a tampered block cannot carry a matching hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// 1-based position of the block in the chain
    pub index: u64,

    /// Seconds since the Unix epoch at creation time
    pub timestamp: f64,

    /// List of transactions included in this block
    pub transactions: Vec<Transaction>,

    /// Proof of work (nonce)
    pub proof: u64,

    /// Hash of the previous block (`"1"` for the genesis block)
    pub previous_hash: String,
}

impl Block {
    /// Creates a new block stamped with the current wall-clock time
    ///
    /// # Arguments
    ///
    /// * `index` - The 1-based index of the block in the chain
    /// * `transactions` - The list of transactions to include in the block
    /// * `proof` - The proof of work (nonce)
    /// * `previous_hash` - The hash of the previous block
    pub fn new(index: u64, transactions: Vec<Transaction>, proof: u64, previous_hash: String) -> Self {
        Block {
            index,
            timestamp: Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Calculates the SHA-256 hash of the block
    ///
    /// The block is serialized to JSON with sorted keys, so semantically
    /// identical blocks always produce the same digest.
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block as a hexadecimal string
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();

        let block_data = serde_json::json!({
            "index": self.index,
            "previous_hash": self.previous_hash,
            "proof": self.proof,
            "timestamp": self.timestamp,
            "transactions": self.transactions,
        });

        let block_string = serde_json::to_string(&block_data).unwrap();

        hasher.update(block_string.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block::new(
            2,
            vec![Transaction::new("alice", "bob", 50.0)],
            35293,
            "a".repeat(64),
        )
    }

    #[test]
    fn test_new_block() {
        let block = sample_block();

        assert_eq!(block.index, 2);
        assert_eq!(block.proof, 35293);
        assert_eq!(block.transactions.len(), 1);
        assert!(block.timestamp > 0.0);
    }

    #[test]
    fn test_hash_is_hex_digest() {
        let hash = sample_block().hash();

        assert_eq!(hash.len(), 64); // SHA-256 hash is 64 characters in hex
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let block = sample_block();

        assert_eq!(block.hash(), block.hash());
        assert_eq!(block.hash(), block.clone().hash());
    }

    #[test]
    fn test_hash_changes_when_any_field_changes() {
        let block = sample_block();
        let original = block.hash();

        let mut tampered = block.clone();
        tampered.proof += 1;
        assert_ne!(tampered.hash(), original);

        let mut tampered = block.clone();
        tampered.index += 1;
        assert_ne!(tampered.hash(), original);

        let mut tampered = block.clone();
        tampered.previous_hash = "b".repeat(64);
        assert_ne!(tampered.hash(), original);

        let mut tampered = block;
        tampered.transactions[0].amount = 51.0;
        assert_ne!(tampered.hash(), original);
    }
}
