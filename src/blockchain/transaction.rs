use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sender address recorded on mining reward transactions.
pub const REWARD_SENDER: &str = "0";

/// Amount credited to a node for each block it mines.
pub const MINING_REWARD: f64 = 1.0;

/// Represents a transfer recorded on the chain.
///
/// Addresses are opaque strings and amounts are not checked against any
/// balance. Transactions are kept in submission order within a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's address (`"0"` for the mining reward)
    pub sender: String,

    /// Recipient's address
    pub recipient: String,

    /// Amount being transferred
    pub amount: f64,
}

impl Transaction {
    /// Creates a new transaction
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `amount` - The amount to transfer
    pub fn new(sender: &str, recipient: &str, amount: f64) -> Self {
        Transaction {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction() {
        let transaction = Transaction::new("alice", "bob", 50.0);

        assert_eq!(transaction.sender, "alice");
        assert_eq!(transaction.recipient, "bob");
        assert_eq!(transaction.amount, 50.0);
    }

    #[test]
    fn test_reward_transaction_uses_sentinel_sender() {
        let transaction = Transaction::new(REWARD_SENDER, "miner-node", MINING_REWARD);

        assert_eq!(transaction.sender, "0");
        assert_eq!(transaction.amount, 1.0);
    }
}
