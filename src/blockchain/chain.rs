use std::sync::{Arc, Mutex};

use log::{info, warn};
use thiserror::Error;

use super::block::{Block, GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
use super::peer::PeerSet;
use super::pow;
use super::transaction::{Transaction, MINING_REWARD, REWARD_SENDER};

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Invalid peer address: {0}")]
    InvalidAddress(String),

    #[error("Chain has no blocks")]
    EmptyChain,

    #[error("Peer unavailable: {0}")]
    PeerUnavailable(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

/// Represents the blockchain held by a single node.
///
/// The chain, the pending transaction pool, and the peer set are the only
/// shared mutable state; each is guarded by its own lock so that the
/// transport layer can invoke mining, submission, and reads concurrently.
/// Cloning is cheap and yields a handle to the same node state.
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks
    chain: Arc<Mutex<Vec<Block>>>,

    /// Pending transactions to be included in the next block
    pending_transactions: Arc<Mutex<Vec<Transaction>>>,

    /// Known peer nodes
    peers: PeerSet,
}

impl Blockchain {
    /// Creates a new blockchain with a genesis block
    ///
    /// # Returns
    ///
    /// A new Blockchain instance holding exactly one block
    pub fn new() -> Self {
        let blockchain = Blockchain {
            chain: Arc::new(Mutex::new(Vec::new())),
            pending_transactions: Arc::new(Mutex::new(Vec::new())),
            peers: PeerSet::new(),
        };

        blockchain.new_block(GENESIS_PROOF, Some(GENESIS_PREVIOUS_HASH.to_string()));
        info!("Genesis block created, chain initialized with 1 block");

        blockchain
    }

    /// Creates a new block from the pending transactions and appends it
    ///
    /// The pool is drained into the block, not copied. No validation is
    /// performed at append time: a node trusts its own mining, and only
    /// chains obtained from peers go through [`Blockchain::valid_chain`].
    ///
    /// # Arguments
    ///
    /// * `proof` - The proof of work for the new block
    /// * `previous_hash` - The hash of the previous block; when `None`, the
    ///   hash of the current tip is recomputed and used
    ///
    /// # Returns
    ///
    /// The newly appended block
    pub fn new_block(&self, proof: u64, previous_hash: Option<String>) -> Block {
        let mut chain = self.chain.lock().unwrap();
        let mut pending = self.pending_transactions.lock().unwrap();

        let previous_hash = previous_hash.unwrap_or_else(|| {
            chain
                .last()
                .expect("a block before genesis must carry an explicit previous hash")
                .hash()
        });

        let block = Block::new(
            chain.len() as u64 + 1,
            std::mem::take(&mut *pending),
            proof,
            previous_hash,
        );
        chain.push(block.clone());

        info!("Block {} added to the chain", block.index);
        block
    }

    /// Adds a new transaction to the pending pool
    ///
    /// Sender, recipient, and amount are recorded as given; no balance or
    /// format checks are performed.
    ///
    /// # Returns
    ///
    /// Result with the index of the block that will include this transaction
    pub fn new_transaction(
        &self,
        sender: &str,
        recipient: &str,
        amount: f64,
    ) -> Result<u64, BlockchainError> {
        let next_index = self.last_block()?.index + 1;

        self.pending_transactions
            .lock()
            .unwrap()
            .push(Transaction::new(sender, recipient, amount));

        Ok(next_index)
    }

    /// Gets the last block in the chain
    ///
    /// # Returns
    ///
    /// Result with the last block; `EmptyChain` if no genesis block exists,
    /// which is unreachable through the public constructor
    pub fn last_block(&self) -> Result<Block, BlockchainError> {
        let chain = self.chain.lock().unwrap();
        chain.last().cloned().ok_or(BlockchainError::EmptyChain)
    }

    /// Gets a snapshot of the entire chain
    pub fn blocks(&self) -> Vec<Block> {
        self.chain.lock().unwrap().clone()
    }

    /// Gets the current chain length
    pub fn len(&self) -> usize {
        self.chain.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.lock().unwrap().is_empty()
    }

    /// Gets all pending transactions
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.pending_transactions.lock().unwrap().clone()
    }

    /// Registers a peer node, returning its canonical form
    pub fn register_peer(&self, address: &str) -> Result<String, BlockchainError> {
        self.peers.register(address)
    }

    /// Gets all known peers
    pub fn peers(&self) -> Vec<String> {
        self.peers.all()
    }

    /// Gets the number of known peers
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Mines a new block on top of the current tip
    ///
    /// The tip's proof and hash are read once; the proof search then runs
    /// without holding the chain lock, so other operations proceed while the
    /// search is underway. Once a proof is found, the mining reward is
    /// credited to `miner_id` and the block is appended.
    ///
    /// # Arguments
    ///
    /// * `miner_id` - The identifier of this node, credited with the reward
    ///
    /// # Returns
    ///
    /// Result with the newly mined block
    pub fn mine(&self, miner_id: &str) -> Result<Block, BlockchainError> {
        let tip = self.last_block()?;
        let tip_hash = tip.hash();

        info!("Running proof of work on top of block {}", tip.index);
        let proof = pow::find_proof(tip.proof, &tip_hash);

        self.new_transaction(REWARD_SENDER, miner_id, MINING_REWARD)?;

        Ok(self.new_block(proof, Some(tip_hash)))
    }

    /// Verifies the validity of a candidate chain
    ///
    /// Walks the chain from the genesis anchor and, for every adjacent pair,
    /// checks that the stored previous hash matches the recomputed hash of
    /// the predecessor and that the proof of work holds. The hash is always
    /// recomputed from the predecessor's fields, so a tampered block breaks
    /// the link. The genesis block itself is never independently validated.
    ///
    /// # Arguments
    ///
    /// * `chain` - The candidate chain to validate
    ///
    /// # Returns
    ///
    /// true if every link in the chain is valid
    pub fn valid_chain(chain: &[Block]) -> bool {
        let mut previous = match chain.first() {
            Some(block) => block,
            None => return false,
        };

        for block in &chain[1..] {
            let previous_hash = previous.hash();

            if block.previous_hash != previous_hash {
                warn!("Previous hash mismatch at block {}", block.index);
                return false;
            }

            if !pow::valid_proof(previous.proof, block.proof, &previous_hash) {
                warn!("Invalid proof of work at block {}", block.index);
                return false;
            }

            previous = block;
        }

        true
    }

    /// Replaces the chain wholesale with one adopted through consensus
    pub(crate) fn replace_chain(&self, new_chain: Vec<Block>) {
        *self.chain.lock().unwrap() = new_chain;
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_blockchain_has_genesis_block() {
        let blockchain = Blockchain::new();
        let chain = blockchain.blocks();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].index, 1);
        assert_eq!(chain[0].proof, GENESIS_PROOF);
        assert_eq!(chain[0].previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(chain[0].transactions.is_empty());
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_new_transaction_returns_next_block_index() {
        let blockchain = Blockchain::new();

        let index = blockchain.new_transaction("alice", "bob", 50.0).unwrap();

        assert_eq!(index, 2);
        assert_eq!(blockchain.pending_transactions().len(), 1);
    }

    #[test]
    fn test_mine_includes_pending_and_reward_transactions() {
        let blockchain = Blockchain::new();
        blockchain.new_transaction("alice", "bob", 50.0).unwrap();

        let block = blockchain.mine("node-id").unwrap();

        assert_eq!(block.index, 2);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0].sender, "alice");
        assert_eq!(block.transactions[1].sender, REWARD_SENDER);
        assert_eq!(block.transactions[1].recipient, "node-id");
        assert_eq!(block.transactions[1].amount, MINING_REWARD);

        // The pool is drained into the block, not copied.
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_mined_block_links_to_previous_block() {
        let blockchain = Blockchain::new();
        let genesis = blockchain.last_block().unwrap();

        let block = blockchain.mine("node-id").unwrap();

        assert_eq!(block.previous_hash, genesis.hash());
        assert!(pow::valid_proof(genesis.proof, block.proof, &block.previous_hash));
    }

    #[test]
    fn test_locally_mined_chains_are_valid() {
        let blockchain = Blockchain::new();
        blockchain.new_transaction("alice", "bob", 50.0).unwrap();
        blockchain.mine("node-id").unwrap();
        blockchain.mine("node-id").unwrap();

        assert!(Blockchain::valid_chain(&blockchain.blocks()));
    }

    #[test]
    fn test_tampered_chain_is_rejected() {
        let blockchain = Blockchain::new();
        blockchain.new_transaction("alice", "bob", 50.0).unwrap();
        blockchain.mine("node-id").unwrap();
        blockchain.mine("node-id").unwrap();

        let mut tampered = blockchain.blocks();
        tampered[1].transactions[0].amount = 5000.0;

        assert!(!Blockchain::valid_chain(&tampered));
    }

    #[test]
    fn test_chain_with_invalid_proof_is_rejected() {
        let blockchain = Blockchain::new();
        blockchain.mine("node-id").unwrap();

        let mut tampered = blockchain.blocks();
        tampered[1].proof += 1;

        assert!(!Blockchain::valid_chain(&tampered));
    }

    #[test]
    fn test_empty_candidate_chain_is_rejected() {
        assert!(!Blockchain::valid_chain(&[]));
    }
}
