use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::block::Block;
use super::chain::{Blockchain, BlockchainError};

/// How many peers are queried at once during a resolution pass.
const MAX_CONCURRENT_FETCHES: usize = 8;

/// Per-peer request timeout. A hung peer must not stall the pass.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// A peer's full chain together with its reported length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteChain {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// Transport seam used by consensus resolution to obtain a peer's chain.
///
/// The production implementation is [`HttpChainFetcher`]; tests substitute
/// their own. Futures are not required to be `Send` so that single-threaded
/// HTTP clients can implement the trait.
#[async_trait(?Send)]
pub trait ChainFetcher {
    async fn fetch(&self, peer: &str) -> Result<RemoteChain, BlockchainError>;
}

/// Fetches peer chains over HTTP.
///
/// Speaks the chain-exchange contract: `GET http://{peer}/api/v1/chain`
/// returning the peer's blocks and length as two named fields. Any transport
/// failure or non-success status is reported as `PeerUnavailable`.
pub struct HttpChainFetcher {
    client: awc::Client,
}

impl HttpChainFetcher {
    pub fn new() -> Self {
        HttpChainFetcher {
            client: awc::Client::builder().timeout(FETCH_TIMEOUT).finish(),
        }
    }
}

impl Default for HttpChainFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch(&self, peer: &str) -> Result<RemoteChain, BlockchainError> {
        let url = format!("http://{}/api/v1/chain", peer);

        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| BlockchainError::PeerUnavailable(format!("{}: {}", peer, err)))?;

        if !response.status().is_success() {
            return Err(BlockchainError::PeerUnavailable(format!(
                "{}: status {}",
                peer,
                response.status()
            )));
        }

        response
            .json::<RemoteChain>()
            .await
            .map_err(|err| BlockchainError::PeerUnavailable(format!("{}: {}", peer, err)))
    }
}

impl Blockchain {
    /// Resolves conflicts with peer nodes using the longest-chain rule
    ///
    /// Every registered peer is queried (concurrently, with a bounded
    /// window); a peer failure only skips that peer. A candidate chain is
    /// adopted only if its reported length strictly exceeds the best length
    /// seen so far and the whole chain validates. Ties keep the local chain.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - The transport used to obtain peer chains
    ///
    /// # Returns
    ///
    /// true if the local chain was replaced
    pub async fn resolve_conflicts<F: ChainFetcher>(&self, fetcher: &F) -> bool {
        let peers = self.peers();
        let mut max_length = self.len();
        let mut new_chain: Option<Vec<Block>> = None;

        info!("Checking consensus against {} peer(s)", peers.len());

        let mut responses = stream::iter(peers)
            .map(|peer| async move {
                let result = fetcher.fetch(&peer).await;
                (peer, result)
            })
            .buffer_unordered(MAX_CONCURRENT_FETCHES);

        while let Some((peer, result)) = responses.next().await {
            match result {
                Ok(remote) => {
                    if remote.length > max_length && Blockchain::valid_chain(&remote.chain) {
                        info!(
                            "Longer valid chain found at {}: {} blocks",
                            peer, remote.length
                        );
                        max_length = remote.length;
                        new_chain = Some(remote.chain);
                    }
                }
                Err(err) => {
                    warn!("Skipping peer during consensus: {}", err);
                }
            }
        }

        match new_chain {
            Some(chain) => {
                self.replace_chain(chain);
                info!("Chain replaced by consensus");
                true
            }
            None => {
                info!("Local chain is authoritative");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::super::transaction::Transaction;
    use super::*;

    /// Serves canned chains; unknown peers report as unavailable.
    struct StaticFetcher {
        chains: HashMap<String, RemoteChain>,
    }

    impl StaticFetcher {
        fn new() -> Self {
            StaticFetcher {
                chains: HashMap::new(),
            }
        }

        fn with_chain(mut self, peer: &str, chain: Vec<Block>) -> Self {
            let length = chain.len();
            self.chains
                .insert(peer.to_string(), RemoteChain { chain, length });
            self
        }
    }

    #[async_trait(?Send)]
    impl ChainFetcher for StaticFetcher {
        async fn fetch(&self, peer: &str) -> Result<RemoteChain, BlockchainError> {
            self.chains
                .get(peer)
                .cloned()
                .ok_or_else(|| BlockchainError::PeerUnavailable(peer.to_string()))
        }
    }

    fn mined_chain(blocks: usize) -> Vec<Block> {
        let blockchain = Blockchain::new();
        for _ in 1..blocks {
            blockchain.mine("peer-node").unwrap();
        }
        blockchain.blocks()
    }

    #[actix_web::test]
    async fn test_longer_valid_chain_is_adopted() {
        let blockchain = Blockchain::new();
        blockchain.mine("local-node").unwrap();
        blockchain.register_peer("peer-b:5000").unwrap();

        let fetcher = StaticFetcher::new().with_chain("peer-b:5000", mined_chain(5));

        let replaced = blockchain.resolve_conflicts(&fetcher).await;

        assert!(replaced);
        assert_eq!(blockchain.len(), 5);
    }

    #[actix_web::test]
    async fn test_longer_invalid_chain_is_rejected() {
        let blockchain = Blockchain::new();
        blockchain.mine("local-node").unwrap();
        blockchain.register_peer("peer-b:5000").unwrap();

        let mut forged = mined_chain(5);
        forged[2].transactions.push(Transaction::new("0", "forger", 1000.0));

        let fetcher = StaticFetcher::new().with_chain("peer-b:5000", forged);
        let before = blockchain.blocks();

        let replaced = blockchain.resolve_conflicts(&fetcher).await;

        assert!(!replaced);
        assert_eq!(blockchain.blocks(), before);
    }

    #[actix_web::test]
    async fn test_unavailable_peer_is_skipped() {
        let blockchain = Blockchain::new();
        blockchain.register_peer("peer-down:5000").unwrap();
        blockchain.register_peer("peer-up:5001").unwrap();

        let fetcher = StaticFetcher::new().with_chain("peer-up:5001", mined_chain(3));

        let replaced = blockchain.resolve_conflicts(&fetcher).await;

        assert!(replaced);
        assert_eq!(blockchain.len(), 3);
    }

    #[actix_web::test]
    async fn test_equal_length_keeps_local_chain() {
        let blockchain = Blockchain::new();
        blockchain.mine("local-node").unwrap();
        blockchain.register_peer("peer-b:5000").unwrap();

        let fetcher = StaticFetcher::new().with_chain("peer-b:5000", mined_chain(2));
        let before = blockchain.blocks();

        let replaced = blockchain.resolve_conflicts(&fetcher).await;

        assert!(!replaced);
        assert_eq!(blockchain.blocks(), before);
    }
}
