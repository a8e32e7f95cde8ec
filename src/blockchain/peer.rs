use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use log::info;
use url::Url;

use super::chain::BlockchainError;

/// Set of known peer nodes, stored as canonical `host:port` strings.
///
/// Membership is purely additive: peers are never removed, and a failed query
/// during consensus resolution does not evict the peer. Registration is
/// idempotent, so any syntactic variant that canonicalizes to the same
/// location counts as the same peer.
#[derive(Debug, Clone, Default)]
pub struct PeerSet {
    nodes: Arc<Mutex<HashSet<String>>>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalizes and records a peer address
    ///
    /// # Arguments
    ///
    /// * `address` - The peer location, either a URL (`http://host:port`) or a
    ///   bare `host:port` form
    ///
    /// # Returns
    ///
    /// Result with the canonical form under which the peer was recorded
    pub fn register(&self, address: &str) -> Result<String, BlockchainError> {
        let canonical = canonicalize(address)?;

        let mut nodes = self.nodes.lock().unwrap();
        if nodes.insert(canonical.clone()) {
            info!("Peer registered: {}", canonical);
        }

        Ok(canonical)
    }

    /// Returns all known peers in a stable order
    pub fn all(&self) -> Vec<String> {
        let nodes = self.nodes.lock().unwrap();
        let mut peers: Vec<String> = nodes.iter().cloned().collect();
        peers.sort();
        peers
    }

    /// Returns the number of known peers
    pub fn len(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.lock().unwrap().is_empty()
    }
}

/// Reduces a peer address to its `host:port` network location.
///
/// URL forms keep their authority component; a bare `host:port` string is
/// accepted as-is. Anything without a usable network location is rejected.
fn canonicalize(address: &str) -> Result<String, BlockchainError> {
    if let Ok(url) = Url::parse(address) {
        if let Some(host) = url.host_str() {
            return Ok(match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            });
        }
        // "localhost:5001" parses as scheme "localhost" with no host; fall
        // through and treat it as a bare location.
    }

    let bare = address.trim();
    if !bare.is_empty() && !bare.contains('/') && !bare.contains(char::is_whitespace) {
        return Ok(bare.to_string());
    }

    Err(BlockchainError::InvalidAddress(address.to_string()))
}
