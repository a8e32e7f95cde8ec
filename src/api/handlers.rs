use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Block, Blockchain, BlockchainError, HttpChainFetcher, Transaction};

/// Shared server context handed to every handler.
pub struct NodeState {
    /// The node's blockchain engine
    pub blockchain: Blockchain,

    /// Opaque identifier of this node, fixed for the process lifetime
    pub node_id: String,
}

/// Data wrapper for the node state
pub type NodeData = web::Data<NodeState>;

/// Response for the chain endpoint.
///
/// This is also the chain-exchange contract that peers consume during
/// consensus resolution.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// The length of the chain
    pub length: usize,
}

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's address
    pub sender: String,

    /// The recipient's address
    pub recipient: String,

    /// The amount to transfer
    pub amount: f64,
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,

    /// The index of the block that will include this transaction
    pub block_index: u64,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// The newly mined block
    pub block: Block,
}

/// Request for the node registration endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesRequest {
    /// Peer addresses to register, as URLs or `host:port` strings
    pub nodes: Vec<String>,
}

/// Response for the node registration endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesResponse {
    /// The message
    pub message: String,

    /// All known peers after registration
    pub total_nodes: Vec<String>,
}

/// Response for the consensus endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResolveResponse {
    /// The message
    pub message: String,

    /// Whether the local chain was replaced
    pub replaced: bool,

    /// The authoritative chain after resolution
    pub chain: Vec<Block>,
}

/// Get node information
///
/// Returns the node identifier, the current chain length, and the endpoint map
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Node information retrieved successfully")
    )
)]
pub async fn node_info(state: NodeData) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Blockchain node active",
        "node_id": state.node_id,
        "blocks": state.blockchain.len(),
        "peers": state.blockchain.peer_count(),
        "endpoints": {
            "chain": "/api/v1/chain",
            "mine": "/api/v1/mine",
            "new_transaction": "/api/v1/transactions/new",
            "pending_transactions": "/api/v1/transactions/pending",
            "register_nodes": "/api/v1/nodes/register",
            "resolve_consensus": "/api/v1/nodes/resolve"
        }
    }))
}

/// Get the full blockchain
///
/// Returns the entire chain and its length
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(state: NodeData) -> impl Responder {
    let chain = state.blockchain.blocks();

    let response = ChainResponse {
        length: chain.len(),
        chain,
    };

    HttpResponse::Ok().json(response)
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/api/v1/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_pending_transactions(state: NodeData) -> impl Responder {
    let transactions = state.blockchain.pending_transactions();
    HttpResponse::Ok().json(transactions)
}

/// Create a new transaction
///
/// Adds a new transaction to the pending pool. All three fields are required;
/// malformed payloads are rejected before they reach the engine.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/new",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully", body = TransactionResponse),
        (status = 400, description = "Missing or malformed transaction fields"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn new_transaction(
    state: NodeData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    match state.blockchain.new_transaction(
        &transaction_req.sender,
        &transaction_req.recipient,
        transaction_req.amount,
    ) {
        Ok(block_index) => {
            let response = TransactionResponse {
                message: format!("Transaction will be added to block {}", block_index),
                block_index,
            };

            HttpResponse::Created().json(response)
        }
        Err(err) => {
            error!("Failed to add transaction: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to add transaction: {}", err)
            }))
        }
    }
}

/// Mine a new block
///
/// Runs proof of work against the current tip, credits the mining reward to
/// this node, and appends the new block. The search runs on the blocking
/// thread pool so HTTP workers are not stalled.
#[utoipa::path(
    get,
    path = "/api/v1/mine",
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine(state: NodeData) -> impl Responder {
    let blockchain = state.blockchain.clone();
    let node_id = state.node_id.clone();

    let mined = web::block(move || blockchain.mine(&node_id)).await;

    match mined {
        Ok(Ok(block)) => {
            let response = MineResponse {
                message: "New block mined".to_string(),
                block,
            };

            HttpResponse::Ok().json(response)
        }
        Ok(Err(err)) => {
            error!("Failed to mine block: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to mine block: {}", err)
            }))
        }
        Err(err) => {
            error!("Mining task failed: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Mining task failed"
            }))
        }
    }
}

/// Register peer nodes
///
/// Adds the given peer addresses to the peer set. Registration is idempotent;
/// an address that canonicalizes to an already known peer is a no-op.
#[utoipa::path(
    post,
    path = "/api/v1/nodes/register",
    request_body = RegisterNodesRequest,
    responses(
        (status = 201, description = "Peers registered successfully", body = RegisterNodesResponse),
        (status = 400, description = "Missing node list or invalid address")
    )
)]
pub async fn register_nodes(
    state: NodeData,
    register_req: web::Json<RegisterNodesRequest>,
) -> impl Responder {
    if register_req.nodes.is_empty() {
        let err = BlockchainError::MalformedRequest("node list must not be empty".to_string());
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": err.to_string()
        }));
    }

    for node in &register_req.nodes {
        if let Err(err) = state.blockchain.register_peer(node) {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Failed to register node: {}", err)
            }));
        }
    }

    let response = RegisterNodesResponse {
        message: "New peers registered".to_string(),
        total_nodes: state.blockchain.peers(),
    };

    HttpResponse::Created().json(response)
}

/// Resolve consensus with peers
///
/// Queries every registered peer and adopts the longest valid chain found,
/// if any is strictly longer than the local one.
#[utoipa::path(
    get,
    path = "/api/v1/nodes/resolve",
    responses(
        (status = 200, description = "Consensus resolved", body = ResolveResponse)
    )
)]
pub async fn resolve_consensus(state: NodeData) -> impl Responder {
    let fetcher = HttpChainFetcher::new();
    let replaced = state.blockchain.resolve_conflicts(&fetcher).await;

    let message = if replaced {
        "Chain replaced"
    } else {
        "Chain is authoritative"
    };

    let response = ResolveResponse {
        message: message.to_string(),
        replaced,
        chain: state.blockchain.blocks(),
    };

    HttpResponse::Ok().json(response)
}
