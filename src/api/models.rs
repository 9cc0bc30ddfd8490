use serde::{Deserialize, Serialize};

use crate::blockchain::{Block, SharedChain};
use crate::p2p::PeerRegistry;

/// Shared application state: the ledger handle and the live peer set.
#[derive(Clone)]
pub struct AppState {
    pub chain: SharedChain,
    pub peers: PeerRegistry,
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse {
    pub length: usize,
    pub chain: Vec<Block>,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
}

#[derive(Deserialize)]
pub struct MineRequest {
    #[serde(default)]
    pub data: Vec<String>,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub node: &'static str,
    pub protocol: &'static str,
}

/* ---------- Peer API Models ---------- */

#[derive(Serialize)]
pub struct PeersResponse {
    pub count: usize,
    pub peers: Vec<String>,
}

#[derive(Deserialize)]
pub struct AddPeersRequest {
    pub peers: Vec<String>,
}
