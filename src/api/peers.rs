use actix_web::{HttpResponse, Responder, get, post, web};
use log::info;

use super::models::{AddPeersRequest, AppState, PeersResponse};
use crate::p2p;

/// List the remote addresses of all live peer connections.
#[get("/peers/")]
pub async fn get_peers(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(PeersResponse {
        count: state.peers.len(),
        peers: state.peers.addresses(),
    })
}

/// Dial the given peer addresses. There is no peer discovery, so this
/// is how a node learns about the rest of the network.
#[post("/peers/")]
pub async fn add_peers(state: web::Data<AppState>, req: web::Json<AddPeersRequest>) -> impl Responder {
    let addrs = req.into_inner().peers;
    info!("API - dialing {} peer(s)", addrs.len());
    for addr in addrs {
        tokio::spawn(p2p::connect(
            addr,
            state.chain.clone(),
            state.peers.clone(),
        ));
    }
    HttpResponse::Ok().finish()
}
