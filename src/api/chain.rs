use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{AppState, ChainResponse, MineRequest, ValidateResponse, VersionResponse};
use crate::blockchain::PROTOCOL_VERSION;
use crate::p2p::PeerMessage;

/// Get the full blockchain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let chain = state.chain.snapshot();
    HttpResponse::Ok().json(ChainResponse {
        length: chain.len(),
        chain,
    })
}

/// Get the most recently accepted block.
#[get("/chain/latest/")]
pub async fn get_latest(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.chain.latest())
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ValidateResponse {
        valid: state.chain.is_valid(),
        length: state.chain.len(),
    })
}

/// Mine the next block carrying the posted payload items, then
/// announce the new tip to every peer.
///
/// The nonce search is CPU-bound and unbounded, so it runs on the
/// blocking pool rather than an async worker.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>, req: web::Json<MineRequest>) -> impl Responder {
    let chain = state.chain.clone();
    let data = req.into_inner().data;

    let mined = web::block(move || chain.mine_next_block(data)).await;
    match mined {
        Ok(Some(block)) => {
            state
                .peers
                .broadcast(PeerMessage::response_chain(std::slice::from_ref(&block)));
            HttpResponse::Ok().json(block)
        }
        Ok(None) => {
            warn!("API - mined block was rejected by the ledger");
            HttpResponse::BadRequest().body("mined block was rejected")
        }
        Err(e) => {
            warn!("API - mining task failed: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Report the node build and the consensus protocol version.
#[get("/version/")]
pub async fn get_version() -> impl Responder {
    info!("API - version requested");
    HttpResponse::Ok().json(VersionResponse {
        node: env!("CARGO_PKG_VERSION"),
        protocol: PROTOCOL_VERSION,
    })
}
