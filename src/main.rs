mod api;
mod blockchain;
mod p2p;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use std::env;

use api::AppState;
use blockchain::SharedChain;
use p2p::PeerRegistry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let http_port: u16 = env::var("HTTP_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001);
    let p2p_port: u16 = env::var("P2P_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(6001);

    let chain = SharedChain::new();
    let peers = PeerRegistry::new();

    p2p::start(p2p_port, chain.clone(), peers.clone()).await?;

    // Initial peers, comma-separated; there is no discovery.
    if let Ok(initial) = env::var("PEERS") {
        for addr in initial.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            tokio::spawn(p2p::connect(
                addr.to_string(),
                chain.clone(),
                peers.clone(),
            ));
        }
    }

    println!("⛓️ Starting blockchain node at http://{host}:{http_port}");

    let state = web::Data::new(AppState { chain, peers });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), http_port))?
    .run()
    .await
}
