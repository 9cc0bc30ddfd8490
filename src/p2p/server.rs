use log::{info, warn};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::blockchain::SharedChain;
use super::message::PeerMessage;
use super::registry::PeerRegistry;
use super::sync;

/// Bind the p2p listener and spawn its accept loop.
///
/// Returns the bound address (useful with port 0). Failing to bind is
/// the one fatal error in the networking layer; everything after this
/// point only ever drops individual peers.
pub async fn start(
    port: u16,
    chain: SharedChain,
    peers: PeerRegistry,
) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    let addr = listener.local_addr()?;
    info!("P2P - listening on {addr}");
    tokio::spawn(accept_loop(listener, chain, peers));
    Ok(addr)
}

async fn accept_loop(listener: TcpListener, chain: SharedChain, peers: PeerRegistry) {
    loop {
        match listener.accept().await {
            Ok((stream, remote)) => {
                info!("P2P - inbound connection from {remote}");
                spawn_connection(stream, remote.to_string(), chain.clone(), peers.clone());
            }
            Err(e) => warn!("P2P - accept failed: {e}"),
        }
    }
}

/// Dial a remote peer. A failed dial is logged and forgotten; the
/// core never retries (reconnection policy lives outside it).
pub async fn connect(addr: String, chain: SharedChain, peers: PeerRegistry) {
    match TcpStream::connect(&addr).await {
        Ok(stream) => {
            info!("P2P - connected to {addr}");
            spawn_connection(stream, addr, chain, peers);
        }
        Err(e) => warn!("P2P - connection to {addr} failed: {e}"),
    }
}

/// Wire up one live connection: a writer task draining the peer's
/// outbound queue and a reader task feeding inbound messages to the
/// sync handler. Either side failing tears the peer down.
///
/// Framing is one JSON message per line.
fn spawn_connection(stream: TcpStream, addr: String, chain: SharedChain, peers: PeerRegistry) {
    let (tx, mut rx) = mpsc::unbounded_channel::<PeerMessage>();
    let peer_id = peers.register(addr.clone(), tx);
    let (read_half, mut write_half) = stream.into_split();

    let writer_peers = peers.clone();
    let writer_addr = addr.clone();
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let mut line = serde_json::to_string(&msg).expect("message serialize");
            line.push('\n');
            if let Err(e) = write_half.write_all(line.as_bytes()).await {
                warn!("P2P - write to {writer_addr} failed: {e}");
                break;
            }
        }
        writer_peers.deregister(peer_id);
    });

    let reader_peers = peers.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match serde_json::from_str::<PeerMessage>(&line) {
                    Ok(msg) => sync::handle_message(&chain, &reader_peers, peer_id, msg),
                    Err(e) => warn!("P2P - malformed message from {addr}: {e}"),
                },
                Ok(None) => {
                    info!("P2P - {addr} closed the connection");
                    break;
                }
                Err(e) => {
                    warn!("P2P - read from {addr} failed: {e}");
                    break;
                }
            }
        }
        reader_peers.deregister(peer_id);
    });

    // A fresh peer is immediately asked for its tip.
    peers.send(peer_id, PeerMessage::query_latest());
}
