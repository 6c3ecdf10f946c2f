//! Minimal TCP/WebSocket listener exercising the session and registry
//! layers end to end. The framed transport's handshake details and any
//! production HTTP router are out of scope for this crate; this is enough
//! to drive a real socket in tests and in the bundled binary.

use crate::registry::SessionRegistry;
use crate::stream_adapter::handle_connection;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub async fn start_stream_server(
    addr: &str,
    registry: Arc<SessionRegistry>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "streaming endpoint listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let registry = registry.clone();
        tokio::spawn(async move {
            accept_one(stream, peer, registry).await;
        });
    }
}

async fn accept_one(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    registry: Arc<SessionRegistry>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!(%peer, error = %e, "websocket handshake failed");
            return;
        }
    };
    handle_connection(ws_stream, registry).await;
}
