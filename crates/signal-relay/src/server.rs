//! WebSocket transport adapter for the relay hub

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use signal_core::RelayConfig;

use crate::http::handle_http_request;
use crate::hub::RelayHub;
use crate::messages::SignalMessage;

/// Largest request head inspected when choosing between HTTP and WebSocket
const MAX_REQUEST_HEAD: usize = 4096;

/// Pause between peeks while a request head is still arriving
const PEEK_RETRY: Duration = Duration::from_millis(5);

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Signal server state
#[derive(Clone)]
pub struct SignalServer {
    hub: Arc<RelayHub>,
    config: Arc<RelayConfig>,
}

impl SignalServer {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            hub: Arc::new(RelayHub::new()),
            config: Arc::new(config),
        }
    }

    /// Shared hub (for monitoring)
    pub fn hub(&self) -> Arc<RelayHub> {
        self.hub.clone()
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn serve(&self, shutdown: impl Future<Output = ()>) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        self.run(listener, shutdown).await
    }

    /// Serve connections from an already bound listener
    pub async fn run(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), std::io::Error> {
        info!("Signal relay listening on {}", listener.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        accept_backoff(&e).await;
                        continue;
                    }
                },
                _ = &mut shutdown => {
                    info!("Signal relay shutting down");
                    return Ok(());
                }
            };

            let hub = self.hub.clone();
            let config = self.config.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, hub, config).await {
                    debug!("Connection error from {}: {:?}", peer_addr, e);
                }
            });
        }
    }
}

/// Log a failed accept and pause, so fd exhaustion (EMFILE) does not spin
async fn accept_backoff(error: &std::io::Error) {
    warn!("Accept failed: {}", error);
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

/// Handle a single connection (HTTP or WebSocket)
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    hub: Arc<RelayHub>,
    config: Arc<RelayConfig>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handshake_timeout = config.handshake_timeout();

    let head = match timeout(handshake_timeout, peek_request_head(&stream)).await {
        Ok(head) => head?,
        Err(_) => {
            debug!("No request head from {} within {:?}", peer_addr, handshake_timeout);
            return Ok(());
        }
    };
    if head.is_empty() {
        return Ok(());
    }

    if !is_websocket_upgrade(&head) {
        return handle_http_request(&mut stream, &hub, config.public_dir.as_deref()).await;
    }

    let ws_stream = match timeout(handshake_timeout, accept_async(stream)).await {
        Ok(ws) => ws?,
        Err(_) => {
            debug!("WebSocket handshake from {} timed out", peer_addr);
            return Ok(());
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (peer_id, mut peer_rx) = hub.on_connect();
    debug!("WebSocket from {} registered as {}", peer_addr, peer_id);

    // Pings are answered by tungstenite itself; only relayed messages go here
    let writer = tokio::spawn(async move {
        while let Some(msg) = peer_rx.recv().await {
            let json = match msg.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to encode {} message: {}", msg.kind(), e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    while let Some(frame) = ws_receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("WebSocket error from {}: {:?}", peer_id, e);
                break;
            }
        };

        match SignalMessage::parse_frame(&text, config.max_message_bytes) {
            Ok(msg) => {
                // Rejections are logged and counted by the hub
                let _ = hub.on_message(&peer_id, msg);
            }
            Err(e) => hub.reject(&peer_id, &e),
        }
    }

    // Dropping the hub's sender ends the writer
    hub.on_disconnect(&peer_id);
    let _ = writer.await;

    debug!("Connection closed: {}", peer_id);
    Ok(())
}

/// Peek at the request head without consuming it, so the WebSocket
/// handshake or HTTP handler can still read it from the start.
///
/// Waits until the head is complete; callers bound it with a timeout.
async fn peek_request_head(stream: &TcpStream) -> Result<Vec<u8>, std::io::Error> {
    let mut buf = vec![0u8; MAX_REQUEST_HEAD];

    loop {
        let n = stream.peek(&mut buf).await?;
        let complete = buf[..n].windows(4).any(|w| w == b"\r\n\r\n");

        if n == 0 || n == buf.len() || complete {
            buf.truncate(n);
            return Ok(buf);
        }
        tokio::time::sleep(PEEK_RETRY).await;
    }
}

/// Whether the request head asks for a WebSocket upgrade
fn is_websocket_upgrade(head: &[u8]) -> bool {
    String::from_utf8_lossy(head)
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .any(|(name, value)| {
            name.trim().eq_ignore_ascii_case("upgrade")
                && value.to_ascii_lowercase().contains("websocket")
        })
}
