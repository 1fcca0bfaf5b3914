//! WebSocket client connecting a peer to the relay

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::ws::protocol::PeerMsg;

/// Peer connection errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to connect to relay: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Relay connection closed")]
    Closed,
}

/// Live connection to the relay.
///
/// Outgoing messages are queued without bound and written in order by a
/// background task; a dropped message would desynchronize the match.
/// Incoming messages are parsed by a reader task and handed over through
/// a channel that the game loop drains once per tick.
pub struct PeerLink {
    outgoing: mpsc::UnboundedSender<PeerMsg>,
    incoming: mpsc::UnboundedReceiver<PeerMsg>,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
}

impl PeerLink {
    /// Connect to the relay at `url`
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        info!(url = %url, "Connecting to relay");
        let (ws_stream, _) = connect_async(url).await?;
        info!("Relay connected");

        let (mut write, mut read) = ws_stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<PeerMsg>();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel::<PeerMsg>();

        // Spawn reader task
        let reader_handle = tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => match PeerMsg::from_json(&text) {
                        Ok(msg) => {
                            debug!(kind = msg.kind(), "Received peer message");
                            if incoming_tx.send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to parse peer message, ignoring");
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("Relay closed connection");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "WebSocket read error");
                        break;
                    }
                    _ => {}
                }
            }
            debug!("Reader task ended");
        });

        // Spawn writer task
        let writer_handle = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let json = match msg.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        error!(error = %e, "Failed to encode peer message");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json)).await {
                    error!(error = %e, "Failed to send message");
                    break;
                }
            }
            let _ = write.close().await;
            debug!("Writer task ended");
        });

        Ok(Self {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
            reader_handle,
            writer_handle,
        })
    }

    /// Queue a message for the relay
    pub fn send(&self, msg: PeerMsg) -> Result<(), ClientError> {
        self.outgoing.send(msg).map_err(|_| ClientError::Closed)
    }

    /// Everything received since the last poll, in arrival order.
    /// Fails only once the connection is gone and nothing is left to read.
    pub fn poll_incoming(&mut self) -> Result<Vec<PeerMsg>, ClientError> {
        let mut messages = Vec::new();
        loop {
            match self.incoming.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if messages.is_empty() {
                        return Err(ClientError::Closed);
                    }
                    break;
                }
            }
        }
        Ok(messages)
    }

    /// Wait for the next message
    pub async fn recv(&mut self) -> Option<PeerMsg> {
        self.incoming.recv().await
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.reader_handle.abort();
        self.writer_handle.abort();
    }
}
