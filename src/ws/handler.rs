//! WebSocket upgrade handler for relay connections

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::relay::{ConnId, RelayHub};
use crate::ws::protocol::PeerMsg;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if !state.join_limiter.check_join() {
        warn!("Relay join rate limited");
        return (StatusCode::TOO_MANY_REQUESTS, "Too many connections").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "New relay connection");

    let (ws_sink, ws_stream) = socket.split();
    let (tx, rx) = mpsc::channel::<String>(state.config.peer_buffer.max(1));

    let hub = state.hub.clone();
    let announce_to = hub.join(conn_id, tx.clone());

    // Queued before anything relayed, so the newcomer learns its id first
    let welcome = PeerMsg::Welcome {
        id: conn_id.to_string(),
    };
    if let Err(e) = queue_msg(&tx, &welcome).await {
        error!(conn_id = %conn_id, error = %e, "Failed to queue welcome");
        hub.leave(conn_id);
        return;
    }
    drop(tx);

    announce_join(&hub, conn_id, announce_to).await;

    // Run the session with split read/write
    run_session(conn_id, hub.clone(), ws_sink, ws_stream, rx).await;

    // Cleanup on disconnect
    hub.leave(conn_id);

    info!(conn_id = %conn_id, "Relay connection closed");
}

/// Tell existing peers that someone arrived
async fn announce_join(hub: &RelayHub, conn_id: ConnId, recipients: Vec<ConnId>) {
    let joined = PeerMsg::PeerJoined {
        first_to_join: false,
        id: conn_id.to_string(),
    };

    let json = match joined.to_json() {
        Ok(json) => json,
        Err(e) => {
            error!(conn_id = %conn_id, error = %e, "Failed to encode join announcement");
            return;
        }
    };

    for recipient in recipients {
        if !hub.send_to(recipient, json.clone()).await {
            debug!(conn_id = %conn_id, recipient = %recipient, "Join announcement not delivered");
        }
    }
}

/// Run the WebSocket session with read/write split
async fn run_session(
    conn_id: ConnId,
    hub: Arc<RelayHub>,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound_rx: mpsc::Receiver<String>,
) {
    // Spawn writer task: outbound queue -> WebSocket
    let writer_conn_id = conn_id;
    let writer_handle = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(text)).await {
                debug!(conn_id = %writer_conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        debug!(conn_id = %writer_conn_id, "Outbound queue closed");
    });

    // Reader loop: WebSocket -> recipients, text relayed untouched
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let delivered = hub.forward(conn_id, &text).await;
                debug!(conn_id = %conn_id, delivered, "Relayed message");
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(conn_id = %conn_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(conn_id = %conn_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task
    writer_handle.abort();
}

/// Queue a relay-originated message for one connection
async fn queue_msg(tx: &mpsc::Sender<String>, msg: &PeerMsg) -> Result<(), String> {
    let json = msg.to_json().map_err(|e| e.to_string())?;
    tx.send(json).await.map_err(|e| e.to_string())
}
