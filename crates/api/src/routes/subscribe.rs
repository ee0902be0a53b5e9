//! WebSocket subscribe endpoint
//!
//! Each upgraded connection becomes one `Session`. The write half carries
//! records; the read half is only watched for the peer going away. Client
//! messages are ignored.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use herald_tap::{RecordSink, Session, TapError};
use tracing::trace;

use crate::state::AppState;

/// GET <subscribe_path>
pub async fn subscribe_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

/// Run one subscriber session over an upgraded socket
async fn serve_socket(socket: WebSocket, state: AppState) {
    let (sender, receiver) = socket.split();
    let session = Session::new(Arc::clone(&state.broker));

    session
        .run(
            WsSink::new(sender),
            peer_closed(receiver),
            state.shutdown.clone(),
        )
        .await;
}

/// Resolves once the client closes or the connection breaks
async fn peer_closed(mut receiver: SplitStream<WebSocket>) {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Close(_)) => return,
            Ok(_) => trace!("ignoring client message"),
            Err(e) => {
                trace!(error = %e, "websocket read failed");
                return;
            }
        }
    }
}

/// Write half of a WebSocket as a record sink
pub struct WsSink {
    sender: SplitSink<WebSocket, Message>,
}

impl WsSink {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl RecordSink for WsSink {
    async fn send(&mut self, text: String) -> herald_tap::Result<()> {
        self.sender
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TapError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sender.close().await;
    }
}
