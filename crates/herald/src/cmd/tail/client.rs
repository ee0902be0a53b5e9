//! Subscribe client - connects to a Herald server over WebSocket

use anyhow::{Context, Result};
use futures_util::StreamExt;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Client for the subscribe endpoint
pub struct SubscribeClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl SubscribeClient {
    /// Connect to the subscribe endpoint at `url`
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _response) = connect_async(url)
            .await
            .with_context(|| format!("failed to connect to {url}"))?;

        Ok(Self { stream })
    }

    /// Receive the next record from the server
    ///
    /// Returns `Ok(None)` if the connection is closed.
    pub async fn recv(&mut self) -> Result<Option<Value>> {
        while let Some(message) = self.stream.next().await {
            match message.context("failed to read from server")? {
                Message::Text(text) => {
                    let record =
                        serde_json::from_str(text.as_str()).context("failed to decode record")?;
                    return Ok(Some(record));
                }
                Message::Close(_) => return Ok(None),
                // Pings are answered by the transport
                _ => continue,
            }
        }
        Ok(None)
    }

    /// Close the connection, ignoring errors
    pub async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
