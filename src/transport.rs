//! WebSocket transport client.
//!
//! Provides a thin request/response layer over a persistent XRPL WebSocket
//! connection: one structured JSON request out, one structured JSON response
//! back, bounded by a timeout. Retry policy does not live here; callers see
//! typed failures and decide what to do with them.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// Default time to wait for a single RPC response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Endpoint unreachable or connection dropped mid-exchange
    #[error("connection error: {0}")]
    Connection(String),

    /// No response arrived within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Response frame was not a well-formed JSON document
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A single established WebSocket connection to an XRPL node.
pub struct WsConnection {
    stream: WsStream,
}

impl WsConnection {
    /// Dial the endpoint and complete the WebSocket handshake.
    pub async fn connect(url: &str) -> TransportResult<Self> {
        debug!(url, "opening WebSocket connection");
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(Self { stream })
    }

    /// Send one JSON request and wait for one JSON response.
    ///
    /// Requests on a single connection are strictly sequential, so the next
    /// text frame from the server is the response to this request.
    pub async fn request(&mut self, payload: &Value, timeout: Duration) -> TransportResult<Value> {
        let text = payload.to_string();
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        tokio::time::timeout(timeout, self.read_response())
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }

    async fn read_response(&mut self) -> TransportResult<Value> {
        while let Some(frame) = self.stream.next().await {
            let frame = frame.map_err(|e| TransportError::Connection(e.to_string()))?;
            match frame {
                Message::Text(text) => {
                    return serde_json::from_str(&text)
                        .map_err(|e| TransportError::Protocol(format!("invalid JSON response: {e}")));
                }
                Message::Binary(bytes) => {
                    return serde_json::from_slice(&bytes)
                        .map_err(|e| TransportError::Protocol(format!("invalid JSON response: {e}")));
                }
                // tungstenite answers pings internally on the next flush
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                Message::Close(_) => {
                    return Err(TransportError::Connection(
                        "server closed the connection".to_string(),
                    ));
                }
            }
        }

        Err(TransportError::Connection(
            "connection closed before a response arrived".to_string(),
        ))
    }
}

/// Checkout/checkin pool of WebSocket connections.
///
/// Concurrent fetch tasks each borrow a connection for the duration of one
/// request/response exchange. A connection that produced any error is
/// discarded rather than returned, so the next request dials fresh instead
/// of inheriting a poisoned stream.
pub struct WsPool {
    url: String,
    request_timeout: Duration,
    idle: Mutex<Vec<WsConnection>>,
}

impl WsPool {
    /// Create a pool for the given endpoint with the default request timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a pool with an explicit per-request timeout.
    pub fn with_timeout(url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            request_timeout,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Endpoint URL this pool dials.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Configured per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Issue one request/response exchange on a pooled connection.
    pub async fn request(&self, payload: &Value) -> TransportResult<Value> {
        let mut conn = match self.idle.lock().await.pop() {
            Some(conn) => conn,
            None => WsConnection::connect(&self.url).await?,
        };

        match conn.request(payload, self.request_timeout).await {
            Ok(response) => {
                self.idle.lock().await.push(conn);
                Ok(response)
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "discarding failed connection");
                Err(e)
            }
        }
    }
}
