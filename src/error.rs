//! Error taxonomy for SDK operations.
//!
//! The SDK performs zero recovery: no retries, no reconnects, no swallowed
//! failures. Every error propagates to the caller as one of these variants.

/// Error returned by [`MintDb`](crate::MintDb) operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTP request could not be sent, or the response body could not
    /// be read or decoded by the transport.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-2xx status. The response body is
    /// preserved so callers can distinguish server rejections from
    /// transport faults.
    #[error("server returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// A payload could not be serialized, or an inbound body was not JSON.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The configured bearer token is not a legal header value.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    /// The WebSocket handshake or transport failed.
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    /// The configured connect deadline elapsed before the socket opened.
    #[error("timed out waiting for websocket connection")]
    ConnectTimeout,
    /// A send was attempted with no open WebSocket connection.
    #[error("not connected")]
    NotConnected,
}
