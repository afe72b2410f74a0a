use std::fmt;

use tandem_transport::TransportError;
use tandem_wire::{DataType, WireError};

/// Public message sent to peers when a failure carries no explicit one.
pub const DEFAULT_PUBLIC_ERROR_MESSAGE: &str = "internal server error";

/// Public message sent when a request names no registered handler.
pub const MISSING_HANDLER_MESSAGE: &str = "missing request handler";

/// Errors that can occur in peer operations.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Envelope-level error. Fatal to the read loop that produced it.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// The peer answered with an error response; carries its public message.
    #[error("peer error: {0}")]
    Remote(String),

    /// Failed to encode a payload with the selected codec.
    #[error("failed to encode {encoding} payload: {detail}")]
    Encode { encoding: DataType, detail: String },

    /// Failed to decode a payload with the selected codec.
    #[error("failed to decode {encoding} payload: {detail}")]
    Decode { encoding: DataType, detail: String },

    /// The response payload encoding does not match the request's codec.
    #[error("response carries {got} data but {expected} was expected")]
    DecodeMismatch { expected: DataType, got: DataType },

    /// The response carries data but the caller supplied no result slot.
    #[error("response carries {len} bytes but no result was expected")]
    UnexpectedResult { len: usize },

    /// The recycled request id is still outstanding on this connection.
    #[error("request id {req_id} is still in flight (id space exhausted)")]
    RequestIdInFlight { req_id: u32 },

    /// The connection closed before the response arrived.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer sent reserved `Message` content, which is not supported.
    #[error("reserved message content is not supported")]
    MessageUnsupported,
}

pub type Result<T> = std::result::Result<T, RpcError>;

/// Error returned by request handlers.
///
/// Only the public message ever reaches the peer; the detail stays local
/// and is logged by the dispatch path.
#[derive(Debug)]
pub struct HandlerError {
    public: Option<String>,
    detail: String,
}

impl HandlerError {
    /// An error whose message is safe to send to the peer.
    pub fn public(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            detail: message.clone(),
            public: Some(message),
        }
    }

    /// An internal error; the peer sees [`DEFAULT_PUBLIC_ERROR_MESSAGE`].
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            public: None,
            detail: detail.into(),
        }
    }

    /// Attach a public message to an internal error.
    pub fn with_public(mut self, message: impl Into<String>) -> Self {
        self.public = Some(message.into());
        self
    }

    /// The sanitized message sent to the peer.
    pub fn public_message(&self) -> &str {
        self.public.as_deref().unwrap_or(DEFAULT_PUBLIC_ERROR_MESSAGE)
    }

    /// Full local-only detail.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

impl std::error::Error for HandlerError {}

impl From<String> for HandlerError {
    fn from(detail: String) -> Self {
        Self::internal(detail)
    }
}

impl From<&str> for HandlerError {
    fn from(detail: &str) -> Self {
        Self::internal(detail)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(err.to_string())
    }
}
