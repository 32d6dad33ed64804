//! # Client Errors
//!
//! Every failure is surfaced to the caller as-is: transport problems, server
//! error replies (verbatim), and client-side contract violations. A missing
//! key is not an error; see `Nilable`.

use skv_common::SkvError;
use thiserror::Error;

/// Result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while connecting, reading, or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// RESP2 framing or parse error.
    #[error("protocol error")]
    Protocol,
    /// Server returned an error reply.
    #[error("server error: {}", String::from_utf8_lossy(.message))]
    Server { message: Vec<u8> },
    /// Reply type did not match the expected command reply.
    #[error("unexpected response")]
    UnexpectedResponse,
    /// Pool is at capacity and no idle connections are available.
    #[error("connection pool exhausted")]
    PoolExhausted,
    /// Address could not be parsed into a socket address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// Cluster kept redirecting the request.
    #[error("too many redirects for slot {slot}")]
    TooManyRedirects { slot: u16 },
    /// Configuration file could not be parsed.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
    /// Request rejected before it reached the server.
    #[error(transparent)]
    Contract(#[from] SkvError),
}

impl ClientError {
    /// Server error text, if this is a server error reply.
    pub fn server_message(&self) -> Option<&[u8]> {
        match self {
            ClientError::Server { message } => Some(message),
            _ => None,
        }
    }

    /// True for cross-slot failures, whether detected locally or by the server.
    pub fn is_cross_slot(&self) -> bool {
        match self {
            ClientError::Contract(SkvError::CrossSlot { .. }) => true,
            ClientError::Server { message } => message.starts_with(b"CROSSSLOT"),
            _ => false,
        }
    }

    /// True when the connection that produced this error cannot be reused.
    pub(crate) fn poisons_connection(&self) -> bool {
        matches!(self, ClientError::Io(_) | ClientError::Protocol)
    }
}
