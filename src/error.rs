//! Error types for the proxy, client and data nodes.

use std::io;
use thiserror::Error;

/// Result type alias for ringkv operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ringkv.
#[derive(Error, Debug)]
pub enum Error {
    /// Key routing errors.
    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Network communication errors.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Configuration errors, surfaced at startup and not retried.
    #[error("config error: {0}")]
    Config(String),

    /// The operation timed out waiting for a reply.
    #[error("operation timed out")]
    Timeout,

    /// A data node reported a failure for an operation.
    #[error("remote error: {0}")]
    Remote(String),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Key routing errors.
#[derive(Error, Debug)]
pub enum RoutingError {
    /// The hash ring has no nodes. Fatal misconfiguration, not retried.
    #[error("hash ring is empty, no data nodes configured")]
    EmptyRing,

    /// The proxy could not resolve a node for this key.
    #[error("no node available for key hash {0:#x}")]
    NoNode(u64),
}

/// Network communication errors.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Connection failed.
    #[error("connection failed to {addr}: {reason}")]
    ConnectionFailed { addr: String, reason: String },

    /// Connection was closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Failed to send message.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Malformed or truncated wire payload.
    #[error("decode error: {0}")]
    Decode(String),

    /// Frame exceeds the maximum message size.
    #[error("message too large: {0} bytes")]
    MessageTooLarge(usize),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
