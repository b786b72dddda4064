//! Error types for the protocol engine.

use std::time::Duration;

use thiserror::Error;

use crate::types::Capability;

/// Errors that can occur while driving a session.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Connection could not be established or the server refused it
    /// in its greeting.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A send, receive, or whole-transaction timeout fired.
    ///
    /// Always fatal to the connection: framing after a timeout cannot
    /// be trusted.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Protocol violation: tag mismatch, malformed response, a command
    /// issued in the wrong state, or an overlapping transaction.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server returned BAD (the command itself was not understood).
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Server returned NO on a path that cannot report failure through
    /// a result value (e.g. a refused IDLE handshake).
    #[error("Server returned NO: {0}")]
    No(String),

    /// A required capability is not advertised by the server.
    ///
    /// Raised only under the strict incapability policy; otherwise the
    /// caller observes a boolean.
    #[error("Server lacks required capability: {0}")]
    Incapable(Capability),

    /// The server redirected the request to another location.
    ///
    /// Raised only under the strict referral policy; otherwise the
    /// targets are exposed on the failed result.
    #[error("Server referral to {0:?}")]
    Referral(Vec<String>),

    /// Authentication exchange failed locally (mechanism error).
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid session state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Whether this error invalidates wire framing and must tear the
    /// connection down.
    ///
    /// State-guard and capability errors are raised before any I/O and
    /// leave the connection usable; anything observed mid-transaction
    /// does not.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Timeout(_) | Self::Protocol(_) | Self::Bye(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
