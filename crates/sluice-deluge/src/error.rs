//! Error types for the Deluge client engine.
//!
//! # Design
//! - One enum whose variants map onto the failure kinds callers branch on:
//!   transport, authentication, daemon, server configuration, torrent.
//! - Keep messages constant; operational context lives in fields.
//! - Conditions the engine absorbs (missing labels, one host down, a
//!   torrent already in the session) never appear here.

use std::error::Error;

use thiserror::Error;

/// Primary error type for Deluge client operations.
#[derive(Debug, Error)]
pub enum DelugeError {
    /// The HTTP transport failed before a response arrived.
    #[error("network request failed: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },
    /// The HTTP request exceeded its time budget.
    #[error("request timed out")]
    Timeout,
    /// The server answered with a non-success HTTP status.
    #[error("server returned HTTP {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },
    /// No server URL is configured for this connection.
    #[error("no Deluge server configured")]
    NotConfigured,
    /// No connection exists at the requested server index.
    #[error("no server configured at index {index}")]
    NoSuchServer {
        /// Requested server index.
        index: usize,
    },
    /// Login was rejected or the session stayed invalid after a retry.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Description of the authentication failure.
        message: String,
    },
    /// Every attached daemon host failed to connect.
    #[error("failed to connect to any daemon")]
    Daemon {
        /// Last per-host failure, when one was recorded.
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    /// A daemon host reported a status the engine does not recognize.
    #[error("unexpected daemon status '{status}'")]
    UnknownDaemonStatus {
        /// The unrecognized status string.
        status: String,
    },
    /// The server configuration could not be fetched.
    #[error("{message}")]
    ServerConfig {
        /// Actionable description of the configuration failure.
        message: String,
    },
    /// The remote content host (not Deluge) refused to serve the torrent.
    #[error("remote server denied access (HTTP {status})")]
    RemoteForbidden {
        /// HTTP-like status reported by the daemon.
        status: u16,
    },
    /// The daemon does not support the URI scheme of the submitted source.
    #[error("unsupported torrent source scheme")]
    UnsupportedScheme {
        /// The submitted source, for diagnostics.
        source_uri: String,
    },
    /// The daemon accepted the call but refused to add the torrent.
    #[error("server refused the torrent: {message}")]
    AddRejected {
        /// Server-supplied reason, when one was given.
        message: String,
    },
    /// The server reported a generic RPC fault.
    #[error("server error: {message}")]
    Rpc {
        /// Server-supplied error message.
        message: String,
        /// Server-supplied error code.
        code: i64,
    },
    /// A response body did not decode as the expected shape.
    #[error("malformed server response: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },
}

/// Convenience alias for Deluge client results.
pub type DelugeResult<T> = Result<T, DelugeError>;

impl DelugeError {
    /// Whether this error represents a 403-flavored refusal, either at the
    /// HTTP layer or via the daemon's out-of-band status marker.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(
            self,
            Self::Http { status: 403 } | Self::RemoteForbidden { status: 403 }
        )
    }
}
