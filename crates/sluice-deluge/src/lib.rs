//! Client engine for the Deluge Web-UI JSON endpoint.
//!
//! The Web-UI is a proxy in front of one or more backend daemons: callers
//! authenticate against its cookie/CSRF session model, make sure the proxy
//! itself holds a daemon connection, and only then submit torrents. This
//! crate owns that whole sequence and absorbs the cross-version quirks of
//! the server API (magnet vs URL add methods, 2-arg vs 3-arg signatures,
//! array vs object plugin lists, three competing label RPCs).
//!
//! Layout:
//! - `wire`: JSON-RPC envelope, method names, per-RPC decode helpers
//! - `transport`: the HTTP seam (`Transport` trait + reqwest impl)
//! - `session`: cookie/CSRF state with a single mutation entry point
//! - `auth`: login, session checks, auth-error classification
//! - `requester`: the call engine with bounded 403/auth retries
//! - `daemon`: host discovery and the per-host connect state machine
//! - `plugins`: plugin discovery, label fallback chain, post-add options
//! - `torrents`: magnet/URL/file submission
//! - `connection`: per-server composition and the public contract

mod auth;
mod connection;
mod daemon;
mod error;
mod plugins;
mod requester;
mod session;
#[cfg(test)]
mod testing;
mod torrents;
mod transport;
pub mod wire;

pub use auth::AuthManager;
pub use connection::{ConnectionManager, ServerLink};
pub use daemon::{DaemonHost, DaemonInfo, DaemonManager};
pub use error::{DelugeError, DelugeResult};
pub use plugins::{PluginInfo, PluginManager, PluginOptions};
pub use requester::{Requester, RpcCall};
pub use session::{Session, SessionStore};
pub use torrents::{AddOutcome, TorrentOptions, TorrentSubmitter, TorrentSummary};
pub use transport::{HttpTransport, Transport, WireResponse, DEFAULT_TIMEOUT};
