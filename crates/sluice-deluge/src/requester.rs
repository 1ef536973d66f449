//! The JSON-RPC call engine.
//!
//! # Design
//! - `call_once` is one wire attempt: envelope build, session headers,
//!   header absorption, HTTP status mapping. `request` layers the retry
//!   policies on top as a bounded loop with call-local state, never
//!   recursion, so concurrent calls cannot share retry bookkeeping.
//! - Two bounded retries exist: an HTTP 403 on a non-torrent method gets
//!   one session probe and one replay; a fault classified as an auth error
//!   gets one re-login and one replay. A second classified failure is
//!   surfaced as an authentication error.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::auth::AuthManager;
use crate::error::{DelugeError, DelugeResult};
use crate::session::SessionStore;
use crate::transport::Transport;
use crate::wire::{RpcRequest, RpcResponse};

/// Fixed path segment appended to the configured base URL.
const JSON_SEGMENT: &str = "json";

/// A single, retry-free RPC attempt. This is the narrow capability handed
/// to [`AuthManager`], so login traffic can never recurse into the retry
/// policies it backs.
#[async_trait]
pub trait RpcCall: Send + Sync {
    /// Perform exactly one wire call and parse the envelope.
    async fn call_once(&self, method: &str, params: Vec<Value>) -> DelugeResult<RpcResponse>;
}

/// The connection-scoped request engine.
pub struct Requester {
    transport: Arc<dyn Transport>,
    endpoint: Option<Url>,
    store: Arc<SessionStore>,
    auth: AuthManager,
}

impl Requester {
    /// Build a requester (and its embedded auth manager) for one server.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        password: &str,
        validating: bool,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let auth = AuthManager::new(password, validating, Arc::clone(&store));
        Self {
            transport,
            endpoint: join_json_endpoint(base_url),
            store,
            auth,
        }
    }

    /// The session store shared with the auth manager.
    #[must_use]
    pub fn session_store(&self) -> Arc<SessionStore> {
        Arc::clone(&self.store)
    }

    /// Ensure a live session; see [`AuthManager::login`].
    ///
    /// # Errors
    ///
    /// Propagates authentication and transport failures.
    pub async fn login(&self, silent: bool) -> DelugeResult<()> {
        self.auth.login(self, silent).await
    }

    /// Probe session validity; see [`AuthManager::check_session`].
    pub async fn check_session(&self) -> bool {
        self.auth.check_session(self).await
    }

    /// Best-effort logout; see [`AuthManager::delete_session`].
    pub async fn delete_session(&self) {
        self.auth.delete_session(self).await;
    }

    /// Issue an RPC with the full retry policy applied.
    ///
    /// An "already in session" fault is returned as a success payload;
    /// callers that add torrents treat it as the idempotent-add signal.
    ///
    /// # Errors
    ///
    /// Classified per kind: transport and HTTP failures, authentication
    /// failures after the bounded retry, generic RPC faults, and the
    /// out-of-band remote-403 marker.
    pub async fn request(&self, method: &str, params: Vec<Value>) -> DelugeResult<RpcResponse> {
        let mut retried_forbidden = false;
        let mut retried_auth = false;
        loop {
            let response = match self.call_once(method, params.clone()).await {
                Ok(response) => response,
                // A bare HTTP 403 on a non-torrent method usually means the
                // session cookie went stale; probe once and replay.
                Err(DelugeError::Http { status: 403 })
                    if !method.contains("torrent") && !retried_forbidden =>
                {
                    retried_forbidden = true;
                    debug!(method, "HTTP 403, probing session before retry");
                    self.auth.check_session(self).await;
                    continue;
                }
                Err(err) => return Err(err),
            };

            if response.is_already_in_session() {
                return Ok(response);
            }
            if let Some(fault) = &response.error {
                if AuthManager::is_auth_error(&fault.message) {
                    if retried_auth {
                        return Err(DelugeError::Authentication {
                            message: fault.message.clone(),
                        });
                    }
                    retried_auth = true;
                    debug!(method, "auth fault, re-login before retry");
                    self.store.clear().await;
                    self.auth.login(self, true).await?;
                    continue;
                }
                return Err(DelugeError::Rpc {
                    message: fault.message.clone(),
                    code: fault.code,
                });
            }
            if response.status == Some(403) {
                // Daemon-side refusal relayed out-of-band: the remote
                // content host blocked the fetch, not the Web-UI.
                return Err(DelugeError::RemoteForbidden { status: 403 });
            }
            return Ok(response);
        }
    }
}

#[async_trait]
impl RpcCall for Requester {
    async fn call_once(&self, method: &str, params: Vec<Value>) -> DelugeResult<RpcResponse> {
        let endpoint = self.endpoint.as_ref().ok_or(DelugeError::NotConfigured)?;
        let request = RpcRequest {
            method: method.to_string(),
            params,
            id: Uuid::new_v4().to_string(),
        };
        let session = self.store.snapshot().await;
        let wire = self.transport.round_trip(endpoint, &request, &session).await?;
        // Auth headers are folded in before the status check so a partly
        // successful handshake is never dropped.
        self.store.absorb(&wire).await;
        if !(200..300).contains(&wire.status) {
            return Err(DelugeError::Http {
                status: wire.status,
            });
        }
        serde_json::from_slice(&wire.body).map_err(|err| DelugeError::Decode {
            message: format!("response body is not a JSON-RPC envelope: {err}"),
        })
    }
}

/// Join the configured base URL with the fixed `json` segment, tolerating
/// bases with or without a trailing slash. Empty or unparseable input
/// yields `None`, reported as a not-configured error at call time.
fn join_json_endpoint(base_url: &str) -> Option<Url> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut url = Url::parse(trimmed).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(JSON_SEGMENT);
    Some(url)
}
