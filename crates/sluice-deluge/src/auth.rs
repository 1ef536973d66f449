//! Login, session validity, and auth-error classification.
//!
//! # Design
//! - The server has no structured auth-error code; expiry is detected by
//!   substring-matching the fault message. That classifier lives here and
//!   nowhere else.
//! - The HTTP capability arrives as a narrow [`RpcCall`] argument rather
//!   than a full requester handle, which breaks the auth/requester cycle
//!   structurally instead of through a late-bound setter.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{DelugeError, DelugeResult};
use crate::requester::RpcCall;
use crate::session::SessionStore;
use crate::wire::{AUTH_CHECK_SESSION, AUTH_DELETE_SESSION, AUTH_LOGIN};

/// Fault-message fragments that mean the session is gone.
const AUTH_ERROR_MARKERS: &[&str] = &[
    "not authenticated",
    "invalid session",
    "no session",
    "authentication required",
    "login required",
];

/// Owns the password and drives the login lifecycle for one connection.
pub struct AuthManager {
    password: String,
    validating: bool,
    store: Arc<SessionStore>,
}

impl AuthManager {
    /// Bind an auth manager to one connection's session store.
    ///
    /// `validating` marks the throwaway mode used to test unsaved
    /// credentials: every login is forced fresh and never reuses state.
    #[must_use]
    pub fn new(password: impl Into<String>, validating: bool, store: Arc<SessionStore>) -> Self {
        Self {
            password: password.into(),
            validating,
            store,
        }
    }

    /// Whether a fault message signals an expired or missing session.
    #[must_use]
    pub fn is_auth_error(message: &str) -> bool {
        let lowered = message.to_lowercase();
        AUTH_ERROR_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
    }

    /// Probe session validity. True only when the server answers exactly
    /// boolean `true`; any failure counts as invalid.
    pub async fn check_session(&self, rpc: &dyn RpcCall) -> bool {
        match rpc.call_once(AUTH_CHECK_SESSION, Vec::new()).await {
            Ok(response) => response.result == Some(Value::Bool(true)),
            Err(err) => {
                debug!(error = %err, "session check failed");
                false
            }
        }
    }

    /// Ensure a live session, logging in when necessary.
    ///
    /// Validating mode always discards any existing session and forces a
    /// fresh login. Otherwise a still-valid session short-circuits.
    ///
    /// # Errors
    ///
    /// Returns `DelugeError::Authentication` when the server rejects the
    /// password, or the underlying transport error when the call fails.
    pub async fn login(&self, rpc: &dyn RpcCall, silent: bool) -> DelugeResult<()> {
        if self.validating {
            self.delete_session(rpc).await;
        } else if !self.store.is_empty().await && self.check_session(rpc).await {
            return Ok(());
        }

        self.store.clear().await;
        let response = rpc
            .call_once(AUTH_LOGIN, vec![json!(self.password)])
            .await
            .inspect_err(|err| {
                if silent {
                    debug!(error = %err, "login request failed");
                } else {
                    warn!(error = %err, "login request failed");
                }
            })?;

        if let Some(fault) = response.error {
            return Err(DelugeError::Authentication {
                message: fault.message,
            });
        }
        if response.result == Some(Value::Bool(true)) {
            Ok(())
        } else {
            Err(DelugeError::Authentication {
                message: "server rejected the configured password".to_string(),
            })
        }
    }

    /// Best-effort server-side logout plus a local clear. Never fails:
    /// this runs opportunistically when forcing revalidation.
    pub async fn delete_session(&self, rpc: &dyn RpcCall) {
        if let Err(err) = rpc.call_once(AUTH_DELETE_SESSION, Vec::new()).await {
            debug!(error = %err, "session delete failed");
        }
        self.store.clear().await;
    }
}
