//! Per-connection authentication state.
//!
//! # Design
//! - `Session` is a plain value with exactly one mutation entry point
//!   (`absorb`) and one reset (`clear`), so every state change is
//!   auditable in isolation.
//! - `SessionStore` wraps the value in an async mutex; one store exists
//!   per server connection and is shared by the requester and the auth
//!   manager. Sessions are never shared across connections.

use tokio::sync::Mutex;

use crate::transport::WireResponse;

/// Cookie name the Web-UI issues for its session.
const SESSION_COOKIE_NAME: &str = "_session_id";

/// Cookie/CSRF state for one Web-UI session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookie: Option<String>,
    session_id: Option<String>,
    csrf_token: Option<String>,
}

impl Session {
    /// Fold one response's auth headers into the session.
    ///
    /// Called on every response before its status is evaluated, so a
    /// partially successful handshake is never lost.
    pub fn absorb(&mut self, response: &WireResponse) {
        if let Some(raw) = response.set_cookie.as_deref() {
            // Keep only the name=value pair; attributes like Expires are
            // server-side concerns.
            if let Some(pair) = raw.split(';').next() {
                let pair = pair.trim();
                if !pair.is_empty() {
                    self.cookie = Some(pair.to_string());
                    if let Some((name, value)) = pair.split_once('=')
                        && name.trim() == SESSION_COOKIE_NAME
                    {
                        self.session_id = Some(value.trim().to_string());
                    }
                }
            }
        }
        if let Some(token) = response.csrf_token.as_deref() {
            if !token.is_empty() {
                self.csrf_token = Some(token.to_string());
            }
        }
    }

    /// The `Cookie` request header for this session: the full stored
    /// cookie when available, else one synthesized from the bare id.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if let Some(cookie) = &self.cookie {
            return Some(cookie.clone());
        }
        self.session_id
            .as_ref()
            .map(|id| format!("{SESSION_COOKIE_NAME}={id}"))
    }

    /// The CSRF token to echo on requests, when one has been issued.
    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Whether any authentication artifact is held.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cookie.is_none() && self.session_id.is_none() && self.csrf_token.is_none()
    }

    /// Drop all three artifacts at once. A partial clear is not a valid
    /// state, so this is the only way to forget anything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Shared, connection-scoped holder for the live [`Session`].
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<Session>,
}

impl SessionStore {
    /// A store starting from an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the current session for attaching request headers.
    pub async fn snapshot(&self) -> Session {
        self.inner.lock().await.clone()
    }

    /// Fold response headers into the live session.
    pub async fn absorb(&self, response: &WireResponse) {
        self.inner.lock().await.absorb(response);
    }

    /// Forget all authentication artifacts.
    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }

    /// Whether the live session holds any artifact.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(set_cookie: Option<&str>, csrf: Option<&str>) -> WireResponse {
        WireResponse {
            status: 200,
            set_cookie: set_cookie.map(str::to_string),
            csrf_token: csrf.map(str::to_string),
            body: Vec::new(),
        }
    }

    #[test]
    fn absorb_strips_cookie_attributes_and_captures_id() {
        let mut session = Session::default();
        session.absorb(&response(
            Some("_session_id=deadbeef; Expires=Wed, 01 Jan 2030 00:00:00 GMT; Path=/"),
            Some("token-1"),
        ));
        assert_eq!(session.cookie_header().as_deref(), Some("_session_id=deadbeef"));
        assert_eq!(session.csrf_token(), Some("token-1"));
    }

    #[test]
    fn cookie_header_synthesizes_from_bare_id() {
        let mut session = Session::default();
        session.absorb(&response(Some("_session_id=cafe"), None));
        // Simulate losing the full cookie while keeping the id.
        session.cookie = None;
        assert_eq!(session.cookie_header().as_deref(), Some("_session_id=cafe"));
    }

    #[test]
    fn non_session_cookies_do_not_set_the_id() {
        let mut session = Session::default();
        session.absorb(&response(Some("other=1; Path=/"), None));
        assert_eq!(session.cookie_header().as_deref(), Some("other=1"));
        assert!(session.session_id.is_none());
    }

    #[test]
    fn absorb_keeps_existing_state_when_headers_absent() {
        let mut session = Session::default();
        session.absorb(&response(Some("_session_id=cafe"), Some("token-1")));
        session.absorb(&response(None, None));
        assert_eq!(session.cookie_header().as_deref(), Some("_session_id=cafe"));
        assert_eq!(session.csrf_token(), Some("token-1"));
    }

    #[test]
    fn clear_resets_everything_at_once() {
        let mut session = Session::default();
        session.absorb(&response(Some("_session_id=cafe"), Some("token-1")));
        session.clear();
        assert!(session.is_empty());
        assert_eq!(session.cookie_header(), None);
    }

    #[tokio::test]
    async fn store_round_trips_through_snapshot() {
        let store = SessionStore::new();
        store
            .absorb(&response(Some("_session_id=cafe"), Some("token-1")))
            .await;
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.csrf_token(), Some("token-1"));
        store.clear().await;
        assert!(store.is_empty().await);
    }
}
