//! HTTP transport seam.
//!
//! # Design
//! - One trait method: POST a JSON-RPC envelope, return status, the auth
//!   headers we care about, and the raw body. Everything above this seam is
//!   testable with a scripted fake.
//! - Timeouts are per call and classified distinctly from other transport
//!   failures so callers can tell a dead server from a slow one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, SET_COOKIE};
use url::Url;

use crate::error::{DelugeError, DelugeResult};
use crate::session::Session;
use crate::wire::RpcRequest;

/// Request header carrying the anti-forgery token back to the server.
pub const HEADER_CSRF_TOKEN: &str = "X-CSRF-Token";

/// Default per-call time budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);

/// What the requester needs back from one HTTP exchange.
#[derive(Debug, Clone)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw `Set-Cookie` header, when the server sent one.
    pub set_cookie: Option<String>,
    /// CSRF token header, when the server sent one.
    pub csrf_token: Option<String>,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// The single HTTP capability the engine consumes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST one JSON-RPC envelope to `endpoint` with the session's
    /// cookie/CSRF headers attached.
    async fn round_trip(
        &self,
        endpoint: &Url,
        request: &RpcRequest,
        session: &Session,
    ) -> DelugeResult<WireResponse>;
}

/// Production transport over `reqwest`.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport with the given per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns `DelugeError::Network` when the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> DelugeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DelugeError::Network {
                message: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self { client })
    }

    /// Build a transport with [`DEFAULT_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns `DelugeError::Network` when the HTTP client cannot be built.
    pub fn with_default_timeout() -> DelugeResult<Self> {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn round_trip(
        &self,
        endpoint: &Url,
        request: &RpcRequest,
        session: &Session,
    ) -> DelugeResult<WireResponse> {
        let mut builder = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(request);
        if let Some(cookie) = session.cookie_header() {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(token) = session.csrf_token() {
            builder = builder.header(HEADER_CSRF_TOKEN, token.to_string());
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                DelugeError::Timeout
            } else {
                DelugeError::Network {
                    message: format!("request to {endpoint} failed: {err}"),
                }
            }
        })?;

        let status = response.status().as_u16();
        let set_cookie = header_string(&response, SET_COOKIE.as_str());
        let csrf_token = header_string(&response, HEADER_CSRF_TOKEN);
        let body = response
            .bytes()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    DelugeError::Timeout
                } else {
                    DelugeError::Network {
                        message: format!("failed to read response body: {err}"),
                    }
                }
            })?
            .to_vec();

        Ok(WireResponse {
            status,
            set_cookie,
            csrf_token,
            body,
        })
    }
}

fn header_string(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
