//! Torrent submission by magnet URI, remote URL, or uploaded file.
//!
//! # Design
//! - The server API surface differs across versions. The quirks are all
//!   absorbed here: missing `core.add_torrent_magnet` falls back to the
//!   URL path, a 2-arg `core.add_torrent_url` gets one retry with an
//!   empty headers object, and "already in session" comes back as the
//!   non-error [`AddOutcome::AlreadyExists`].
//! - Plugin options are applied after a successful add, never before;
//!   the server needs an existing hash to label.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{DelugeError, DelugeResult};
use crate::plugins::{PluginManager, PluginOptions};
use crate::requester::Requester;
use crate::wire::{
    CORE_ADD_TORRENT_FILE, CORE_ADD_TORRENT_MAGNET, CORE_ADD_TORRENT_URL, RpcResponse,
};

/// Fields requested for torrent listings.
pub const TORRENT_LIST_FIELDS: &[&str] = &[
    "name",
    "state",
    "progress",
    "total_size",
    "download_payload_rate",
    "upload_payload_rate",
    "eta",
    "label",
];

static INFO_HASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9a-fA-F]{40}").expect("info-hash pattern"));

/// Add-time parameters recognized by the daemon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TorrentOptions {
    /// Add the torrent paused.
    pub add_paused: Option<bool>,
    /// Download directory.
    pub download_location: Option<String>,
    /// Move the payload when complete.
    pub move_completed: Option<bool>,
    /// Destination for the completed move.
    pub move_completed_path: Option<String>,
    /// Download rate cap, KiB/s.
    pub max_download_speed: Option<f64>,
    /// Upload rate cap, KiB/s.
    pub max_upload_speed: Option<f64>,
    /// Peer connection cap.
    pub max_connections: Option<i64>,
    /// Upload slot cap.
    pub max_upload_slots: Option<i64>,
    /// Fetch first and last pieces first.
    pub prioritize_first_last_pieces: Option<bool>,
}

impl TorrentOptions {
    /// The wire-shaped options object: recognized keys only, unset keys
    /// omitted entirely (the server may reject explicit nulls), booleans
    /// carried as JSON booleans.
    #[must_use]
    pub fn wire_options(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(paused) = self.add_paused {
            map.insert("add_paused".to_string(), Value::Bool(paused));
        }
        if let Some(location) = &self.download_location {
            map.insert("download_location".to_string(), json!(location));
        }
        if let Some(move_completed) = self.move_completed {
            map.insert("move_completed".to_string(), Value::Bool(move_completed));
        }
        if let Some(path) = &self.move_completed_path {
            map.insert("move_completed_path".to_string(), json!(path));
        }
        if let Some(rate) = self.max_download_speed {
            map.insert("max_download_speed".to_string(), json!(rate));
        }
        if let Some(rate) = self.max_upload_speed {
            map.insert("max_upload_speed".to_string(), json!(rate));
        }
        if let Some(count) = self.max_connections {
            map.insert("max_connections".to_string(), json!(count));
        }
        if let Some(count) = self.max_upload_slots {
            map.insert("max_upload_slots".to_string(), json!(count));
        }
        if let Some(first_last) = self.prioritize_first_last_pieces {
            map.insert(
                "prioritize_first_last_pieces".to_string(),
                Value::Bool(first_last),
            );
        }
        map
    }
}

/// Result of an add operation. "Already exists" is a recognizable
/// success, not an error; callers present it as information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The torrent was added; the server returned its hash.
    Added {
        /// Info hash of the new torrent.
        hash: String,
    },
    /// The torrent was already active in the session.
    AlreadyExists {
        /// Pre-existing hash, when it could be extracted from the
        /// server's message.
        hash: Option<String>,
    },
}

impl AddOutcome {
    /// The hash, when one is known.
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        match self {
            Self::Added { hash } => Some(hash),
            Self::AlreadyExists { hash } => hash.as_deref(),
        }
    }
}

/// One line of a torrent listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentSummary {
    /// Info hash.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// State string as reported (`Downloading`, `Seeding`, ...).
    pub state: String,
    /// Completion percentage, 0 to 100.
    pub progress: f64,
    /// Payload size in bytes.
    pub total_size: u64,
    /// Current download rate, bytes per second.
    pub download_rate: f64,
    /// Current upload rate, bytes per second.
    pub upload_rate: f64,
    /// Assigned label, when any.
    pub label: Option<String>,
}

/// Decode a `core.get_torrents_status` result: an object keyed by hash.
pub fn decode_torrent_list(value: &Value) -> DelugeResult<Vec<TorrentSummary>> {
    let map = value.as_object().ok_or_else(|| DelugeError::Decode {
        message: "torrent listing is not an object".to_string(),
    })?;
    Ok(map
        .iter()
        .map(|(hash, fields)| TorrentSummary {
            hash: hash.clone(),
            name: string_field(fields, "name"),
            state: string_field(fields, "state"),
            progress: number_field(fields, "progress"),
            total_size: fields
                .get("total_size")
                .and_then(Value::as_u64)
                .unwrap_or_default(),
            download_rate: number_field(fields, "download_payload_rate"),
            upload_rate: number_field(fields, "upload_payload_rate"),
            label: fields
                .get("label")
                .and_then(Value::as_str)
                .filter(|label| !label.is_empty())
                .map(str::to_string),
        })
        .collect())
}

fn string_field(fields: &Value, name: &str) -> String {
    fields
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number_field(fields: &Value, name: &str) -> f64 {
    fields.get(name).and_then(Value::as_f64).unwrap_or_default()
}

/// Submits torrents through one connection's requester.
pub struct TorrentSubmitter {
    requester: Arc<Requester>,
    plugins: Arc<PluginManager>,
}

impl TorrentSubmitter {
    /// Bind a submitter to one connection's requester and plugin manager.
    #[must_use]
    pub fn new(requester: Arc<Requester>, plugins: Arc<PluginManager>) -> Self {
        Self { requester, plugins }
    }

    /// Add a torrent by source string: magnet URIs go through the magnet
    /// path, everything else through the URL path with cookie forwarding.
    ///
    /// # Errors
    ///
    /// Classified per kind; see the path methods. "Already exists" is a
    /// success outcome, never an error.
    pub async fn add_torrent(
        &self,
        source: &str,
        cookies: &[(String, String)],
        plugin_options: &PluginOptions,
        options: &TorrentOptions,
    ) -> DelugeResult<AddOutcome> {
        let outcome = if source.starts_with("magnet:") {
            self.add_magnet(source, options).await?
        } else {
            self.add_url(source, cookies, options).await?
        };
        self.finish(outcome, plugin_options).await
    }

    /// Add a torrent from an uploaded file payload.
    ///
    /// # Errors
    ///
    /// Classified per kind; "already in session" resolves to
    /// [`AddOutcome::AlreadyExists`] with the hash extracted from the
    /// server's message when present.
    pub async fn add_file(
        &self,
        filename: &str,
        base64_data: &str,
        plugin_options: &PluginOptions,
        options: &TorrentOptions,
    ) -> DelugeResult<AddOutcome> {
        let params = vec![
            json!(filename),
            json!(base64_data),
            Value::Object(options.wire_options()),
        ];
        let response = self.requester.request(CORE_ADD_TORRENT_FILE, params).await?;
        let outcome = outcome_from_response(response)?;
        self.finish(outcome, plugin_options).await
    }

    async fn add_magnet(&self, uri: &str, options: &TorrentOptions) -> DelugeResult<AddOutcome> {
        let params = vec![json!(uri), Value::Object(options.wire_options())];
        match self.requester.request(CORE_ADD_TORRENT_MAGNET, params).await {
            Ok(response) => outcome_from_response(response),
            Err(DelugeError::Rpc { message, .. }) if is_unknown_method(&message) => {
                // Older servers lack the magnet RPC; the URL path accepts
                // magnet URIs there.
                debug!("magnet RPC missing, falling back to URL add");
                self.add_url(uri, &[], options).await
            }
            Err(DelugeError::Rpc { message, .. }) if is_scheme_error(&message) => {
                Err(DelugeError::UnsupportedScheme {
                    source_uri: uri.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn add_url(
        &self,
        url: &str,
        cookies: &[(String, String)],
        options: &TorrentOptions,
    ) -> DelugeResult<AddOutcome> {
        let params = vec![
            json!(url),
            Value::Object(options.wire_options()),
            Value::Object(cookie_headers(cookies)),
        ];
        match self.requester.request(CORE_ADD_TORRENT_URL, params).await {
            Ok(response) => outcome_from_response(response),
            Err(DelugeError::Rpc { message, .. }) if is_arity_error(&message) => {
                // Known cross-version incompatibility: some servers take
                // exactly two positional args. Replay with an empty
                // headers object in the third position.
                debug!("URL add arity mismatch, retrying with empty headers");
                let params = vec![
                    json!(url),
                    Value::Object(options.wire_options()),
                    json!({}),
                ];
                let response = self
                    .requester
                    .request(CORE_ADD_TORRENT_URL, params)
                    .await
                    .map_err(map_remote_forbidden)?;
                outcome_from_response(response)
            }
            Err(err) => Err(map_remote_forbidden(err)),
        }
    }

    async fn finish(
        &self,
        outcome: AddOutcome,
        plugin_options: &PluginOptions,
    ) -> DelugeResult<AddOutcome> {
        if let AddOutcome::Added { hash } = &outcome {
            self.plugins.apply_post_add_options(hash, plugin_options).await;
        }
        Ok(outcome)
    }
}

fn outcome_from_response(response: RpcResponse) -> DelugeResult<AddOutcome> {
    if response.is_already_in_session() {
        let message = response.error.map(|fault| fault.message).unwrap_or_default();
        return Ok(AddOutcome::AlreadyExists {
            hash: extract_info_hash(&message),
        });
    }
    match response.result {
        Some(Value::String(hash)) if !hash.is_empty() => Ok(AddOutcome::Added { hash }),
        _ => Err(DelugeError::AddRejected {
            message: "server returned no torrent id".to_string(),
        }),
    }
}

/// Synthesize the headers object for `core.add_torrent_url`: a single
/// `Cookie` header joining the caller's pairs with `"; "`.
fn cookie_headers(cookies: &[(String, String)]) -> Map<String, Value> {
    let mut headers = Map::new();
    if !cookies.is_empty() {
        let cookie = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        headers.insert("Cookie".to_string(), json!(cookie));
    }
    headers
}

fn extract_info_hash(message: &str) -> Option<String> {
    INFO_HASH
        .find(message)
        .map(|hit| hit.as_str().to_lowercase())
}

fn is_unknown_method(message: &str) -> bool {
    message.to_lowercase().contains("unknown method")
}

fn is_scheme_error(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("unsupported scheme") || lowered.contains("unknown scheme")
}

fn is_arity_error(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("takes exactly") || (lowered.contains("argument") && lowered.contains("given"))
}

fn map_remote_forbidden(err: DelugeError) -> DelugeError {
    if let DelugeError::Rpc { message, .. } = &err {
        let lowered = message.to_lowercase();
        if lowered.contains("403") && lowered.contains("forbidden") {
            return DelugeError::RemoteForbidden { status: 403 };
        }
    }
    err
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{ScriptedTransport, fault, ok_result, scripted_requester};
    use crate::wire::LABEL_SET_TORRENT;

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    fn submitter(transport: Arc<ScriptedTransport>) -> TorrentSubmitter {
        let requester = Arc::new(scripted_requester(transport));
        let plugins = Arc::new(PluginManager::new(Arc::clone(&requester)));
        TorrentSubmitter::new(requester, plugins)
    }

    #[test]
    fn wire_options_omit_unset_and_keep_booleans() {
        let options = TorrentOptions {
            add_paused: Some(true),
            download_location: Some("/x".to_string()),
            ..TorrentOptions::default()
        };
        let wire = options.wire_options();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire["add_paused"], Value::Bool(true));
        assert_eq!(wire["download_location"], json!("/x"));
        assert!(TorrentOptions::default().wire_options().is_empty());
    }

    #[test]
    fn info_hash_extraction() {
        let message = format!("Torrent already in session ({})", HASH.to_uppercase());
        assert_eq!(extract_info_hash(&message), Some(HASH.to_string()));
        assert_eq!(extract_info_hash("no hash here"), None);
    }

    #[tokio::test]
    async fn magnet_add_applies_label_after_success() {
        let transport = ScriptedTransport::new(vec![
            ok_result(json!(HASH)),
            ok_result(json!(null)),
        ]);
        let outcome = submitter(Arc::clone(&transport))
            .add_torrent(
                "magnet:?xt=urn:btih:abc",
                &[],
                &PluginOptions {
                    label: Some("tv".to_string()),
                },
                &TorrentOptions::default(),
            )
            .await
            .expect("add");
        assert_eq!(outcome.hash(), Some(HASH));
        assert_eq!(
            transport.methods(),
            vec![CORE_ADD_TORRENT_MAGNET, LABEL_SET_TORRENT]
        );
    }

    #[tokio::test]
    async fn magnet_falls_back_to_url_path_on_unknown_method() {
        let transport = ScriptedTransport::new(vec![
            fault("Unknown method: core.add_torrent_magnet", 2),
            ok_result(json!(HASH)),
        ]);
        let outcome = submitter(Arc::clone(&transport))
            .add_torrent(
                "magnet:?xt=urn:btih:abc",
                &[],
                &PluginOptions::default(),
                &TorrentOptions::default(),
            )
            .await
            .expect("fallback add");
        assert!(matches!(outcome, AddOutcome::Added { .. }));
        assert_eq!(
            transport.methods(),
            vec![CORE_ADD_TORRENT_MAGNET, CORE_ADD_TORRENT_URL]
        );
    }

    #[tokio::test]
    async fn magnet_scheme_error_is_specific() {
        let transport = ScriptedTransport::new(vec![fault("Unknown scheme: xyz", 3)]);
        let result = submitter(transport)
            .add_torrent(
                "magnet:?xt=urn:btih:abc",
                &[],
                &PluginOptions::default(),
                &TorrentOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(DelugeError::UnsupportedScheme { .. })));
    }

    #[tokio::test]
    async fn empty_magnet_result_is_rejected() {
        let transport = ScriptedTransport::new(vec![ok_result(json!(null))]);
        let result = submitter(transport)
            .add_torrent(
                "magnet:?xt=urn:btih:abc",
                &[],
                &PluginOptions::default(),
                &TorrentOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(DelugeError::AddRejected { .. })));
    }

    #[tokio::test]
    async fn url_add_forwards_cookies_and_retries_arity_mismatch() {
        let transport = ScriptedTransport::new(vec![
            fault("add_torrent_url() takes exactly 3 arguments (4 given)", 4),
            ok_result(json!(HASH)),
        ]);
        let cookies = vec![
            ("uid".to_string(), "1".to_string()),
            ("pass".to_string(), "abc".to_string()),
        ];
        let outcome = submitter(Arc::clone(&transport))
            .add_torrent(
                "http://tracker.test/t.torrent",
                &cookies,
                &PluginOptions::default(),
                &TorrentOptions::default(),
            )
            .await
            .expect("retried add");
        assert!(matches!(outcome, AddOutcome::Added { .. }));

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1[2], json!({"Cookie": "uid=1; pass=abc"}));
        assert_eq!(calls[1].1[2], json!({}));
    }

    #[tokio::test]
    async fn url_add_maps_remote_403_text() {
        let transport = ScriptedTransport::new(vec![fault("Error: 403 Forbidden", 5)]);
        let result = submitter(transport)
            .add_torrent(
                "http://tracker.test/t.torrent",
                &[],
                &PluginOptions::default(),
                &TorrentOptions::default(),
            )
            .await;
        assert!(matches!(
            result,
            Err(DelugeError::RemoteForbidden { status: 403 })
        ));
    }

    #[tokio::test]
    async fn duplicate_add_resolves_as_already_exists() {
        let transport = ScriptedTransport::new(vec![fault(
            &format!("Torrent already in session ({HASH})"),
            1,
        )]);
        let outcome = submitter(transport)
            .add_torrent(
                "magnet:?xt=urn:btih:abc",
                &[],
                &PluginOptions {
                    label: Some("tv".to_string()),
                },
                &TorrentOptions::default(),
            )
            .await
            .expect("already exists is not an error");
        assert_eq!(
            outcome,
            AddOutcome::AlreadyExists {
                hash: Some(HASH.to_string())
            }
        );
    }

    #[tokio::test]
    async fn file_add_extracts_hash_from_duplicate_message() {
        let transport = ScriptedTransport::new(vec![fault(
            &format!("Torrent already in session ({HASH})."),
            1,
        )]);
        let outcome = submitter(transport)
            .add_file(
                "linux.torrent",
                "ZmFrZQ==",
                &PluginOptions::default(),
                &TorrentOptions::default(),
            )
            .await
            .expect("already exists is not an error");
        assert_eq!(outcome.hash(), Some(HASH));
    }

    #[test]
    fn torrent_list_decodes() {
        let listing = json!({
            HASH: {
                "name": "linux.iso",
                "state": "Seeding",
                "progress": 100.0,
                "total_size": 1024,
                "download_payload_rate": 0.0,
                "upload_payload_rate": 512.5,
                "eta": 0,
                "label": "isos"
            }
        });
        let summaries = decode_torrent_list(&listing).expect("decode");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].hash, HASH);
        assert_eq!(summaries[0].state, "Seeding");
        assert_eq!(summaries[0].label.as_deref(), Some("isos"));
        assert!(decode_torrent_list(&json!([])).is_err());
    }
}
