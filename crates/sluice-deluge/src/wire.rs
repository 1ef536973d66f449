//! JSON-RPC wire envelope and per-RPC decode helpers.
//!
//! # Design
//! - The Web-UI speaks a JSON-RPC 2.0 flavored dialect: `POST <base>/json`
//!   with `{method, params, id}`, answered by `{result, error, id}` plus an
//!   occasional out-of-band `status` marker.
//! - Servers disagree on response shapes across versions. Every shape
//!   variant is decoded here, in one tagged step per RPC, so version
//!   knowledge never leaks into business logic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DelugeError, DelugeResult};

/// `auth.login`: password login, result is boolean.
pub const AUTH_LOGIN: &str = "auth.login";
/// `auth.check_session`: session validity probe, result is boolean.
pub const AUTH_CHECK_SESSION: &str = "auth.check_session";
/// `auth.delete_session`: server-side logout.
pub const AUTH_DELETE_SESSION: &str = "auth.delete_session";
/// `web.connected`: whether the Web-UI holds a daemon connection.
pub const WEB_CONNECTED: &str = "web.connected";
/// `web.get_hosts`: attachable daemon hosts.
pub const WEB_GET_HOSTS: &str = "web.get_hosts";
/// `web.get_host_status`: live status of one daemon host.
pub const WEB_GET_HOST_STATUS: &str = "web.get_host_status";
/// `web.start_daemon`: start a local daemon on a port.
pub const WEB_START_DAEMON: &str = "web.start_daemon";
/// `web.connect`: attach the Web-UI to a daemon host.
pub const WEB_CONNECT: &str = "web.connect";
/// `web.get_plugins`: enabled plugin listing.
pub const WEB_GET_PLUGINS: &str = "web.get_plugins";
/// `core.get_config`: daemon configuration fetch.
pub const CORE_GET_CONFIG: &str = "core.get_config";
/// `core.add_torrent_url`: add by remote URL.
pub const CORE_ADD_TORRENT_URL: &str = "core.add_torrent_url";
/// `core.add_torrent_magnet`: add by magnet URI.
pub const CORE_ADD_TORRENT_MAGNET: &str = "core.add_torrent_magnet";
/// `core.add_torrent_file`: add by uploaded file payload.
pub const CORE_ADD_TORRENT_FILE: &str = "core.add_torrent_file";
/// `core.get_torrents_status`: bulk torrent listing.
pub const CORE_GET_TORRENTS_STATUS: &str = "core.get_torrents_status";
/// `label.get_labels`: standard label listing.
pub const LABEL_GET_LABELS: &str = "label.get_labels";
/// `label.get_config`: legacy label listing via plugin config.
pub const LABEL_GET_CONFIG: &str = "label.get_config";
/// `label.set_torrent`: assign a label to a torrent.
pub const LABEL_SET_TORRENT: &str = "label.set_torrent";
/// `labelplus.get_labels`: LabelPlus label listing.
pub const LABELPLUS_GET_LABELS: &str = "labelplus.get_labels";

/// One outgoing JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    /// RPC method name.
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
    /// Per-request identifier; distinct for every request.
    pub id: String,
}

/// Server-reported RPC fault.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RpcFault {
    /// Human-readable error message. The server has no structured error
    /// vocabulary, so classification happens by substring elsewhere.
    #[serde(default)]
    pub message: String,
    /// Numeric error code.
    #[serde(default)]
    pub code: i64,
}

/// One incoming JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    /// Successful result payload, when present.
    #[serde(default)]
    pub result: Option<Value>,
    /// Fault payload, when the call failed server-side.
    #[serde(default)]
    pub error: Option<RpcFault>,
    /// Echo of the request id.
    #[serde(default)]
    pub id: Option<Value>,
    /// Out-of-band status marker some servers attach to distinguish a
    /// daemon-side 403 (remote host refused the fetch) from an HTTP 403.
    #[serde(default)]
    pub status: Option<u16>,
}

impl RpcResponse {
    /// Whether the fault, if any, is the "already in session" signal,
    /// a success condition for add operations, not a failure.
    #[must_use]
    pub fn is_already_in_session(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|fault| fault.message.to_lowercase().contains("already in session"))
    }

    /// Consume the envelope, requiring a result payload.
    ///
    /// # Errors
    ///
    /// Returns `DelugeError::Decode` when the envelope carries no result.
    pub fn into_result(self) -> DelugeResult<Value> {
        self.result.ok_or_else(|| DelugeError::Decode {
            message: "response carries no result payload".to_string(),
        })
    }
}

/// Decode `web.get_plugins`: either an array of names or an object mapping
/// name to an enabled flag.
pub fn decode_plugin_list(value: &Value) -> DelugeResult<Vec<String>> {
    match value {
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()),
        Value::Object(map) => Ok(map
            .iter()
            .filter(|(_, enabled)| truthy(enabled))
            .map(|(name, _)| name.clone())
            .collect()),
        other => Err(DelugeError::Decode {
            message: format!("plugin list is neither array nor object: {other}"),
        }),
    }
}

/// Decode `label.get_labels`: a plain array of label names.
pub fn decode_label_array(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

/// Decode `label.get_config`: an object carrying a `labels` array.
pub fn decode_label_config(value: &Value) -> Option<Vec<String>> {
    decode_label_array(value.as_object()?.get("labels")?)
}

/// Decode `labelplus.get_labels`: an object keyed by label id whose values
/// carry a `name` field.
pub fn decode_labelplus_map(value: &Value) -> Option<Vec<String>> {
    let map = value.as_object()?;
    Some(
        map.values()
            .filter_map(|entry| entry.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
    )
}

/// Decode `web.get_hosts`: an array of `[id, ip, port, status]` rows.
pub fn decode_hosts(value: &Value) -> DelugeResult<Vec<HostRow>> {
    let rows = value.as_array().ok_or_else(|| DelugeError::Decode {
        message: "host list is not an array".to_string(),
    })?;
    rows.iter().map(decode_host_row).collect()
}

/// One `web.get_hosts` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRow {
    /// Opaque host identifier.
    pub id: String,
    /// Daemon address.
    pub ip: String,
    /// Daemon port.
    pub port: u16,
    /// Status string as listed, possibly stale.
    pub status: String,
}

fn decode_host_row(row: &Value) -> DelugeResult<HostRow> {
    let fields = row.as_array().ok_or_else(|| DelugeError::Decode {
        message: "host row is not an array".to_string(),
    })?;
    let id = fields.first().and_then(Value::as_str);
    let ip = fields.get(1).and_then(Value::as_str);
    let port = fields.get(2).and_then(Value::as_u64);
    let status = fields.get(3).and_then(Value::as_str);
    match (id, ip, port, status) {
        (Some(id), Some(ip), Some(port), Some(status)) => {
            let port = u16::try_from(port).map_err(|_| DelugeError::Decode {
                message: format!("host row has an out-of-range port: {row}"),
            })?;
            Ok(HostRow {
                id: id.to_string(),
                ip: ip.to_string(),
                port,
                status: status.to_string(),
            })
        }
        _ => Err(DelugeError::Decode {
            message: format!("host row has unexpected shape: {row}"),
        }),
    }
}

/// Live status of one host as reported by `web.get_host_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostStatus {
    /// Current status string.
    pub status: String,
    /// Daemon version, when the server reports one.
    pub version: Option<String>,
}

/// Decode `web.get_host_status`. Newer servers answer `[id, status,
/// version]`; older ones answer `[id, ip, port, status, version]`.
pub fn decode_host_status(value: &Value) -> DelugeResult<HostStatus> {
    let fields = value.as_array().ok_or_else(|| DelugeError::Decode {
        message: "host status is not an array".to_string(),
    })?;
    let (status, version) = match fields.len() {
        3 => (fields.get(1), fields.get(2)),
        5 => (fields.get(3), fields.get(4)),
        _ => {
            return Err(DelugeError::Decode {
                message: format!("host status has unexpected arity: {value}"),
            });
        }
    };
    let status = status.and_then(Value::as_str).ok_or_else(|| DelugeError::Decode {
        message: format!("host status lacks a status string: {value}"),
    })?;
    Ok(HostStatus {
        status: status.to_string(),
        version: version.and_then(Value::as_str).map(str::to_string),
    })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
