//! Daemon discovery and the per-host connect state machine.
//!
//! # Design
//! - The Web-UI is only a proxy; it must itself hold a connection to one
//!   of possibly several attached daemons. This module walks the host
//!   list sequentially, one host at a time, first success wins.
//! - Host lists and statuses are re-fetched on every connect sequence.
//!   Daemon state is volatile and caching it across reconnects has bitten
//!   before.
//! - A status string the machine does not recognize is a hard error
//!   naming the status, never a silent skip.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{DelugeError, DelugeResult};
use crate::requester::Requester;
use crate::wire::{
    self, CORE_GET_CONFIG, WEB_CONNECT, WEB_CONNECTED, WEB_GET_HOST_STATUS, WEB_GET_HOSTS,
    WEB_START_DAEMON,
};

/// Daemon status reported when the Web-UI already holds the connection.
const STATUS_CONNECTED: &str = "Connected";
/// Daemon status for a running daemon awaiting a Web-UI connection.
const STATUS_ONLINE: &str = "Online";
/// Daemon status for a stopped daemon the Web-UI can start.
const STATUS_OFFLINE: &str = "Offline";

/// One attachable daemon from the Web-UI's host list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonHost {
    /// Opaque host identifier.
    pub host_id: String,
    /// Daemon address.
    pub ip: String,
    /// Daemon port.
    pub port: u16,
    /// Status as listed, possibly stale by the time it is acted on.
    pub status: String,
}

/// The resolved active daemon for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonInfo {
    /// Status after the connect sequence resolved this host.
    pub status: String,
    /// Daemon address.
    pub ip: String,
    /// Daemon port.
    pub port: u16,
    /// Opaque host identifier.
    pub host_id: String,
    /// Daemon version, when the server reports one.
    pub version: Option<String>,
}

/// Ensures the Web-UI holds a daemon connection.
pub struct DaemonManager {
    requester: Arc<Requester>,
}

impl DaemonManager {
    /// Bind a daemon manager to one connection's requester.
    #[must_use]
    pub fn new(requester: Arc<Requester>) -> Self {
        Self { requester }
    }

    /// Whether the Web-UI already reports a live daemon connection.
    /// Failures count as "not connected".
    pub async fn is_connected(&self) -> bool {
        match self.requester.request(WEB_CONNECTED, Vec::new()).await {
            Ok(response) => response.result == Some(Value::Bool(true)),
            Err(err) => {
                debug!(error = %err, "web.connected probe failed");
                false
            }
        }
    }

    /// Walk the attached hosts until one is connected.
    ///
    /// Per host: `Connected` resolves immediately, `Online` gets a
    /// `web.connect`, `Offline` gets a `web.start_daemon` then a
    /// `web.connect`. Any other status fails that host hard. A failed
    /// host is recorded and the walk advances; only after every host has
    /// failed does the sequence fail as a whole.
    ///
    /// # Errors
    ///
    /// Returns `DelugeError::Daemon` wrapping the last per-host failure
    /// when no host could be connected, or the transport error from the
    /// host-list fetch itself.
    pub async fn connect_to_daemon(&self) -> DelugeResult<DaemonInfo> {
        let hosts = self.hosts().await?;
        let mut last_error: Option<DelugeError> = None;
        for host in hosts {
            match self.try_host(&host).await {
                Ok(info) => {
                    debug!(host_id = %info.host_id, version = ?info.version, "daemon connected");
                    return Ok(info);
                }
                Err(err) => {
                    warn!(host_id = %host.host_id, error = %err, "daemon host failed");
                    last_error = Some(err);
                }
            }
        }
        Err(DelugeError::Daemon {
            source: last_error.map(|err| Box::new(err) as _),
        })
    }

    /// Fetch the daemon configuration, the final step of a successful
    /// connect sequence.
    ///
    /// # Errors
    ///
    /// A 403-flavored refusal here means remote connections are disabled
    /// server-side and is reported as that, not as a generic HTTP error.
    pub async fn get_server_config(&self) -> DelugeResult<Value> {
        match self.requester.request(CORE_GET_CONFIG, Vec::new()).await {
            Ok(response) => response.into_result(),
            Err(err) if err.is_forbidden() => Err(DelugeError::ServerConfig {
                message: "remote connections are not enabled on your Deluge server".to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    async fn hosts(&self) -> DelugeResult<Vec<DaemonHost>> {
        let result = self
            .requester
            .request(WEB_GET_HOSTS, Vec::new())
            .await?
            .into_result()?;
        Ok(wire::decode_hosts(&result)?
            .into_iter()
            .map(|row| DaemonHost {
                host_id: row.id,
                ip: row.ip,
                port: row.port,
                status: row.status,
            })
            .collect())
    }

    async fn try_host(&self, host: &DaemonHost) -> DelugeResult<DaemonInfo> {
        let result = self
            .requester
            .request(WEB_GET_HOST_STATUS, vec![json!(host.host_id)])
            .await?
            .into_result()?;
        let status = wire::decode_host_status(&result)?;

        match status.status.as_str() {
            STATUS_CONNECTED => {}
            STATUS_ONLINE => self.connect_host(&host.host_id).await?,
            STATUS_OFFLINE => {
                self.requester
                    .request(WEB_START_DAEMON, vec![json!(host.port)])
                    .await?;
                self.connect_host(&host.host_id).await?;
            }
            other => {
                return Err(DelugeError::UnknownDaemonStatus {
                    status: other.to_string(),
                });
            }
        }

        Ok(DaemonInfo {
            status: STATUS_CONNECTED.to_string(),
            ip: host.ip.clone(),
            port: host.port,
            host_id: host.host_id.clone(),
            version: status.version,
        })
    }

    async fn connect_host(&self, host_id: &str) -> DelugeResult<()> {
        self.requester
            .request(WEB_CONNECT, vec![json!(host_id)])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{ScriptedTransport, fault, http_status, ok_result, scripted_requester};

    fn manager(transport: Arc<ScriptedTransport>) -> DaemonManager {
        DaemonManager::new(Arc::new(scripted_requester(transport)))
    }

    #[tokio::test]
    async fn connected_host_resolves_without_action() {
        let transport = ScriptedTransport::new(vec![
            ok_result(json!([["host-a", "127.0.0.1", 58846, "Connected"]])),
            ok_result(json!(["host-a", "Connected", "2.1.1"])),
        ]);
        let info = manager(Arc::clone(&transport))
            .connect_to_daemon()
            .await
            .expect("connect");
        assert_eq!(info.host_id, "host-a");
        assert_eq!(info.version.as_deref(), Some("2.1.1"));
        assert_eq!(
            transport.methods(),
            vec![WEB_GET_HOSTS, WEB_GET_HOST_STATUS]
        );
    }

    #[tokio::test]
    async fn offline_start_failure_advances_to_next_host() {
        let transport = ScriptedTransport::new(vec![
            ok_result(json!([
                ["host-a", "127.0.0.1", 58846, "Offline"],
                ["host-b", "10.0.0.2", 58846, "Online"]
            ])),
            ok_result(json!(["host-a", "Offline", "2.1.1"])),
            fault("could not start daemon", 1),
            ok_result(json!(["host-b", "Online", "2.1.1"])),
            ok_result(json!(true)),
        ]);
        let info = manager(Arc::clone(&transport))
            .connect_to_daemon()
            .await
            .expect("second host connects");
        assert_eq!(info.host_id, "host-b");
        assert_eq!(
            transport.methods(),
            vec![
                WEB_GET_HOSTS,
                WEB_GET_HOST_STATUS,
                WEB_START_DAEMON,
                WEB_GET_HOST_STATUS,
                WEB_CONNECT
            ]
        );
    }

    #[tokio::test]
    async fn unknown_status_names_the_status() {
        let transport = ScriptedTransport::new(vec![
            ok_result(json!([["host-a", "127.0.0.1", 58846, "Online"]])),
            ok_result(json!(["host-a", "Rebooting", "2.1.1"])),
        ]);
        let result = manager(transport).connect_to_daemon().await;
        match result {
            Err(DelugeError::Daemon { source }) => {
                let cause = source.expect("wrapped cause").to_string();
                assert!(cause.contains("Rebooting"), "cause: {cause}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_host_list_fails_with_no_cause() {
        let transport = ScriptedTransport::new(vec![ok_result(json!([]))]);
        let result = manager(transport).connect_to_daemon().await;
        assert!(matches!(result, Err(DelugeError::Daemon { source: None })));
    }

    #[tokio::test]
    async fn config_fetch_returns_the_result_payload() {
        let transport = ScriptedTransport::new(vec![ok_result(json!({"allow_remote": true}))]);
        let config = manager(transport).get_server_config().await.expect("config");
        assert_eq!(config["allow_remote"], json!(true));
    }

    #[tokio::test]
    async fn forbidden_config_fetch_is_translated() {
        // First 403 triggers the requester's session probe, the replay
        // hits 403 again, and the daemon layer translates the refusal.
        let transport = ScriptedTransport::new(vec![
            http_status(403),
            ok_result(json!(false)),
            http_status(403),
        ]);
        let result = manager(transport).get_server_config().await;
        match result {
            Err(DelugeError::ServerConfig { message }) => {
                assert!(message.contains("remote connections are not enabled"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
