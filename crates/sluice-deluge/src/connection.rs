//! Per-server composition and the public contract.
//!
//! # Design
//! - `ServerLink` owns one connection's full component set; building the
//!   requester and auth manager together keeps the session invariant
//!   structural (one live session per link, never shared).
//! - `ConnectionManager` is the only surface collaborators call. It caches
//!   at most one live link; the validating paths always build throwaway
//!   links so a configuration test can never corrupt a live session.
//! - Callers serialize operations per manager; the engine does not add
//!   internal mutual exclusion on top.

use std::sync::Arc;

use serde_json::json;
use sluice_config::{Connection, Settings};
use tracing::{error, info};

use crate::daemon::{DaemonInfo, DaemonManager};
use crate::error::{DelugeError, DelugeResult};
use crate::plugins::{PluginInfo, PluginManager, PluginOptions};
use crate::requester::Requester;
use crate::torrents::{
    AddOutcome, TORRENT_LIST_FIELDS, TorrentOptions, TorrentSubmitter, TorrentSummary,
    decode_torrent_list,
};
use crate::transport::{HttpTransport, Transport};
use crate::wire::CORE_GET_TORRENTS_STATUS;

/// One configured server's composed component set.
pub struct ServerLink {
    requester: Arc<Requester>,
    daemon: DaemonManager,
    plugins: Arc<PluginManager>,
    torrents: TorrentSubmitter,
    daemon_info: Option<DaemonInfo>,
}

impl ServerLink {
    /// Wire a fresh component set for one connection.
    #[must_use]
    pub fn build(connection: &Connection, transport: Arc<dyn Transport>, validating: bool) -> Self {
        let requester = Arc::new(Requester::new(
            transport,
            &connection.url,
            &connection.password,
            validating,
        ));
        let plugins = Arc::new(PluginManager::new(Arc::clone(&requester)));
        Self {
            daemon: DaemonManager::new(Arc::clone(&requester)),
            torrents: TorrentSubmitter::new(Arc::clone(&requester), Arc::clone(&plugins)),
            requester,
            plugins,
            daemon_info: None,
        }
    }

    /// Drive the connect sequence: login, ensure a daemon, fetch the
    /// server config. Strictly in that order; the first failure aborts.
    ///
    /// # Errors
    ///
    /// Propagates the failing step's classified error.
    pub async fn connect(&mut self, validating: bool) -> DelugeResult<()> {
        self.requester.login(!validating).await?;
        // A link that connected before only needs the cheap probe.
        if self.daemon_info.is_some() && self.daemon.is_connected().await {
            return Ok(());
        }
        let info = self.daemon.connect_to_daemon().await?;
        self.daemon.get_server_config().await?;
        info!(host_id = %info.host_id, version = ?info.version, "deluge daemon ready");
        self.daemon_info = Some(info);
        Ok(())
    }

    /// The daemon resolved by the last successful connect.
    #[must_use]
    pub const fn daemon_info(&self) -> Option<&DaemonInfo> {
        self.daemon_info.as_ref()
    }

    /// The plugin manager bound to this link.
    #[must_use]
    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    /// The torrent submitter bound to this link.
    #[must_use]
    pub const fn torrents(&self) -> &TorrentSubmitter {
        &self.torrents
    }

    async fn torrent_list(&self) -> DelugeResult<Vec<TorrentSummary>> {
        let result = self
            .requester
            .request(
                CORE_GET_TORRENTS_STATUS,
                vec![json!({}), json!(TORRENT_LIST_FIELDS)],
            )
            .await?
            .into_result()?;
        decode_torrent_list(&result)
    }
}

/// The engine's public contract, one instance per caller.
pub struct ConnectionManager {
    settings: Settings,
    transport: Arc<dyn Transport>,
    current: Option<(usize, ServerLink)>,
}

impl ConnectionManager {
    /// Build a manager over the default HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns `DelugeError::Network` when the HTTP client cannot be
    /// built.
    pub fn new(settings: Settings) -> DelugeResult<Self> {
        let transport = HttpTransport::with_default_timeout()?;
        Ok(Self::with_transport(settings, Arc::new(transport)))
    }

    /// Build a manager over a caller-supplied transport.
    #[must_use]
    pub fn with_transport(settings: Settings, transport: Arc<dyn Transport>) -> Self {
        Self {
            settings,
            transport,
            current: None,
        }
    }

    /// Connect to a server: the explicit index, else the cached one, else
    /// the primary. Validating mode builds a throwaway link and never
    /// touches the cached one.
    ///
    /// # Errors
    ///
    /// `DelugeError::NoSuchServer` when no connection exists at the
    /// resolved index, else the failing connect step's error.
    pub async fn connect_to_server(
        &mut self,
        index: Option<usize>,
        validating: bool,
    ) -> DelugeResult<()> {
        if validating {
            let index = self.resolve_index(index);
            let connection = self.connection_at(index)?;
            let mut link = ServerLink::build(&connection, Arc::clone(&self.transport), true);
            return link.connect(true).await;
        }
        self.ensure_connected(index).await
    }

    /// Add a torrent by magnet URI or remote URL.
    ///
    /// # Errors
    ///
    /// Propagates connect and submission failures; "already exists" is a
    /// success outcome.
    pub async fn add_torrent(
        &mut self,
        source: &str,
        cookies: &[(String, String)],
        plugin_options: &PluginOptions,
        options: &TorrentOptions,
        index: Option<usize>,
    ) -> DelugeResult<AddOutcome> {
        let link = self.connected_link(index).await?;
        link.torrents
            .add_torrent(source, cookies, plugin_options, options)
            .await
    }

    /// Add a torrent from an uploaded file payload.
    ///
    /// # Errors
    ///
    /// Propagates connect and submission failures; "already exists" is a
    /// success outcome.
    pub async fn add_torrent_file(
        &mut self,
        filename: &str,
        base64_data: &str,
        plugin_options: &PluginOptions,
        options: &TorrentOptions,
        index: Option<usize>,
    ) -> DelugeResult<AddOutcome> {
        let link = self.connected_link(index).await?;
        link.torrents
            .add_file(filename, base64_data, plugin_options, options)
            .await
    }

    /// Plugin and label summary for a server.
    ///
    /// # Errors
    ///
    /// Propagates connect and plugin-list failures.
    pub async fn get_plugin_info(&mut self, index: Option<usize>) -> DelugeResult<PluginInfo> {
        let link = self.connected_link(index).await?;
        link.plugins.plugin_info().await
    }

    /// Current torrents on a server.
    ///
    /// # Errors
    ///
    /// Propagates connect and listing failures.
    pub async fn get_torrent_list(
        &mut self,
        index: Option<usize>,
    ) -> DelugeResult<Vec<TorrentSummary>> {
        let link = self.connected_link(index).await?;
        link.torrent_list().await
    }

    /// Test arbitrary, possibly unsaved credentials and report plugin
    /// info. Builds a throwaway component set; the cached link and its
    /// session are never touched.
    ///
    /// # Errors
    ///
    /// Propagates connect and plugin-list failures without logging them;
    /// validation callers render errors themselves.
    pub async fn validate_server_and_get_plugins(
        &self,
        url: &str,
        password: &str,
    ) -> DelugeResult<PluginInfo> {
        let connection = Connection {
            url: url.to_string(),
            password: password.to_string(),
        };
        let mut link = ServerLink::build(&connection, Arc::clone(&self.transport), true);
        link.connect(true).await?;
        link.plugins.refresh_plugin_info().await
    }

    /// The daemon resolved for the cached link, when connected.
    #[must_use]
    pub fn daemon_info(&self) -> Option<&DaemonInfo> {
        self.current
            .as_ref()
            .and_then(|(_, link)| link.daemon_info())
    }

    fn resolve_index(&self, requested: Option<usize>) -> usize {
        requested
            .or_else(|| self.current.as_ref().map(|(index, _)| *index))
            .unwrap_or(self.settings.primary_index)
    }

    fn connection_at(&self, index: usize) -> DelugeResult<Connection> {
        self.settings
            .get(index)
            .cloned()
            .ok_or(DelugeError::NoSuchServer { index })
    }

    async fn ensure_connected(&mut self, requested: Option<usize>) -> DelugeResult<()> {
        let index = self.resolve_index(requested);
        let connection = self.connection_at(index)?;
        let mut link = match self.current.take() {
            Some((cached, link)) if cached == index => link,
            _ => ServerLink::build(&connection, Arc::clone(&self.transport), false),
        };
        match link.connect(false).await {
            Ok(()) => {
                self.current = Some((index, link));
                Ok(())
            }
            Err(err) => {
                // The user-facing failure surface for normal operation;
                // validation callers never reach this path.
                error!(server = index, error = %err, "connection to Deluge server failed");
                Err(err)
            }
        }
    }

    async fn connected_link(&mut self, requested: Option<usize>) -> DelugeResult<&ServerLink> {
        self.ensure_connected(requested).await?;
        self.current
            .as_ref()
            .map(|(_, link)| link)
            .ok_or(DelugeError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{ScriptedTransport, ok_result};
    use crate::wire;

    fn settings(urls: &[&str]) -> Settings {
        Settings {
            connections: urls
                .iter()
                .map(|url| Connection {
                    url: (*url).to_string(),
                    password: "secret".to_string(),
                })
                .collect(),
            primary_index: 0,
        }
    }

    fn connect_script() -> Vec<DelugeResult<crate::transport::WireResponse>> {
        vec![
            ok_result(json!(true)),
            ok_result(json!([["host-a", "127.0.0.1", 58846, "Connected"]])),
            ok_result(json!(["host-a", "Connected", "2.1.1"])),
            ok_result(json!({"allow_remote": true})),
        ]
    }

    #[tokio::test]
    async fn connect_sequence_runs_in_strict_order() {
        let transport = ScriptedTransport::new(connect_script());
        let mut manager = ConnectionManager::with_transport(
            settings(&["http://deluge.test:8112"]),
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        manager.connect_to_server(None, false).await.expect("connect");
        assert_eq!(
            transport.methods(),
            vec![
                wire::AUTH_LOGIN,
                wire::WEB_GET_HOSTS,
                wire::WEB_GET_HOST_STATUS,
                wire::CORE_GET_CONFIG
            ]
        );
        assert_eq!(
            manager.daemon_info().map(|info| info.host_id.as_str()),
            Some("host-a")
        );
    }

    #[tokio::test]
    async fn missing_server_index_fails_fast() {
        let transport = ScriptedTransport::new(Vec::new());
        let mut manager = ConnectionManager::with_transport(
            settings(&["http://deluge.test:8112"]),
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        let result = manager.connect_to_server(Some(5), false).await;
        assert!(matches!(result, Err(DelugeError::NoSuchServer { index: 5 })));
        assert!(transport.methods().is_empty());
    }

    #[tokio::test]
    async fn explicit_index_overrides_primary() {
        let transport = ScriptedTransport::new(connect_script());
        let mut manager = ConnectionManager::with_transport(
            settings(&["http://primary.test:8112", "http://other.test:8112"]),
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        manager
            .connect_to_server(Some(1), false)
            .await
            .expect("connect");
        // A follow-up with no index sticks to the cached server.
        assert_eq!(manager.resolve_index(None), 1);
    }

    #[tokio::test]
    async fn validation_does_not_touch_the_cached_link() {
        let transport = ScriptedTransport::new(connect_script());
        let mut manager = ConnectionManager::with_transport(
            settings(&["http://deluge.test:8112"]),
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        manager.connect_to_server(None, false).await.expect("connect");
        let cached_before = manager.daemon_info().cloned();

        // Validation against bad credentials fails without clobbering
        // the live link. auth.delete_session + auth.login rejection.
        let validation_script = ScriptedTransport::new(vec![
            ok_result(json!(true)),
            ok_result(json!(false)),
        ]);
        let validator = ConnectionManager::with_transport(
            settings(&["http://deluge.test:8112"]),
            Arc::clone(&validation_script) as Arc<dyn Transport>,
        );
        let result = validator
            .validate_server_and_get_plugins("http://other.test:8112", "wrong")
            .await;
        assert!(matches!(result, Err(DelugeError::Authentication { .. })));
        assert_eq!(manager.daemon_info().cloned(), cached_before);
        assert_eq!(
            validation_script.methods(),
            vec![wire::AUTH_DELETE_SESSION, wire::AUTH_LOGIN]
        );
    }

    #[tokio::test]
    async fn torrent_list_round_trips() {
        let mut script = connect_script();
        script.push(ok_result(json!({
            "00aa00aa00aa00aa00aa00aa00aa00aa00aa00aa": {
                "name": "linux.iso",
                "state": "Downloading",
                "progress": 42.5,
                "total_size": 2048,
                "download_payload_rate": 100.0,
                "upload_payload_rate": 10.0,
                "eta": 600,
                "label": ""
            }
        })));
        let transport = ScriptedTransport::new(script);
        let mut manager = ConnectionManager::with_transport(
            settings(&["http://deluge.test:8112"]),
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        let torrents = manager.get_torrent_list(None).await.expect("list");
        assert_eq!(torrents.len(), 1);
        assert_eq!(torrents[0].name, "linux.iso");
        assert_eq!(torrents[0].label, None);
    }
}
