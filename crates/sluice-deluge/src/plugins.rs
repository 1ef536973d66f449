//! Plugin discovery, label lookup, and post-add plugin options.
//!
//! # Design
//! - Label availability is never fatal anywhere in the system: the three
//!   label RPC strategies fall through on failure or empty results, and
//!   an all-fail lookup yields an empty list, not an error.
//! - Applying post-add options is best-effort; a failed label assignment
//!   must not fail the add that preceded it.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::DelugeResult;
use crate::requester::Requester;
use crate::wire::{
    self, LABEL_GET_CONFIG, LABEL_GET_LABELS, LABEL_SET_TORRENT, LABELPLUS_GET_LABELS,
    WEB_GET_PLUGINS,
};

/// Plugin name granting the standard label RPCs.
const LABEL_PLUGIN: &str = "Label";
/// Plugin name granting the LabelPlus RPCs.
const LABEL_PLUS_PLUGIN: &str = "LabelPlus";

/// Summary of label-relevant plugin state for one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginInfo {
    /// Labels known to the server, source order, no duplicates.
    pub labels: Vec<String>,
    /// Whether the standard Label plugin is enabled.
    pub has_label_plugin: bool,
    /// Whether the LabelPlus plugin is enabled.
    pub has_label_plus_plugin: bool,
}

/// Caller-supplied options applied after a torrent is added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOptions {
    /// Label to assign to the new torrent.
    pub label: Option<String>,
}

impl PluginOptions {
    /// Whether there is anything to apply.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.label.is_none()
    }
}

/// Discovers plugins and labels and applies post-add options.
pub struct PluginManager {
    requester: Arc<Requester>,
    cached: Mutex<Option<PluginInfo>>,
}

impl PluginManager {
    /// Bind a plugin manager to one connection's requester.
    #[must_use]
    pub fn new(requester: Arc<Requester>) -> Self {
        Self {
            requester,
            cached: Mutex::new(None),
        }
    }

    /// Enabled plugin names, normalized across the server's two response
    /// shapes (array of names, or name-to-enabled object).
    ///
    /// # Errors
    ///
    /// Propagates request failures and a response of neither known shape.
    pub async fn get_plugins(&self) -> DelugeResult<Vec<String>> {
        let result = self
            .requester
            .request(WEB_GET_PLUGINS, Vec::new())
            .await?
            .into_result()?;
        wire::decode_plugin_list(&result)
    }

    /// Labels from the first of three strategies that yields any:
    /// `label.get_labels`, then `label.get_config`, then
    /// `labelplus.get_labels`. All-fail returns an empty list.
    pub async fn get_labels(&self) -> Vec<String> {
        let strategies: [(&str, fn(&serde_json::Value) -> Option<Vec<String>>); 3] = [
            (LABEL_GET_LABELS, wire::decode_label_array),
            (LABEL_GET_CONFIG, wire::decode_label_config),
            (LABELPLUS_GET_LABELS, wire::decode_labelplus_map),
        ];
        for (method, decode) in strategies {
            match self.requester.request(method, Vec::new()).await {
                Ok(response) => {
                    let labels = response
                        .result
                        .as_ref()
                        .and_then(decode)
                        .unwrap_or_default();
                    if !labels.is_empty() {
                        return dedup_preserving_order(labels);
                    }
                    debug!(method, "label strategy returned nothing, falling through");
                }
                Err(err) => {
                    debug!(method, error = %err, "label strategy failed, falling through");
                }
            }
        }
        Vec::new()
    }

    /// Plugin summary for this connection, cached after the first fetch.
    ///
    /// # Errors
    ///
    /// Propagates plugin-list failures; label lookup never fails.
    pub async fn plugin_info(&self) -> DelugeResult<PluginInfo> {
        if let Some(cached) = self.cached.lock().await.clone() {
            return Ok(cached);
        }
        self.refresh_plugin_info().await
    }

    /// Recompute the plugin summary, replacing any cached value.
    ///
    /// # Errors
    ///
    /// Propagates plugin-list failures; label lookup never fails.
    pub async fn refresh_plugin_info(&self) -> DelugeResult<PluginInfo> {
        let plugins = self.get_plugins().await?;
        let has_label_plugin = plugins.iter().any(|name| name == LABEL_PLUGIN);
        let has_label_plus_plugin = plugins.iter().any(|name| name == LABEL_PLUS_PLUGIN);
        let labels = if has_label_plugin || has_label_plus_plugin {
            self.get_labels().await
        } else {
            Vec::new()
        };
        let info = PluginInfo {
            labels,
            has_label_plugin,
            has_label_plus_plugin,
        };
        *self.cached.lock().await = Some(info.clone());
        Ok(info)
    }

    /// Apply post-add options to a freshly added torrent. Best-effort:
    /// failures are logged and swallowed so the add itself stays
    /// successful.
    pub async fn apply_post_add_options(&self, torrent_hash: &str, options: &PluginOptions) {
        let Some(label) = options.label.as_deref() else {
            return;
        };
        match self
            .requester
            .request(LABEL_SET_TORRENT, vec![json!(torrent_hash), json!(label)])
            .await
        {
            Ok(_) => debug!(torrent_hash, label, "label applied"),
            Err(err) => warn!(torrent_hash, label, error = %err, "label apply failed"),
        }
    }
}

fn dedup_preserving_order(labels: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .filter(|label| seen.insert(label.clone()))
        .collect()
}
