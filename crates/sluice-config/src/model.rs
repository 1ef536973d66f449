//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers deserialized from the settings file.
//! - Validation lives here so the loader stays IO-only.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// One configured Deluge Web-UI target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    /// Base URL of the Web-UI, e.g. `http://host:8112`.
    pub url: String,
    /// Web-UI password for `auth.login`.
    pub password: String,
}

/// The full settings document: all connections plus the primary index.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Configured servers, in user order.
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Index into `connections` used when no explicit server is requested.
    #[serde(default)]
    pub primary_index: usize,
}

impl Settings {
    /// Validate connection URLs and the primary index.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidConnection` for an empty or
    /// non-http(s) URL, or `ConfigError::PrimaryOutOfRange` when the
    /// primary index points past the configured list.
    pub fn validate(&self) -> ConfigResult<()> {
        for (index, connection) in self.connections.iter().enumerate() {
            if connection.url.trim().is_empty() {
                return Err(ConfigError::InvalidConnection {
                    index,
                    reason: "url is empty",
                });
            }
            let parsed = Url::parse(connection.url.trim()).map_err(|_| {
                ConfigError::InvalidConnection {
                    index,
                    reason: "url is not an absolute URL",
                }
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidConnection {
                    index,
                    reason: "url scheme must be http or https",
                });
            }
        }
        if !self.connections.is_empty() && self.primary_index >= self.connections.len() {
            return Err(ConfigError::PrimaryOutOfRange {
                index: self.primary_index,
                len: self.connections.len(),
            });
        }
        Ok(())
    }

    /// The primary connection, when any connection is configured.
    #[must_use]
    pub fn primary(&self) -> Option<&Connection> {
        self.connections.get(self.primary_index)
    }

    /// The connection at `index`, when configured.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Connection> {
        self.connections.get(index)
    }
}
