//! Shared context, error types, and settings loading for the CLI.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use anyhow::anyhow;
use sluice_config::Settings;
use sluice_deluge::ConnectionManager;

/// Exit code for rejected input.
const EXIT_VALIDATION: u8 = 2;
/// Exit code for an operation that failed against the server.
const EXIT_FAILURE: u8 = 3;

/// What went wrong at the CLI level: the user's input was rejected before
/// any work happened, or an operation failed underway. The split decides
/// the exit code; rendering goes through `Display`.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => EXIT_VALIDATION,
            Self::Failure(_) => EXIT_FAILURE,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(message) => formatter.write_str(message),
            // Alternate form prints the whole anyhow context chain.
            Self::Failure(error) => write!(formatter, "{error:#}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) manager: ConnectionManager,
    pub(crate) server: Option<usize>,
}

impl AppContext {
    /// Load settings and wire a connection manager for the session.
    pub(crate) fn from_settings(settings: Settings, server: Option<usize>) -> CliResult<Self> {
        let manager = ConnectionManager::new(settings)
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;
        Ok(Self { manager, server })
    }
}

/// Load settings from the given path, or the conventional default.
pub(crate) fn load_settings(config: Option<PathBuf>) -> CliResult<Settings> {
    let path = config.unwrap_or_else(sluice_config::default_config_path);
    sluice_config::load(&path).map_err(|err| {
        CliError::validation(format!(
            "could not load settings from '{}': {err}",
            path.display()
        ))
    })
}

/// Parse a `name=value` cookie pair from the command line.
pub(crate) fn parse_cookie_pair(raw: &str) -> CliResult<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::validation("cookies must be provided as name=value"))?;
    if name.trim().is_empty() {
        return Err(CliError::validation("cookie name cannot be empty"));
    }
    Ok((name.trim().to_string(), value.trim().to_string()))
}
