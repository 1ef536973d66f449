//! Connection configuration for sluice.
//!
//! The engine treats configuration as read-only input: a list of Deluge
//! servers plus the index of the primary one. This crate owns the typed
//! models, the TOML file loader, and shape validation; it never talks to a
//! server itself.

mod error;
mod loader;
mod model;

pub use error::ConfigError;
pub use loader::{default_config_path, load};
pub use model::{Connection, Settings};
