#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the Herald dispatch layer.
//!
//! A single [`Config`] type covers broker discovery, connection policy,
//! subscription retry, the dispatcher queue, the topic catalog and logging.
//!
//! # Usage
//!
//! ```rust,no_run
//! use herald_config::Config;
//!
//! // defaults → HERALD_* env → user config file
//! let resolved = Config::load(None).unwrap();
//! println!("broker type: {}", resolved.config.directory.broker_type_id);
//! ```
//!
//! # Design
//!
//! This crate has **no dependencies on other herald crates**. Conversion
//! into domain types (retry policy, dispatcher settings, log setup) happens
//! in the crates that own those types.

/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// When `path` is `None` the user config file under the platform config
    /// directory is used if it exists.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a file is malformed, an environment
    /// override cannot be parsed, or validation fails.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(path)
    }

    /// Parse and validate configuration from a TOML string layered over the
    /// embedded defaults. Environment variables are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the string is not valid TOML or the
    /// result fails validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::from_toml_str(content)
    }
}
