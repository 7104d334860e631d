//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `HERALD_*` environment overrides
//! 3. Merge the config file (explicit path, or the user config directory)
//! 4. Deserialize merged tree → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Environment variables and the dotted config path each one sets.
const ENV_OVERRIDES: &[(&str, &str, EnvKind)] = &[
    ("HERALD_BROKER_TYPE_ID", "directory.broker_type_id", EnvKind::Str),
    ("HERALD_CONNECTION_POLICY", "connection.policy", EnvKind::Str),
    ("HERALD_REGISTRATION_MAX_RETRIES", "registration.max_retries", EnvKind::Int),
    ("HERALD_REGISTRATION_TIMEOUT_MS", "registration.timeout_ms", EnvKind::Int),
    ("HERALD_DISPATCH_QUEUE_CAPACITY", "dispatch.queue_capacity", EnvKind::Int),
    ("HERALD_DISPATCH_CONCURRENCY", "dispatch.concurrency", EnvKind::Int),
    ("HERALD_LOG_LEVEL", "logging.level", EnvKind::Str),
    ("HERALD_LOG_FORMAT", "logging.format", EnvKind::Str),
];

#[derive(Debug, Clone, Copy)]
enum EnvKind {
    Str,
    Int,
}

/// A loaded configuration and where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final, validated configuration.
    pub config: Config,
    /// Files that contributed, in merge order.
    pub loaded_files: Vec<String>,
    /// Environment variables that contributed.
    pub env_overrides: Vec<String>,
}

/// Load configuration from defaults, the process environment and a file.
///
/// An explicit `path` must exist. Without one, the user config file is
/// optional.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any layer is malformed or the final
/// configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let env_vars: HashMap<String, String> = std::env::vars()
        .filter(|(key, _)| key.starts_with("HERALD_"))
        .collect();
    load_with_env(path, &env_vars)
}

/// Like [`load`], with the environment supplied by the caller.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any layer is malformed or the final
/// configuration fails validation.
pub fn load_with_env(
    path: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Embedded defaults.
    let mut merged = parse_defaults()?;
    let mut loaded_files = Vec::new();

    // 2. Environment overrides.
    let env_overrides = apply_env_overrides(&mut merged, env_vars)?;
    if !env_overrides.is_empty() {
        debug!(count = env_overrides.len(), "applied environment overrides");
    }

    // 3. Config file.
    let file = match path {
        Some(explicit) => Some((read_file(explicit)?, explicit.to_path_buf())),
        None => match user_config_path() {
            Some(user_path) => try_load_file(&user_path)?.map(|value| (value, user_path)),
            None => None,
        },
    };
    if let Some((overlay, file_path)) = file {
        deep_merge(&mut merged, &overlay);
        loaded_files.push(file_path.display().to_string());
        info!(path = %file_path.display(), "loaded config file");
    }

    // 4–5. Deserialize and validate.
    let config = into_config(merged, "<merged config>")?;
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
        env_overrides,
    })
}

/// Parse a TOML string layered over the embedded defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the string does not parse or validation fails.
pub fn from_toml_str(content: &str) -> ConfigResult<Config> {
    let mut merged = parse_defaults()?;
    let overlay: toml::Value = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: "<string>".to_owned(),
        source: e,
    })?;
    deep_merge(&mut merged, &overlay);

    let config = into_config(merged, "<string>")?;
    validate::validate(&config)?;
    Ok(config)
}

/// Default location of the user config file.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "herald")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn parse_defaults() -> ConfigResult<toml::Value> {
    toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source: e,
    })
}

fn into_config(merged: toml::Value, origin: &str) -> ConfigResult<Config> {
    merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: origin.to_owned(),
            source: e,
        })
}

/// Recursively deep-merge `overlay` into `base`.
///
/// Tables merge per key; scalars and arrays from the overlay replace the
/// base value.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

fn apply_env_overrides(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<Vec<String>> {
    let mut applied = Vec::new();

    for (var_name, path, kind) in ENV_OVERRIDES {
        let Some(raw) = env_vars.get(*var_name) else {
            continue;
        };

        let value = match kind {
            EnvKind::Str => toml::Value::String(raw.clone()),
            EnvKind::Int => raw
                .trim()
                .parse::<i64>()
                .map(toml::Value::Integer)
                .map_err(|e| ConfigError::EnvError {
                    var_name: (*var_name).to_owned(),
                    message: format!("expected an integer: {e}"),
                })?,
        };

        set_path(merged, path, value);
        applied.push((*var_name).to_owned());
    }

    Ok(applied)
}

/// Set a dotted path inside a table tree, creating tables as needed.
fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut current = root;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let toml::Value::Table(table) = current else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

/// Read a file that must exist.
fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_file_content(path, &content)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read to avoid racing a separate exists check.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    parse_file_content(path, &content).map(Some)
}

fn parse_file_content(path: &Path, content: &str) -> ConfigResult<toml::Value> {
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}
