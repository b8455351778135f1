//! Configuration module for the clustering service.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `CLUSTERLAB_` and use double
//! underscores to separate nested levels:
//! - `CLUSTERLAB_SERVER__BIND=0.0.0.0:9000` sets `server.bind`
//! - `CLUSTERLAB_TRAINING__DEFAULT_MAX_AGE=500` sets `training.default_max_age`
//! - `CLUSTERLAB_LOGGING__LEVEL=debug` sets `logging.level`

use crate::clustering::{CONVERGENCE_TOLERANCE, DistanceFunc};
use crate::types::{DEFAULT_DISTANCE_ID, DEFAULT_MAX_AGE};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the settings file, searched from the current directory up.
pub const CONFIG_DIR: &str = ".clusterlab";

const ENV_PREFIX: &str = "CLUSTERLAB_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Defaults applied when requests omit training parameters
    #[serde(default)]
    pub training: TrainingConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// HTTP server bind address
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Allow cross-origin requests from any origin
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Directory served for every path the API does not claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Iteration budget used when a request omits max_age or sends 0
    #[serde(default = "default_max_age")]
    pub default_max_age: u32,

    /// Distance function id used when a request omits dist_id or sends 0
    #[serde(default = "default_distance")]
    pub default_distance: u32,

    /// Largest per-coordinate center movement still considered stable
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// One of: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_age() -> u32 {
    DEFAULT_MAX_AGE
}
fn default_distance() -> u32 {
    DEFAULT_DISTANCE_ID
}
fn default_tolerance() -> f64 {
    CONVERGENCE_TOLERANCE
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            training: TrainingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            cors: true,
            static_dir: None,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            default_max_age: default_max_age(),
            default_distance: default_distance(),
            tolerance: default_tolerance(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let settings: Self = Self::figment(path.as_ref()).extract().map_err(Box::new)?;
        settings.validate().map_err(Box::new)?;
        Ok(settings)
    }

    /// Rejects training defaults that would make every request relying on
    /// them fail.
    pub fn validate(&self) -> Result<(), figment::Error> {
        let training = &self.training;

        if training.default_max_age == 0 {
            return Err("training.default_max_age must be at least 1".into());
        }
        if DistanceFunc::lookup(i64::from(training.default_distance)).is_err() {
            let known: Vec<String> = DistanceFunc::catalog()
                .iter()
                .map(|f| f.id().to_string())
                .collect();
            return Err(format!(
                "training.default_distance = {} is not a known distance function (expected one of {})",
                training.default_distance,
                known.join(", ")
            )
            .into());
        }
        if !training.tolerance.is_finite() || training.tolerance < 0.0 {
            return Err(format!(
                "training.tolerance = {} must be a finite, non-negative number",
                training.tolerance
            )
            .into());
        }

        Ok(())
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path))
            // Double underscore separates nested levels, single underscore
            // stays inside field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
    }

    /// Find the settings file by looking for the config directory from the
    /// current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments under `root`
    pub fn init_config_file(
        root: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.as_ref().join(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let defaults = Settings::default();
        let template = format!(
            r#"# clusterlab configuration file

# Version of the configuration schema
version = {version}

[server]
# Address the HTTP API listens on
bind = "{bind}"
# Answer CORS preflight requests from any origin
cors = {cors}
# Serve a browser client (e.g. the bundled static/api.js) next to the API
# static_dir = "static"

[training]
# Iteration budget when a train request omits max_age (or sends 0)
default_max_age = {max_age}
# Distance function when a request omits dist_id (or sends 0)
# 1 = euclidean, 2 = manhattan, 3 = chebyshev, 4 = cosine
default_distance = {distance}
# Largest per-coordinate center movement that still counts as converged
tolerance = {tolerance:e}

[logging]
# error, warn, info, debug or trace
level = "{level}"
"#,
            version = defaults.version,
            bind = defaults.server.bind,
            cors = defaults.server.cors,
            max_age = defaults.training.default_max_age,
            distance = defaults.training.default_distance,
            tolerance = defaults.training.tolerance,
            level = defaults.logging.level,
        );

        std::fs::write(&config_path, template)?;
        Ok(config_path)
    }

    /// Parsed log level, falling back to `info` for unknown names.
    pub fn log_level(&self) -> tracing::Level {
        self.logging
            .level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }
}
