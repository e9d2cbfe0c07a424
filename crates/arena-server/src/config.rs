//! Configuration file loading for the arena server.
//!
//! Settings live in `arena.toml` in the working directory; every field
//! has a default so the server starts with no file at all.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Arena server configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. "127.0.0.1:3000".
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Interpreter used to run bot seats.
    #[serde(default = "default_python")]
    pub python: String,
    /// Directory scanned for builtin bots at startup.
    #[serde(default = "default_builtin_dir")]
    pub builtin_bots_dir: PathBuf,
    /// Directory holding vetted uploads.
    #[serde(default = "default_uploads_dir")]
    pub uploaded_bots_dir: PathBuf,
    /// Quarantine directory for rejected uploads.
    #[serde(default = "default_quarantine_dir")]
    pub quarantine_dir: PathBuf,
    /// Default bot initialization deadline in seconds.
    #[serde(default = "default_init_timeout")]
    pub init_timeout_secs: f64,
    /// Default per-move bot deadline in seconds.
    #[serde(default = "default_move_timeout")]
    pub move_timeout_secs: f64,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_builtin_dir() -> PathBuf {
    PathBuf::from("bots/builtin")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("bots/uploads")
}

fn default_quarantine_dir() -> PathBuf {
    PathBuf::from("bots/quarantine")
}

fn default_init_timeout() -> f64 {
    60.0
}

fn default_move_timeout() -> f64 {
    2.0
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            python: default_python(),
            builtin_bots_dir: default_builtin_dir(),
            uploaded_bots_dir: default_uploads_dir(),
            quarantine_dir: default_quarantine_dir(),
            init_timeout_secs: default_init_timeout(),
            move_timeout_secs: default_move_timeout(),
        }
    }
}

impl ServerConfig {
    /// Loads the configuration from disk, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be
    /// read, or [`ConfigError::ParseError`] for invalid TOML.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        PathBuf::from("arena.toml")
    }

    /// The default bot initialization deadline.
    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.init_timeout_secs)
    }

    /// The default per-move bot deadline.
    pub fn move_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.move_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "127.0.0.1:3000");
        assert_eq!(config.init_timeout(), Duration::from_secs(60));
        assert_eq!(config.move_timeout(), Duration::from_secs(2));
        assert_eq!(config.builtin_bots_dir, PathBuf::from("bots/builtin"));
    }

    #[test]
    fn parse_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
bind = "0.0.0.0:8080"
move_timeout_secs = 1.5
"#,
        )
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.move_timeout(), Duration::from_millis(1500));
        assert_eq!(config.init_timeout(), Duration::from_secs(60));
        assert_eq!(config.python, "python3");
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.bind, ServerConfig::default().bind);
    }
}
