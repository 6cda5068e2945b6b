//! Runtime configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via FRAMELINK_CONFIG or passed explicitly)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration.
    pub network: NetworkConfig,
    /// Worker pool configuration.
    pub runtime: RuntimeConfig,
    /// Logging configuration.
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable
    /// overrides.
    ///
    /// When `FRAMELINK_CONFIG` names a file that cannot be read or parsed,
    /// the error is returned; startup treats that as fatal.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("FRAMELINK_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.network.apply_env_overrides();
        self.runtime.apply_env_overrides();
        self.log.apply_env_overrides();
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Bind or connect address.
    pub server_host: String,
    /// Bind or connect port.
    pub server_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
        }
    }
}

impl NetworkConfig {
    /// The `host:port` endpoint string.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("FRAMELINK_HOST") {
            self.server_host = host;
        }
        if let Ok(port) = std::env::var("FRAMELINK_PORT") {
            if let Ok(parsed) = port.parse() {
                self.server_port = parsed;
            }
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker thread count. `0` means hardware concurrency.
    pub thread_count: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { thread_count: 1 }
    }
}

impl RuntimeConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(threads) = std::env::var("FRAMELINK_THREADS") {
            if let Ok(parsed) = threads.parse() {
                self.thread_count = parsed;
            }
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of `DEBUG INFO WARNING ERROR FATAL`.
    pub log_level: String,
    /// Path for the file sink. Console-only when absent.
    pub log_file: Option<PathBuf>,
    /// Rotation threshold for the file sink.
    pub max_log_file_size_in_mb: f32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            log_file: None,
            max_log_file_size_in_mb: 1.0,
        }
    }
}

impl LogConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("FRAMELINK_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(file) = std::env::var("FRAMELINK_LOG_FILE") {
            self.log_file = Some(PathBuf::from(file));
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.network.server_host, "127.0.0.1");
        assert_eq!(config.network.server_port, 8080);
        assert_eq!(config.network.endpoint(), "127.0.0.1:8080");
        assert_eq!(config.runtime.thread_count, 1);
        assert_eq!(config.log.log_level, "INFO");
        assert!(config.log.log_file.is_none());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "network:\n  server_host: 0.0.0.0\n  server_port: 9001\nruntime:\n  thread_count: 4\nlog:\n  log_level: DEBUG"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.network.server_host, "0.0.0.0");
        assert_eq!(config.network.server_port, 9001);
        assert_eq!(config.runtime.thread_count, 4);
        assert_eq!(config.log.log_level, "DEBUG");
        // Unspecified sections keep defaults.
        assert_eq!(config.log.max_log_file_size_in_mb, 1.0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(matches!(
            Config::from_file("/nonexistent/framelink.yaml"),
            Err(ConfigError::Io(_, _))
        ));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "network: [not, a, map]").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Parse(_, _))
        ));
    }
}
