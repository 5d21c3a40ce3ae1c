//! Application configuration.
//!
//! Loaded from a YAML file and overridable through environment variables.
//! Every field has a default so an empty config works out of the box for
//! local development.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "CAREPOST_CONFIG";
/// Environment variable for the database URL.
pub const DATABASE_URL_ENV_VAR: &str = "CAREPOST_DATABASE_URL";
/// Environment variable for the proof round threshold.
pub const PROOF_MAX_ROUNDS_ENV_VAR: &str = "CAREPOST_PROOF_MAX_ROUNDS";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "CAREPOST_LOG";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database connection URL.
    pub url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
        }
    }
}

/// Proof subprocess configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProofConfig {
    /// Maximum revision rounds before an upload escalates instead of opening
    /// a new pending round.
    pub max_rounds: i64,
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self { max_rounds: 3 }
    }
}

/// Timeout configuration for blocking collaborators.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for one storage call, in milliseconds. Elapse fails the
    /// primary operation with `Timeout`.
    pub storage_ms: u64,
    /// Budget for one audit-sink write attempt, in milliseconds. Elapse
    /// falls back to the recovery path without failing the operation.
    pub audit_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            storage_ms: 5_000,
            audit_ms: 2_000,
        }
    }
}

impl TimeoutConfig {
    pub fn storage(&self) -> Duration {
        Duration::from_millis(self.storage_ms)
    }

    pub fn audit(&self) -> Duration {
        Duration::from_millis(self.audit_ms)
    }
}

/// Audit sink retry configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Retry attempts before the alert hook fires.
    pub retry_attempts: usize,
    /// Minimum backoff delay in milliseconds.
    pub retry_min_delay_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_min_delay_ms: 10,
            retry_max_delay_ms: 500,
        }
    }
}

/// Top-level configuration for the lifecycle core.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub storage: StorageConfig,
    pub proof: ProofConfig,
    pub timeouts: TimeoutConfig,
    pub audit: AuditConfig,
}

impl CoreConfig {
    /// Load from a YAML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: CoreConfig = serde_yaml::from_str(&contents)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults plus environment overrides; no file required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = CoreConfig::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV_VAR) {
            self.storage.url = url;
        }
        if let Ok(value) = std::env::var(PROOF_MAX_ROUNDS_ENV_VAR) {
            self.proof.max_rounds =
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv {
                        var: PROOF_MAX_ROUNDS_ENV_VAR,
                        value,
                    })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.storage.url, "sqlite::memory:");
        assert_eq!(config.proof.max_rounds, 3);
        assert_eq!(config.timeouts.storage(), Duration::from_millis(5_000));
        assert_eq!(config.audit.retry_attempts, 3);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: CoreConfig = serde_yaml::from_str("proof:\n  max_rounds: 5\n").unwrap();
        assert_eq!(config.proof.max_rounds, 5);
        assert_eq!(config.storage.url, "sqlite::memory:");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            "storage:\n  url: sqlite://carepost.db\ntimeouts:\n  storage_ms: 250\n",
        )
        .unwrap();

        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config.storage.url, "sqlite://carepost.db");
        assert_eq!(config.timeouts.storage(), Duration::from_millis(250));
        assert_eq!(config.proof.max_rounds, 3);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = CoreConfig::load("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
