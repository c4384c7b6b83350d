//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (`--config` or `COURIER_CONFIG`)
//! 3. Environment variables

use courier_accounts::{AccountPolicy, MAX_COST, MIN_COST, MIN_USERNAME_LEN};
use courier_protocol::{DEFAULT_PORT, MAX_FRAME_SIZE};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "COURIER_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub accounts: AccountsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads from `path` (or `COURIER_CONFIG` when `path` is `None`), then
    /// applies environment overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match file {
            Some(file) => Self::from_file(file)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Applies `COURIER_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary key lookup. Unparseable values
    /// are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_with(&lookup, "COURIER_BIND", &mut self.network.bind_addr);
        override_with(
            &lookup,
            "COURIER_MAX_CONNECTIONS",
            &mut self.network.max_connections,
        );
        override_with(
            &lookup,
            "COURIER_MAX_FRAME_BYTES",
            &mut self.network.max_frame_bytes,
        );
        override_with(
            &lookup,
            "COURIER_IDLE_TIMEOUT",
            &mut self.network.idle_timeout_secs,
        );
        override_with(
            &lookup,
            "COURIER_MIN_USERNAME_LEN",
            &mut self.accounts.min_username_len,
        );
        override_with(
            &lookup,
            "COURIER_MAX_USERNAME_LEN",
            &mut self.accounts.max_username_len,
        );
        override_with(
            &lookup,
            "COURIER_MIN_PASSWORD_LEN",
            &mut self.accounts.min_password_len,
        );
        override_with(&lookup, "COURIER_HASH_COST", &mut self.accounts.hash_cost);
        if let Some(level) = lookup("COURIER_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "network.max_connections must be greater than 0".into(),
            ));
        }
        if self.network.max_frame_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "network.max_frame_bytes must be greater than 0".into(),
            ));
        }
        if self.accounts.min_username_len < MIN_USERNAME_LEN {
            return Err(ConfigError::ValidationError(format!(
                "accounts.min_username_len must be at least {} (got {})",
                MIN_USERNAME_LEN, self.accounts.min_username_len
            )));
        }
        if self.accounts.min_username_len > self.accounts.max_username_len {
            return Err(ConfigError::ValidationError(format!(
                "accounts.min_username_len ({}) exceeds accounts.max_username_len ({})",
                self.accounts.min_username_len, self.accounts.max_username_len
            )));
        }
        if !(MIN_COST..=MAX_COST).contains(&self.accounts.hash_cost) {
            return Err(ConfigError::ValidationError(format!(
                "accounts.hash_cost must be between {} and {} (got {})",
                MIN_COST, MAX_COST, self.accounts.hash_cost
            )));
        }
        Ok(())
    }
}

fn override_with<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(value) = lookup(key) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!("Ignoring unparseable {}={}", key, value),
        }
    }
}

/// Network configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_addr: SocketAddr,
    /// Connections beyond this are accepted and closed immediately.
    pub max_connections: usize,
    /// Largest accepted inbound frame payload.
    pub max_frame_bytes: u32,
    /// Seconds without inbound data before a connection is dropped (0 = never).
    pub idle_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            max_connections: 1000,
            max_frame_bytes: MAX_FRAME_SIZE,
            idle_timeout_secs: 0,
        }
    }
}

impl NetworkConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Account rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    pub min_username_len: usize,
    pub max_username_len: usize,
    pub min_password_len: usize,
    /// bcrypt cost factor.
    pub hash_cost: u32,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        let policy = AccountPolicy::default();
        Self {
            min_username_len: policy.min_username_len,
            max_username_len: policy.max_username_len,
            min_password_len: policy.min_password_len,
            hash_cost: policy.hash_cost,
        }
    }
}

impl AccountsConfig {
    pub fn policy(&self) -> AccountPolicy {
        AccountPolicy {
            min_username_len: self.min_username_len,
            max_username_len: self.max_username_len,
            min_password_len: self.min_password_len,
            hash_cost: self.hash_cost,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {err}", path = .0.display(), err = .1)]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file '{path}': {err}", path = .0.display(), err = .1)]
    ParseError(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.network.max_frame_bytes, 1024 * 1024);
        assert_eq!(config.network.idle_timeout(), None);
        assert_eq!(config.accounts.min_username_len, 3);
        assert_eq!(config.accounts.hash_cost, courier_accounts::DEFAULT_COST);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "network:\n  bind_addr: \"0.0.0.0:9000\"\naccounts:\n  min_password_len: 6\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.network.bind_addr.port(), 9000);
        assert_eq!(config.network.max_connections, 1000);
        assert_eq!(config.accounts.min_password_len, 6);
        assert_eq!(config.accounts.max_username_len, 50);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "network:\n  idle_timeout_secs: 30\nlogging:\n  level: debug").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.network.idle_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "accounts:\n  hash_cost: 10").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.accounts.hash_cost, 10);
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            Config::from_file(&missing),
            Err(ConfigError::IoError(..))
        ));

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "network:\n  bind_addr: not-an-address\n").unwrap();
        let err = Config::from_file(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("COURIER_BIND", "0.0.0.0:7000"),
            ("COURIER_MAX_CONNECTIONS", "5"),
            ("COURIER_MAX_FRAME_BYTES", "4096"),
            ("COURIER_IDLE_TIMEOUT", "60"),
            ("COURIER_MIN_PASSWORD_LEN", "6"),
            ("COURIER_HASH_COST", "6"),
            ("COURIER_LOG_LEVEL", "courier=trace"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.network.bind_addr.port(), 7000);
        assert_eq!(config.network.max_connections, 5);
        assert_eq!(config.network.max_frame_bytes, 4096);
        assert_eq!(config.network.idle_timeout_secs, 60);
        assert_eq!(config.accounts.min_password_len, 6);
        assert_eq!(config.accounts.hash_cost, 6);
        assert_eq!(config.logging.level, "courier=trace");
    }

    #[test]
    fn test_unparseable_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "COURIER_MAX_CONNECTIONS" => Some("lots".to_string()),
            _ => None,
        });
        assert_eq!(config.network.max_connections, 1000);
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.network.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.network.max_frame_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.accounts.min_username_len = 10;
        config.accounts.max_username_len = 5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_username_len"));

        for cost in [0, MIN_COST - 1, MAX_COST + 1] {
            let mut config = Config::default();
            config.accounts.hash_cost = cost;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("hash_cost"));
        }
    }

    #[test]
    fn test_validate_username_floor() {
        for min in [0, 1, MIN_USERNAME_LEN - 1] {
            let mut config = Config::default();
            config.accounts.min_username_len = min;
            let err = config.validate().unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError(_)));
            assert!(err.to_string().contains("min_username_len"));
        }

        let mut config = Config::default();
        config.accounts.min_username_len = MIN_USERNAME_LEN;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_cannot_lower_username_floor() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "COURIER_MIN_USERNAME_LEN" => Some("1".to_string()),
            _ => None,
        });
        assert_eq!(config.accounts.min_username_len, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_addr_yaml_is_plain_string() {
        let yaml = serde_yaml::to_string(&NetworkConfig::default()).unwrap();
        assert!(yaml.contains("127.0.0.1:8080"), "got {}", yaml);
        let parsed: NetworkConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.bind_addr, NetworkConfig::default().bind_addr);
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;
        let err = Config::from_file("/nonexistent/courier.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/courier.yaml"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_policy_from_accounts() {
        let accounts = AccountsConfig {
            min_password_len: 8,
            ..AccountsConfig::default()
        };
        let policy = accounts.policy();
        assert_eq!(policy.min_password_len, 8);
        assert_eq!(policy.max_username_len, 50);
    }
}
