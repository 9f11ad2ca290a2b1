//! Configuration management for location-relay.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{AppState, ServerConfig};
use crate::cli::Args;
use crate::security::ApiKeyStore;

/// Link sent by the `/menu` command when nothing else is configured.
pub const DEFAULT_WEB_URL: &str = "http://localhost:8000";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub security: SecuritySection,
    pub relay: RelaySection,
    pub bot: BotSection,
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            graceful_shutdown: true,
        }
    }
}

/// Security configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub auth: AuthSection,
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Enable authentication.
    pub enabled: bool,
    /// API keys.
    pub api_keys: Vec<String>,
}

/// Relay behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySection {
    /// Upper bound for a single outbound send, in seconds.
    pub send_timeout_secs: u64,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            send_timeout_secs: 10,
        }
    }
}

/// Stateless bot replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSection {
    /// Web app opened by the `/menu` button.
    pub web_url: String,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            web_url: DEFAULT_WEB_URL.to_string(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup (for testing).
    pub fn apply_env_from<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("LOCATION_RELAY_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("LOCATION_RELAY_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(key) = var("LOCATION_RELAY_API_KEY").filter(|k| !k.is_empty()) {
            self.add_api_key(key);
        }

        if let Some(secs) = var("LOCATION_RELAY_SEND_TIMEOUT").and_then(|s| s.parse().ok()) {
            self.relay.send_timeout_secs = secs;
        }

        if let Some(url) = var("WEB_URL").filter(|u| !u.is_empty()) {
            self.bot.web_url = url;
        }

        if let Some(level) = var("LOCATION_RELAY_LOG_LEVEL").or_else(|| var("RUST_LOG")) {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref key) = args.api_key {
            self.add_api_key(key.clone());
        }

        if args.no_auth {
            self.security.auth.enabled = false;
        }

        if let Some(secs) = args.send_timeout_secs {
            self.relay.send_timeout_secs = secs;
        }

        if let Some(ref url) = args.web_url {
            self.bot.web_url = url.clone();
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    fn add_api_key(&mut self, key: String) {
        self.security.auth.enabled = true;
        if !self.security.auth.api_keys.contains(&key) {
            self.security.auth.api_keys.push(key);
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Reject settings that cannot work at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.send_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.security.auth.enabled && self.security.auth.api_keys.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }

    /// Convert to ServerConfig for the gateway.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let server_config = ServerConfig::new(host.to_string(), self.server.port);
        Ok(if self.server.graceful_shutdown {
            server_config
        } else {
            server_config.without_graceful_shutdown()
        })
    }

    /// Build the gateway state described by this configuration.
    pub fn to_app_state(&self) -> AppState {
        let state = AppState::with_options(self.send_timeout(), self.bot.web_url.clone());
        if self.security.auth.enabled {
            state.with_auth(ApiKeyStore::with_keys(self.security.auth.api_keys.iter().cloned()))
        } else {
            state
        }
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.relay.send_timeout_secs)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
    /// Send timeout of zero seconds.
    InvalidTimeout,
    /// Authentication enabled without any key.
    MissingApiKey,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
            Self::InvalidTimeout => write!(f, "send timeout must be at least 1 second"),
            Self::MissingApiKey => write!(f, "authentication is enabled but no API key is set"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert!(!config.security.auth.enabled);
        assert_eq!(config.relay.send_timeout_secs, 10);
        assert_eq!(config.bot.web_url, DEFAULT_WEB_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "server": { "host": "0.0.0.0", "port": 8080 },
            "security": { "auth": { "enabled": true, "api_keys": ["key1", "key2"] } },
            "relay": { "send_timeout_secs": 3 },
            "bot": { "web_url": "https://example.github.io/app/" }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.security.auth.api_keys.len(), 2);
        assert_eq!(config.send_timeout(), Duration::from_secs(3));
        assert_eq!(config.bot.web_url, "https://example.github.io/app/");
    }

    #[test]
    fn test_config_partial_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "server": { "port": 9000 } }"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.relay.send_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_apply_env() {
        let vars: HashMap<&str, &str> = [
            ("LOCATION_RELAY_PORT", "4000"),
            ("LOCATION_RELAY_API_KEY", "env-key"),
            ("LOCATION_RELAY_SEND_TIMEOUT", "5"),
            ("WEB_URL", "https://menu.example"),
            ("RUST_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 4000);
        assert!(config.security.auth.enabled);
        assert_eq!(config.security.auth.api_keys, vec!["env-key".to_string()]);
        assert_eq!(config.relay.send_timeout_secs, 5);
        assert_eq!(config.bot.web_url, "https://menu.example");
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_env_ignores_unparseable_port() {
        let mut config = Config::default();
        config.apply_env_from(|key| (key == "LOCATION_RELAY_PORT").then(|| "abc".to_string()));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            host: Some("192.168.1.1".parse().unwrap()),
            port: Some(5000),
            api_key: Some("test-key".to_string()),
            send_timeout_secs: Some(2),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 5000);
        assert!(config.security.auth.enabled);
        assert!(config
            .security
            .auth
            .api_keys
            .contains(&"test-key".to_string()));
        assert_eq!(config.relay.send_timeout_secs, 2);
    }

    #[test]
    fn test_args_without_values_keep_config() {
        let mut config = Config::default();
        config.server.port = 7000;
        config.apply_args(&Args::default());
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn test_apply_no_auth() {
        let mut config = Config::default();
        config.security.auth.enabled = true;

        let args = Args {
            no_auth: true,
            ..Args::default()
        };

        config.apply_args(&args);
        assert!(!config.security.auth.enabled);
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.relay.send_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout)));

        let mut config = Config::default();
        config.security.auth.enabled = true;
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_to_server_config() {
        let config = Config::default();
        let server_config = config.to_server_config().unwrap();

        assert_eq!(server_config.host, "127.0.0.1");
        assert_eq!(server_config.port, 3000);
        assert!(server_config.graceful_shutdown);
    }

    #[test]
    fn test_invalid_host() {
        let mut config = Config::default();
        config.server.host = "not-an-ip".to_string();

        assert!(matches!(
            config.to_server_config(),
            Err(ConfigError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_to_app_state_applies_auth() {
        let mut config = Config::default();
        config.security.auth.enabled = true;
        config.security.auth.api_keys.push("k".into());

        let state = config.to_app_state();
        assert!(state.auth.is_enabled());
        assert!(state.auth.is_valid("k"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"send_timeout_secs\""));
        assert!(json.contains("\"web_url\""));
    }
}
