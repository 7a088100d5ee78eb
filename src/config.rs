//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides. The
//! browser build feeds the same overrides from compile-time values through
//! [`Config::from_lookup`].

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub realtime: RealtimeConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub features: FeatureFlags,

    #[serde(default)]
    pub app: AppInfo,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// REST backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Realtime channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,
}

fn default_ws_url() -> String {
    "ws://localhost:8000".to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_interval() -> u64 {
    1000 // 1 second, multiplied by the attempt number
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_interval_ms: default_reconnect_interval(),
        }
    }
}

/// OAuth configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub google_client_id: String,
}

/// Feature toggles for optional UI surfaces
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub enable_ai_chat: bool,

    #[serde(default = "default_true")]
    pub enable_google_auth: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_ai_chat: true,
            enable_google_auth: true,
        }
    }
}

/// Display name and version
#[derive(Debug, Clone, Deserialize)]
pub struct AppInfo {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

fn default_app_name() -> String {
    "GroupChatAI".to_string()
}

fn default_app_version() -> String {
    "1.0.0".to_string()
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Where native front ends keep persisted client state
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: String,
}

#[cfg(not(target_arch = "wasm32"))]
fn default_storage_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("groupchat").to_string_lossy().to_string())
        .unwrap_or_else(|| "./groupchat_data".to_string())
}

#[cfg(target_arch = "wasm32")]
fn default_storage_dir() -> String {
    String::new()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults plus overrides from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.apply_overrides(lookup);
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from default locations or environment
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("groupchat").join("config.toml")),
            Some(PathBuf::from("./groupchat.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply `GROUPCHAT_*` overrides to an existing config
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("GROUPCHAT_API_URL") {
            self.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("GROUPCHAT_WS_URL") {
            self.realtime.ws_url = url.trim_end_matches('/').to_string();
        }
        if let Some(client_id) = lookup("GROUPCHAT_GOOGLE_CLIENT_ID") {
            self.auth.google_client_id = client_id;
        }

        if let Some(flag) = lookup("GROUPCHAT_ENABLE_AI_CHAT").and_then(|v| parse_flag(&v)) {
            self.features.enable_ai_chat = flag;
        }
        if let Some(flag) = lookup("GROUPCHAT_ENABLE_GOOGLE_AUTH").and_then(|v| parse_flag(&v)) {
            self.features.enable_google_auth = flag;
        }

        if let Some(name) = lookup("GROUPCHAT_APP_NAME") {
            self.app.name = name;
        }
        if let Some(version) = lookup("GROUPCHAT_APP_VERSION") {
            self.app.version = version;
        }

        if let Some(level) = lookup("GROUPCHAT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("GROUPCHAT_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Some(dir) = lookup("GROUPCHAT_STORAGE_DIR") {
            self.storage.dir = dir;
        }
    }

    /// Google sign-in is shown only when enabled and a client id is set
    pub fn google_auth_available(&self) -> bool {
        self.features.enable_google_auth && !self.auth.google_client_id.is_empty()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# GroupChat Configuration
#
# Environment variables override these settings:
# - GROUPCHAT_API_URL
# - GROUPCHAT_WS_URL
# - GROUPCHAT_GOOGLE_CLIENT_ID
# - GROUPCHAT_ENABLE_AI_CHAT
# - GROUPCHAT_ENABLE_GOOGLE_AUTH
# - GROUPCHAT_APP_NAME
# - GROUPCHAT_APP_VERSION
# - GROUPCHAT_LOG_LEVEL
# - GROUPCHAT_LOG_FORMAT
# - GROUPCHAT_STORAGE_DIR

[api]
# Backend base URL (the /api/v1 prefix is added by the client)
base_url = "http://localhost:8000"

# Request timeout (seconds)
request_timeout_secs = 30

[realtime]
# WebSocket base URL (the /ws path is added by the client)
ws_url = "ws://localhost:8000"

# Reconnect attempts after an unexpected close
max_reconnect_attempts = 5

# Base reconnect interval; attempt N waits N times this value (ms)
reconnect_interval_ms = 1000

[auth]
# Google OAuth client id (empty disables Google sign-in)
google_client_id = ""

[features]
enable_ai_chat = true
enable_google_auth = true

[app]
name = "GroupChatAI"
version = "1.0.0"

[logging]
# Log level (trace, debug, info, warn, error)
level = "info"

# Log format (pretty, json)
format = "pretty"

[storage]
# Directory for the persisted session (native front ends only)
# dir = "~/.local/share/groupchat"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(config.realtime.reconnect_interval_ms, 1000);
        assert_eq!(config.app.name, "GroupChatAI");
        assert!(config.features.enable_ai_chat);
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.realtime.ws_url, "ws://localhost:8000");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.auth.google_client_id.is_empty());
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GROUPCHAT_API_URL", "https://chat.example.com/"),
            ("GROUPCHAT_ENABLE_AI_CHAT", "false"),
            ("GROUPCHAT_ENABLE_GOOGLE_AUTH", "maybe"),
            ("GROUPCHAT_GOOGLE_CLIENT_ID", "client-123"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://chat.example.com");
        assert!(!config.features.enable_ai_chat);
        // Unparseable flags keep the default
        assert!(config.features.enable_google_auth);
        assert!(config.google_auth_available());
    }

    #[test]
    fn test_google_auth_requires_client_id() {
        let config = Config::default();
        assert!(!config.google_auth_available());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
