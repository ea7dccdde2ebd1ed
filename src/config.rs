//! Runner configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via OPENLIVE_CONFIG)
//! 3. Environment variables

use openlive_api::{ApiConfig, Credentials, DEFAULT_BASE_URL};
use openlive_client::SessionConfig;
use openlive_protocol::{
    DecoderConfig, DEFAULT_MAX_BATCH_DEPTH, DEFAULT_MAX_DECOMPRESSED_SIZE,
    DEFAULT_MAX_FRAME_SIZE, HEADER_LEN,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Platform credentials.
    pub credentials: CredentialsConfig,
    /// App to start.
    pub app: AppConfig,
    /// Control-plane settings.
    pub api: ApiSection,
    /// Feed session settings.
    pub session: SessionSection,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("OPENLIVE_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.credentials.apply_env_overrides();
        self.app.apply_env_overrides();
        self.api.apply_env_overrides();
        self.session.apply_env_overrides();
    }

    /// Checks that everything needed to start is present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.credentials.validate()?;
        self.app.validate()?;
        self.api.validate()?;
        self.session.validate()
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Platform credentials.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub access_key: String,
    pub access_secret: String,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("access_key", &self.access_key)
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

impl CredentialsConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENLIVE_ACCESS_KEY") {
            self.access_key = key;
        }
        if let Ok(secret) = std::env::var("OPENLIVE_ACCESS_SECRET") {
            self.access_secret = secret;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.access_key.is_empty() || self.access_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "credentials.access_key and credentials.access_secret are required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_credentials(&self) -> Credentials {
        Credentials::new(&self.access_key, &self.access_secret)
    }
}

/// App to start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// App id issued by the platform.
    pub app_id: i64,
    /// Streamer identity code.
    pub code: String,
}

impl AppConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(app_id) = std::env::var("OPENLIVE_APP_ID") {
            if let Ok(id) = app_id.parse() {
                self.app_id = id;
            }
        }
        if let Ok(code) = std::env::var("OPENLIVE_CODE") {
            self.code = code;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id <= 0 {
            return Err(ConfigError::ValidationError(
                "app.app_id must be positive".to_string(),
            ));
        }
        if self.code.is_empty() {
            return Err(ConfigError::ValidationError(
                "app.code is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Control-plane settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// App heartbeat interval in seconds.
    pub keepalive_interval_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
            keepalive_interval_secs: 20,
        }
    }
}

impl ApiSection {
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("OPENLIVE_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(interval) = std::env::var("OPENLIVE_KEEPALIVE_INTERVAL") {
            if let Ok(secs) = interval.parse() {
                self.keepalive_interval_secs = secs;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url is required".to_string(),
            ));
        }
        if self.timeout_secs == 0 || self.keepalive_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_secs and api.keepalive_interval_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::default()
            .with_base_url(&self.base_url)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }
}

/// Feed session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub heartbeat_interval_secs: u64,
    pub auth_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_frame_size: u32,
    pub max_decompressed_size: usize,
    pub max_batch_depth: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 20,
            auth_timeout_secs: 10,
            connect_timeout_secs: 10,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            max_batch_depth: DEFAULT_MAX_BATCH_DEPTH,
        }
    }
}

impl SessionSection {
    fn apply_env_overrides(&mut self) {
        if let Ok(interval) = std::env::var("OPENLIVE_HEARTBEAT_INTERVAL") {
            if let Ok(secs) = interval.parse() {
                self.heartbeat_interval_secs = secs;
            }
        }
        if let Ok(timeout) = std::env::var("OPENLIVE_AUTH_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.auth_timeout_secs = secs;
            }
        }
        if let Ok(size) = std::env::var("OPENLIVE_MAX_FRAME_SIZE") {
            if let Ok(n) = size.parse() {
                self.max_frame_size = n;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "session.heartbeat_interval_secs must be non-zero".to_string(),
            ));
        }
        if self.max_frame_size < HEADER_LEN as u32 {
            return Err(ConfigError::ValidationError(format!(
                "session.max_frame_size must be at least {}",
                HEADER_LEN
            )));
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_heartbeat_interval(Duration::from_secs(self.heartbeat_interval_secs))
            .with_auth_timeout(Duration::from_secs(self.auth_timeout_secs))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_decoder(
                DecoderConfig::default()
                    .with_max_frame_size(self.max_frame_size)
                    .with_max_decompressed_size(self.max_decompressed_size)
                    .with_max_batch_depth(self.max_batch_depth),
            )
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
