//! Configuration loading and resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `CLUBSITE_CONFIG` environment variable
//! 3. User config file (`<config_dir>/clubsite/config.toml`)
//! 4. System config file (`/etc/clubsite/config.toml`, Unix only)
//! 5. Compiled defaults (fallback)
//!
//! A missing config file is not fatal: the service logs a warning and starts
//! with defaults. Secrets may be supplied through environment variables,
//! which override whatever the file says.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "CLUBSITE_CONFIG";

/// Environment overrides for secrets and deployment-specific values
pub const ENV_ACCESS_TOKEN: &str = "CLUBSITE_ACCESS_TOKEN";
pub const ENV_IDENTITY_API_KEY: &str = "CLUBSITE_IDENTITY_API_KEY";
pub const ENV_STORAGE_BUCKET: &str = "CLUBSITE_STORAGE_BUCKET";
pub const ENV_FIRESTORE_PROJECT: &str = "CLUBSITE_FIRESTORE_PROJECT";

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub firestore: FirestoreConfig,
    pub legacy: LegacyConfig,
    pub timeouts: TimeoutConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
    /// Maximum accepted multipart body size in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5780".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Which backend implementations to wire up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Firestore + Cloud Storage + Identity Toolkit
    #[default]
    Google,
    /// In-process stores and static admin tokens (development only)
    Memory,
}

/// Backend selection and shared credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// OAuth access token used for storage and document API calls
    pub access_token: Option<String>,
}

/// Identity verification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Web API key for the identity provider's lookup endpoint
    pub identity_api_key: Option<String>,
    /// Identity provider REST base URL
    pub identity_endpoint: String,
    /// Statically configured admin tokens (memory backend)
    pub static_tokens: Vec<StaticToken>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identity_api_key: None,
            identity_endpoint: "https://identitytoolkit.googleapis.com/v1".to_string(),
            static_tokens: Vec::new(),
        }
    }
}

/// One static token, stored as its SHA-256 digest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticToken {
    /// Lowercase hex SHA-256 of the bearer token
    pub sha256: String,
    /// Subject id reported for this token
    pub subject: String,
    /// Whether the token carries the administrator claim
    #[serde(default = "default_true")]
    pub admin: bool,
}

/// Object storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket name; uploads fail with `StorageUnavailable` when absent
    pub bucket: Option<String>,
    /// Base of public object URLs (`<base>/<bucket>/<key>`)
    pub public_base_url: String,
    /// Storage JSON API base URL
    pub api_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            public_base_url: "https://storage.googleapis.com".to_string(),
            api_base_url: "https://storage.googleapis.com".to_string(),
        }
    }
}

/// Document database settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirestoreConfig {
    pub project_id: Option<String>,
    pub database: String,
    pub api_base_url: String,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database: "(default)".to_string(),
            api_base_url: "https://firestore.googleapis.com/v1".to_string(),
        }
    }
}

/// Legacy CSV data location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    pub csv_dir: PathBuf,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from("./data"),
        }
    }
}

/// Per-call timeouts in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub verify_ms: u64,
    pub upload_ms: u64,
    pub write_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            verify_ms: 10_000,
            upload_ms: 30_000,
            write_ms: 10_000,
        }
    }
}

fn default_true() -> bool {
    true
}

impl ServiceConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply environment overrides using the given lookup
    ///
    /// Empty values are ignored so an exported-but-blank variable never wipes
    /// a value from the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(ENV_ACCESS_TOKEN) {
            self.backend.access_token = Some(token);
        }
        if let Some(key) = get(ENV_IDENTITY_API_KEY) {
            self.auth.identity_api_key = Some(key);
        }
        if let Some(bucket) = get(ENV_STORAGE_BUCKET) {
            self.storage.bucket = Some(bucket);
        }
        if let Some(project) = get(ENV_FIRESTORE_PROJECT) {
            self.firestore.project_id = Some(project);
        }
    }

    /// Validate values that serde cannot check
    pub fn validate(&self) -> Result<()> {
        if self.server.max_upload_bytes == 0 {
            return Err(Error::InvalidInput(
                "server.max_upload_bytes must be greater than zero".to_string(),
            ));
        }

        for token in &self.auth.static_tokens {
            let is_hex_digest =
                token.sha256.len() == 64 && token.sha256.chars().all(|c| c.is_ascii_hexdigit());
            if !is_hex_digest {
                return Err(Error::InvalidInput(format!(
                    "auth.static_tokens entry for '{}' must be a 64-character hex SHA-256 digest",
                    token.subject
                )));
            }
        }

        Ok(())
    }

    /// Secret values that must never appear in error messages
    pub fn secrets(&self) -> Vec<String> {
        [
            self.backend.access_token.clone(),
            self.auth.identity_api_key.clone(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Resolves which config file to load
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Find the config file path following the priority order
    ///
    /// Returns `None` when no candidate exists; an explicit CLI or env path is
    /// returned even if missing so the caller can report it.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        let user_config = dirs::config_dir().map(|d| d.join("clubsite").join("config.toml"));
        if let Some(path) = user_config {
            if path.exists() {
                return Some(path);
            }
        }

        if cfg!(unix) {
            let system_config = PathBuf::from("/etc/clubsite/config.toml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load, apply process environment overrides and validate
    pub fn load(&self) -> Result<ServiceConfig> {
        let mut config = match self.resolve_path() {
            Some(path) => {
                let config = ServiceConfig::from_file(&path)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => {
                warn!("No configuration file found, using compiled defaults");
                ServiceConfig::default()
            }
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }
}
