//! Configuration loading, validation, and management for Zipgate.
//!
//! Loads configuration from `~/.zipgate/config.toml` with environment
//! variable overrides. Validates all settings at startup. The resulting
//! [`GateConfig`] is passed explicitly into every component constructor;
//! nothing reads global state after startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use zipgate_core::Credential;

const MIB: u64 = 1024 * 1024;

/// The root configuration structure.
///
/// Maps directly to `~/.zipgate/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Remote Zipline server settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Staging thresholds and the temporary root
    #[serde(default)]
    pub staging: StagingConfig,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Orphan sweep thresholds
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_url")]
    pub url: String,

    /// Bearer token. Prefer the `ZIPLINE_TOKEN` environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

fn default_url() -> String {
    "http://localhost:3000".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_concurrent_requests() -> usize {
    5
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("token", &redact(&self.token))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Parent of `users/` and `locks/`.
    #[serde(default = "default_tmp_root")]
    pub tmp_root: PathBuf,

    /// Files strictly smaller than this are staged in memory.
    #[serde(default = "default_memory_threshold")]
    pub memory_threshold_bytes: u64,

    /// Hard ceiling; anything larger is rejected before any I/O.
    #[serde(default = "default_max_payload")]
    pub max_payload_bytes: u64,
}

fn default_tmp_root() -> PathBuf {
    std::env::temp_dir().join("zipgate")
}
fn default_memory_threshold() -> u64 {
    5 * MIB
}
fn default_max_payload() -> u64 {
    100 * MIB
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            tmp_root: default_tmp_root(),
            memory_threshold_bytes: default_memory_threshold(),
            max_payload_bytes: default_max_payload(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Sandbox directories untouched for longer than this are reclaimed.
    #[serde(default = "default_sandbox_max_age_secs")]
    pub sandbox_max_age_secs: u64,

    /// Lock markers older than this are considered abandoned.
    #[serde(default = "default_lock_stale_secs")]
    pub lock_stale_secs: u64,

    /// Upper bound on the startup sweep.
    #[serde(default = "default_sweep_timeout_secs")]
    pub sweep_timeout_secs: u64,
}

fn default_sandbox_max_age_secs() -> u64 {
    24 * 60 * 60
}
fn default_lock_stale_secs() -> u64 {
    30 * 60
}
fn default_sweep_timeout_secs() -> u64 {
    30
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            sandbox_max_age_secs: default_sandbox_max_age_secs(),
            lock_stale_secs: default_lock_stale_secs(),
            sweep_timeout_secs: default_sweep_timeout_secs(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl GateConfig {
    /// Load configuration from the default path (~/.zipgate/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `ZIPLINE_TOKEN`
    /// - `ZIPLINE_URL`
    /// - `ZIPGATE_TMP_ROOT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("ZIPLINE_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.remote.token = Some(token);
        }
        if let Some(url) = lookup("ZIPLINE_URL").filter(|u| !u.trim().is_empty()) {
            self.remote.url = url;
        }
        if let Some(root) = lookup("ZIPGATE_TMP_ROOT").filter(|r| !r.trim().is_empty()) {
            self.staging.tmp_root = PathBuf::from(root);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".zipgate")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staging.memory_threshold_bytes > self.staging.max_payload_bytes {
            return Err(ConfigError::ValidationError(
                "staging.memory_threshold_bytes must not exceed staging.max_payload_bytes".into(),
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_secs must be > 0".into(),
            ));
        }
        if self.remote.max_concurrent_requests == 0 {
            return Err(ConfigError::ValidationError(
                "remote.max_concurrent_requests must be > 0".into(),
            ));
        }
        if !self.remote.url.starts_with("http://") && !self.remote.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(
                "remote.url must start with http:// or https://".into(),
            ));
        }
        Ok(())
    }

    /// The configured credential, if any.
    pub fn credential(&self) -> Option<Credential> {
        self.remote.token.clone().and_then(Credential::new)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn sandbox_max_age(&self) -> Duration {
        Duration::from_secs(self.cleanup.sandbox_max_age_secs)
    }

    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.cleanup.lock_stale_secs)
    }

    pub fn sweep_timeout(&self) -> Duration {
        Duration::from_secs(self.cleanup.sweep_timeout_secs)
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for zipgate_core::Error {
    fn from(e: ConfigError) -> Self {
        zipgate_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = GateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.staging.memory_threshold_bytes, 5 * MIB);
        assert_eq!(config.staging.max_payload_bytes, 100 * MIB);
        assert_eq!(config.cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.remote.max_concurrent_requests, 5);
        assert_eq!(config.sandbox_max_age(), Duration::from_secs(86_400));
        assert_eq!(config.lock_stale_after(), Duration::from_secs(1_800));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = GateConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: GateConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.remote.url, config.remote.url);
        assert_eq!(
            parsed.staging.memory_threshold_bytes,
            config.staging.memory_threshold_bytes
        );
    }

    #[test]
    fn threshold_above_ceiling_rejected() {
        let mut config = GateConfig::default();
        config.staging.memory_threshold_bytes = 200 * MIB;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_ttl_rejected() {
        let mut config = GateConfig::default();
        config.cache.ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_url_rejected() {
        let mut config = GateConfig::default();
        config.remote.url = "ftp://files.example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = GateConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.remote.url, "http://localhost:3000");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[remote]
url = "https://zipline.example.com"

[cache]
ttl_secs = 10
"#,
        )
        .unwrap();

        let config = GateConfig::load_from(&path).unwrap();
        assert_eq!(config.remote.url, "https://zipline.example.com");
        assert_eq!(config.cache.ttl_secs, 10);
        assert_eq!(config.staging.memory_threshold_bytes, 5 * MIB);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "remote = [unterminated").unwrap();
        assert!(matches!(
            GateConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ZIPLINE_TOKEN", "tok-123"),
            ("ZIPLINE_URL", "https://z.example.com"),
            ("ZIPGATE_TMP_ROOT", "/var/tmp/zg"),
        ]);
        let mut config = GateConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.remote.url, "https://z.example.com");
        assert_eq!(config.staging.tmp_root, PathBuf::from("/var/tmp/zg"));
        assert_eq!(config.credential().unwrap().expose(), "tok-123");
    }

    #[test]
    fn blank_env_token_ignored() {
        let mut config = GateConfig::default();
        config.apply_env(|k| (k == "ZIPLINE_TOKEN").then(|| "  ".to_string()));
        assert!(config.credential().is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let mut config = GateConfig::default();
        config.remote.token = Some("very-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = GateConfig::default_toml();
        assert!(toml_str.contains("memory_threshold_bytes"));
        assert!(toml_str.contains("ttl_secs"));
    }
}
