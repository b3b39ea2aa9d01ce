//! Configuration loading
//!
//! Resolution follows a fixed priority order:
//! 1. Command-line argument (highest priority, applied by the binary)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: a warning is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config and data directories
const APP_DIR: &str = "speedy-status";

/// Longest token lifetime accepted from configuration
pub const MAX_TOKEN_LIFETIME_DAYS: i64 = 3650;

/// Top-level service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Listen address for the HTTP server
    pub bind_addr: String,
    /// Public frontend URL used when building magic links
    pub base_url: String,
    /// Origin allowed by CORS
    pub cors_origin: String,
    pub auth: AuthSettings,
    pub rate_limit: RateLimitSettings,
    pub ai: AiSettings,
    pub scheduler: SchedulerSettings,
}

/// Token signing and lifetimes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Signing secret; when empty, a secret is generated and kept in the database
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub magic_link_expire_hours: i64,
    /// Lifetime of the team-scoped access token issued for a magic link
    pub submission_token_expire_minutes: i64,
}

/// Login attempt limiting
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub login_attempts: u32,
    pub login_period_secs: u64,
}

/// Language-model summarizer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
}

/// Background prompt/summary scheduler
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub poll_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_addr: "127.0.0.1:8000".to_string(),
            base_url: "http://localhost:5173".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            auth: AuthSettings::default(),
            rate_limit: RateLimitSettings::default(),
            ai: AiSettings::default(),
            scheduler: SchedulerSettings::default(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
            magic_link_expire_hours: 72,
            submission_token_expire_minutes: 30,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            login_attempts: 5,
            login_period_secs: 60,
        }
    }
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_secs: 60,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 60,
        }
    }
}

impl AuthSettings {
    pub fn access_token_ttl(&self) -> Duration {
        bounded_ttl(Duration::try_minutes(self.access_token_expire_minutes))
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        bounded_ttl(Duration::try_days(self.refresh_token_expire_days))
    }

    pub fn magic_link_ttl(&self) -> Duration {
        bounded_ttl(Duration::try_hours(self.magic_link_expire_hours))
    }

    pub fn submission_token_ttl(&self) -> Duration {
        bounded_ttl(Duration::try_minutes(self.submission_token_expire_minutes))
    }

    fn validate(&self) -> Result<()> {
        let lifetimes = [
            ("access_token_expire_minutes", Duration::try_minutes(self.access_token_expire_minutes)),
            ("refresh_token_expire_days", Duration::try_days(self.refresh_token_expire_days)),
            ("magic_link_expire_hours", Duration::try_hours(self.magic_link_expire_hours)),
            (
                "submission_token_expire_minutes",
                Duration::try_minutes(self.submission_token_expire_minutes),
            ),
        ];
        for (name, ttl) in lifetimes {
            match ttl {
                Some(ttl) if ttl > Duration::zero() && ttl <= max_token_lifetime() => {}
                _ => {
                    return Err(Error::Config(format!(
                        "auth.{} must be positive and at most {} days",
                        name, MAX_TOKEN_LIFETIME_DAYS
                    )))
                }
            }
        }
        Ok(())
    }
}

fn max_token_lifetime() -> Duration {
    Duration::days(MAX_TOKEN_LIFETIME_DAYS)
}

/// Clamp to the configurable maximum; unvalidated settings never overflow
fn bounded_ttl(ttl: Option<Duration>) -> Duration {
    ttl.map_or(max_token_lifetime(), |ttl| ttl.min(max_token_lifetime()))
}

impl Settings {
    /// Load settings from an explicit TOML file, the platform config file, or
    /// defaults, then apply environment overrides and validate
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut settings = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_file() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    warn!("No config file found, using compiled defaults");
                    Self::default()
                }
            },
        };

        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let settings = Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(settings)
    }

    /// Parse TOML text; absent keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Override fields from `STATUS_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("STATUS_DATABASE") {
            self.database_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STATUS_BIND") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("STATUS_BASE_URL") {
            self.base_url = v;
        }
        if let Ok(v) = std::env::var("STATUS_SECRET_KEY") {
            self.auth.secret_key = v;
        }
        if let Ok(v) = std::env::var("STATUS_AI_BASE_URL") {
            self.ai.base_url = v;
        }
        if let Ok(v) = std::env::var("STATUS_AI_API_KEY") {
            self.ai.api_key = v;
        }
        if let Ok(v) = std::env::var("STATUS_AI_MODEL") {
            self.ai.model = v;
        }
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.login_attempts == 0 {
            return Err(Error::Config("rate_limit.login_attempts must be > 0".to_string()));
        }
        if self.rate_limit.login_period_secs == 0 {
            return Err(Error::Config("rate_limit.login_period_secs must be > 0".to_string()));
        }
        self.auth.validate()?;
        if self.ai.max_retries == 0 {
            return Err(Error::Config("ai.max_retries must be >= 1".to_string()));
        }
        if self.scheduler.poll_interval_secs == 0 {
            return Err(Error::Config("scheduler.poll_interval_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Platform config file location, e.g. `~/.config/speedy-status/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./speedy_status_data"))
        .join("status.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.rate_limit.login_attempts, 5);
        assert_eq!(settings.ai.model, "gpt-4o-mini");
        assert!(settings.database_path.ends_with("status.db"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            bind_addr = "0.0.0.0:9000"

            [ai]
            model = "gpt-4o"
            "#,
        )
        .unwrap();

        assert_eq!(settings.bind_addr, "0.0.0.0:9000");
        assert_eq!(settings.ai.model, "gpt-4o");
        assert_eq!(settings.ai.max_retries, 3);
        assert_eq!(settings.auth.refresh_token_expire_days, 7);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = Settings::from_toml("bind_addr = [");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut settings = Settings::default();
        settings.rate_limit.login_attempts = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_oversized_token_lifetime_rejected() {
        let settings = Settings::from_toml("[auth]\nrefresh_token_expire_days = 1000000000000").unwrap();
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        let mut settings = Settings::default();
        settings.auth.magic_link_expire_hours = MAX_TOKEN_LIFETIME_DAYS * 24 + 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_token_ttls_are_clamped() {
        let mut auth = AuthSettings::default();
        assert_eq!(auth.access_token_ttl(), Duration::minutes(30));
        assert_eq!(auth.refresh_token_ttl(), Duration::days(7));
        assert_eq!(auth.magic_link_ttl(), Duration::hours(72));

        auth.refresh_token_expire_days = i64::MAX;
        auth.submission_token_expire_minutes = i64::MAX;
        assert_eq!(auth.refresh_token_ttl(), Duration::days(MAX_TOKEN_LIFETIME_DAYS));
        assert_eq!(auth.submission_token_ttl(), Duration::days(MAX_TOKEN_LIFETIME_DAYS));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut settings = Settings::default();
        settings.ai.max_retries = 0;
        assert!(settings.validate().is_err());
    }
}
