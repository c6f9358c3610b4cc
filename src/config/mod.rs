//! Configuration loading for the bookkeeping service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `LEDGER_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "LEDGER_";

/// Application configuration derived from `LEDGER_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// Bearer tokens accepted from the upstream identity gateway.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gateway_tokens: Vec<String>,
    #[serde(default)]
    pub license: LicenseConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// License registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LicenseConfig {
    /// Reject tenant requests when the tenant holds no valid license (default: true)
    ///
    /// Environment variable: `LEDGER_LICENSE_ENFORCEMENT`
    #[serde(default = "default_license_enforcement")]
    pub enforcement: bool,

    /// Days ahead of `valid_to` a license is reported as expiring soon (default: 30)
    ///
    /// Environment variable: `LEDGER_LICENSE_EXPIRY_WARNING_DAYS`
    #[serde(default = "default_license_expiry_warning_days")]
    pub expiry_warning_days: u32,

    /// Attempts at generating a non-colliding license key (default: 5)
    ///
    /// Environment variable: `LEDGER_LICENSE_KEY_MAX_ATTEMPTS`
    #[serde(default = "default_license_key_max_attempts")]
    pub key_max_attempts: u32,
}

/// Obligation ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LedgerConfig {
    /// Interval between installments when a plan request omits it (default: 30)
    ///
    /// Environment variable: `LEDGER_DEFAULT_INSTALLMENT_INTERVAL_DAYS`
    #[serde(default = "default_installment_interval_days")]
    pub default_installment_interval_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            gateway_tokens: Vec::new(),
            license: LicenseConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            enforcement: default_license_enforcement(),
            expiry_warning_days: default_license_expiry_warning_days(),
            key_max_attempts: default_license_key_max_attempts(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_installment_interval_days: default_installment_interval_days(),
        }
    }
}

impl LicenseConfig {
    /// Validate license configuration bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.expiry_warning_days == 0 || self.expiry_warning_days > 365 {
            return Err(ConfigError::InvalidExpiryWarningDays {
                value: self.expiry_warning_days,
            });
        }

        if self.key_max_attempts == 0 {
            return Err(ConfigError::InvalidKeyMaxAttempts {
                value: self.key_max_attempts,
            });
        }

        Ok(())
    }
}

impl LedgerConfig {
    /// Validate ledger configuration bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_installment_interval_days == 0 {
            return Err(ConfigError::InvalidInstallmentInterval {
                value: self.default_installment_interval_days,
            });
        }
        Ok(())
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.gateway_tokens.is_empty() {
            config.gateway_tokens = vec!["[REDACTED]".to_string()];
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway_tokens.is_empty() {
            return Err(ConfigError::MissingGatewayTokens);
        }

        if self.log_format != "json" && self.log_format != "pretty" {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        self.license.validate()?;
        self.ledger.validate()?;

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://bookkeeping.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_license_enforcement() -> bool {
    true
}

fn default_license_expiry_warning_days() -> u32 {
    30
}

fn default_license_key_max_attempts() -> u32 {
    5
}

fn default_installment_interval_days() -> u32 {
    30
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("no gateway tokens configured; set LEDGER_GATEWAY_TOKEN or LEDGER_GATEWAY_TOKENS")]
    MissingGatewayTokens,
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("invalid boolean for {key}: '{value}'")]
    InvalidBool { key: String, value: String },
    #[error("license expiry warning window must be between 1 and 365 days, got {value}")]
    InvalidExpiryWarningDays { value: u32 },
    #[error("license key generation needs at least one attempt, got {value}")]
    InvalidKeyMaxAttempts { value: u32 },
    #[error("default installment interval must be positive, got {value}")]
    InvalidInstallmentInterval { value: u32 },
}

/// Loads configuration using layered `.env` files and `LEDGER_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads `.env`, `.env.local`, `.env.<profile>`, `.env.<profile>.local`, then the
    /// process environment, later layers overriding earlier ones.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = layered
            .remove("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = layered
            .remove("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);

        // Either a comma-separated list or a single token
        let gateway_tokens = if let Some(tokens) = layered.remove("GATEWAY_TOKENS") {
            tokens
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        } else if let Some(token) = layered.remove("GATEWAY_TOKEN") {
            vec![token.trim().to_string()]
        } else {
            Vec::new()
        };

        let license = LicenseConfig {
            enforcement: match layered.remove("LICENSE_ENFORCEMENT") {
                Some(value) => parse_bool("LICENSE_ENFORCEMENT", &value)?,
                None => default_license_enforcement(),
            },
            expiry_warning_days: layered
                .remove("LICENSE_EXPIRY_WARNING_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_license_expiry_warning_days),
            key_max_attempts: layered
                .remove("LICENSE_KEY_MAX_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_license_key_max_attempts),
        };

        let ledger = LedgerConfig {
            default_installment_interval_days: layered
                .remove("DEFAULT_INSTALLMENT_INTERVAL_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_installment_interval_days),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            gateway_tokens,
            license,
            ledger,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
