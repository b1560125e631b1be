//! Configuration for the fenix bridge.
//!
//! A single TOML file merged with `FENIX_`-prefixed environment variables,
//! token resolution (env var, keyring, plaintext), and translation to
//! `fenix_core::BridgeConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fenix_api::{DEFAULT_API_URL, DEFAULT_IDENTITY_URL, Endpoints, TlsMode, TransportConfig};
use fenix_core::{BridgeConfig, TemperatureUnit};

/// Keyring service name for stored tokens.
pub const KEYRING_SERVICE: &str = "fenix-bridge";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {token} configured")]
    NoCredentials { token: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Access token (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Environment variable holding the access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_env: Option<String>,

    /// Refresh token (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Environment variable holding the refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_env: Option<String>,

    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_minutes: u64,

    #[serde(default = "default_token_check_interval")]
    pub token_check_interval_minutes: u64,

    #[serde(default = "default_refresh_skew")]
    pub token_refresh_skew_secs: u64,

    /// 0 lists devices only at startup.
    #[serde(default)]
    pub inventory_interval_minutes: u64,

    /// Directory for the credential file and accessory cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_identity_url")]
    pub identity_url: String,

    /// Path to a custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: None,
            access_token_env: None,
            refresh_token: None,
            refresh_token_env: None,
            temperature_unit: TemperatureUnit::default(),
            poll_interval_minutes: default_poll_interval(),
            token_check_interval_minutes: default_token_check_interval(),
            token_refresh_skew_secs: default_refresh_skew(),
            inventory_interval_minutes: 0,
            storage_path: None,
            api_url: default_api_url(),
            identity_url: default_identity_url(),
            ca_cert: None,
            timeout_secs: default_timeout(),
            defaults: Defaults::default(),
        }
    }
}

/// CLI presentation defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_poll_interval() -> u64 {
    30
}
fn default_token_check_interval() -> u64 {
    15
}
fn default_refresh_skew() -> u64 {
    3600
}
fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}
fn default_identity_url() -> String {
    DEFAULT_IDENTITY_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "fenix-bridge", "fenix")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    for part in parts {
        p.push(part);
    }
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "fenix", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default directory for persisted credentials and the accessory cache.
pub fn default_storage_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "fenix"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

impl Config {
    pub fn storage_path(&self) -> PathBuf {
        self.storage_path.clone().unwrap_or_else(default_storage_path)
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load the config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` plus environment. A missing file yields
/// defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FENIX_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Saving ──────────────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Which token of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn keyring_user(self) -> &'static str {
        match self {
            Self::Access => "access-token",
            Self::Refresh => "refresh-token",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Access => "access token",
            Self::Refresh => "refresh token",
        }
    }
}

/// Resolve a seed token: named env var, then keyring, then plaintext.
pub fn resolve_token(cfg: &Config, kind: TokenKind) -> Result<SecretString, ConfigError> {
    let (env_name, plaintext) = match kind {
        TokenKind::Access => (&cfg.access_token_env, &cfg.access_token),
        TokenKind::Refresh => (&cfg.refresh_token_env, &cfg.refresh_token),
    };

    // 1. Named env var
    if let Some(name) = env_name {
        if let Ok(val) = std::env::var(name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, kind.keyring_user()) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config (or FENIX_ACCESS_TOKEN / FENIX_REFRESH_TOKEN)
    if let Some(value) = plaintext.as_ref().filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.clone()));
    }

    Err(ConfigError::NoCredentials {
        token: kind.label().into(),
    })
}

/// Store a token in the system keyring.
pub fn store_token(kind: TokenKind, value: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, kind.keyring_user())?.set_password(value)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

fn minutes(field: &str, value: u64) -> Result<Duration, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be at least 1 minute".into(),
        });
    }
    Ok(Duration::from_secs(value.saturating_mul(60)))
}

/// Endpoints and transport settings, without touching credentials.
pub fn transport_settings(cfg: &Config) -> Result<(Endpoints, TransportConfig), ConfigError> {
    let endpoints =
        Endpoints::new(&cfg.api_url, &cfg.identity_url).map_err(|e| ConfigError::Validation {
            field: "api_url/identity_url".into(),
            reason: e.to_string(),
        })?;

    let tls = cfg
        .ca_cert
        .clone()
        .map_or(TlsMode::System, TlsMode::CustomCa);
    let transport = TransportConfig {
        tls,
        ..TransportConfig::default()
    }
    .with_timeout(Duration::from_secs(cfg.timeout_secs));

    Ok((endpoints, transport))
}

/// Build the runtime `BridgeConfig`, resolving both seed tokens.
pub fn to_bridge_config(cfg: &Config) -> Result<BridgeConfig, ConfigError> {
    let (endpoints, transport) = transport_settings(cfg)?;

    Ok(BridgeConfig {
        endpoints,
        transport,
        access_token: resolve_token(cfg, TokenKind::Access)?,
        refresh_token: resolve_token(cfg, TokenKind::Refresh)?,
        temperature_unit: cfg.temperature_unit,
        poll_interval: minutes("poll_interval_minutes", cfg.poll_interval_minutes)?,
        token_check_interval: minutes(
            "token_check_interval_minutes",
            cfg.token_check_interval_minutes,
        )?,
        refresh_skew: Duration::from_secs(cfg.token_refresh_skew_secs),
        inventory_interval: match cfg.inventory_interval_minutes {
            0 => None,
            n => Some(minutes("inventory_interval_minutes", n)?),
        },
        storage_path: cfg.storage_path(),
    })
}
