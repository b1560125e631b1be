//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use fenix_config::ConfigError;
use fenix_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Fenix cloud")]
    #[diagnostic(
        code(fenix::connection_failed),
        help(
            "Check your network connection and the api_url / identity_url settings.\n\
             Run: fenix config show"
        )
    )]
    ConnectionFailed {
        #[source]
        source: CoreError,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(fenix::auth_failed),
        help(
            "The access token was rejected or could not be decoded.\n\
             Try: fenix token refresh\n\
             Or store a fresh token pair with: fenix config init"
        )
    )]
    AuthFailed {
        #[source]
        source: CoreError,
    },

    #[error("No {token} configured")]
    #[diagnostic(
        code(fenix::no_credentials),
        help(
            "Configure credentials with: fenix config init\n\
             Or set FENIX_ACCESS_TOKEN and FENIX_REFRESH_TOKEN."
        )
    )]
    NoCredentials { token: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Thermostat '{identifier}' not found")]
    #[diagnostic(
        code(fenix::not_found),
        help("Run: fenix devices to see available thermostats")
    )]
    NotFound { identifier: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(fenix::api_error))]
    Core(CoreError),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fenix::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found")]
    #[diagnostic(
        code(fenix::no_config),
        help(
            "Create one with: fenix config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(fenix::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Prompt failed: {0}")]
    #[diagnostic(
        code(fenix::prompt),
        help("`fenix config init` needs an interactive terminal.")
    )]
    Prompt(#[from] dialoguer::Error),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(fenix::json))]
    Json(#[from] serde_json::Error),
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { identifier } => Self::NotFound { identifier },
            CoreError::Validation { field, reason } => Self::Validation { field, reason },
            err if err.is_auth_failure() => Self::AuthFailed { source: err },
            err if is_connection_failure(&err) => Self::ConnectionFailed { source: err },
            err => Self::Core(err),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { token } => Self::NoCredentials { token },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

fn is_connection_failure(err: &CoreError) -> bool {
    use fenix_api::Error as ApiError;

    let source = match err {
        CoreError::InventoryFetch { source }
        | CoreError::DeviceFetch { source, .. }
        | CoreError::DeviceWrite { source, .. }
        | CoreError::Refresh {
            source: Some(source),
            ..
        } => source,
        _ => return false,
    };
    match source {
        ApiError::Transport(e) => e.is_connect() || e.is_timeout(),
        ApiError::Tls(_) => true,
        _ => false,
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Core(_)
            | Self::NoConfig { .. }
            | Self::Config(_)
            | Self::Prompt(_)
            | Self::Io(_)
            | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_identifier() {
        let err = CliError::from(CoreError::NotFound {
            identifier: "Kitchen".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(err.to_string(), "Thermostat 'Kitchen' not found");
    }

    #[test]
    fn rejected_token_is_auth_failure() {
        let err = CliError::from(CoreError::DeviceFetch {
            device: "dev-1".into(),
            source: fenix_api::Error::Authentication {
                message: "expired".into(),
            },
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn missing_token_maps_to_no_credentials() {
        let err = CliError::from(ConfigError::NoCredentials {
            token: "refresh token".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert_eq!(err.to_string(), "No refresh token configured");
    }

    #[test]
    fn server_error_stays_general() {
        let err = CliError::from(CoreError::DeviceWrite {
            device: "dev-1".into(),
            source: fenix_api::Error::Api {
                status: 500,
                message: "boom".into(),
            },
        });
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
