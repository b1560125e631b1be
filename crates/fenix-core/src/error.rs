// ── Core error types ──
//
// Lifecycle-oriented errors from fenix-core. Each variant names the stage
// that failed (decode, refresh, inventory, poll, write, persistence), since
// the bridge's policy is decided per stage: log, keep the last good data,
// try again on the next tick.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Credential errors ────────────────────────────────────────────
    #[error("Access token is not a well-formed JWT: {reason}")]
    CredentialDecode { reason: String },

    #[error("Token refresh failed: {message}")]
    Refresh {
        message: String,
        #[source]
        source: Option<fenix_api::Error>,
    },

    // ── Remote data errors ───────────────────────────────────────────
    #[error("Could not list devices: {source}")]
    InventoryFetch {
        #[source]
        source: fenix_api::Error,
    },

    #[error("Could not read thermostat {device}: {source}")]
    DeviceFetch {
        device: String,
        #[source]
        source: fenix_api::Error,
    },

    #[error("Could not write to thermostat {device}: {source}")]
    DeviceWrite {
        device: String,
        #[source]
        source: fenix_api::Error,
    },

    // ── Local state errors ───────────────────────────────────────────
    #[error("Could not persist credentials to {path}: {reason}")]
    Persistence { path: String, reason: String },

    #[error("Accessory cache error: {message}")]
    HostCache { message: String },

    #[error("Device not found: {identifier}")]
    NotFound { identifier: String },

    #[error("Invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if the failure came from a rejected bearer token.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::InventoryFetch { source }
            | Self::DeviceFetch { source, .. }
            | Self::DeviceWrite { source, .. } => source.is_auth_expired(),
            Self::Refresh {
                source: Some(source),
                ..
            } => source.is_auth_expired() || source.status() == Some(400),
            Self::CredentialDecode { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if a retry on the next scheduled tick may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InventoryFetch { source }
            | Self::DeviceFetch { source, .. }
            | Self::DeviceWrite { source, .. } => source.is_transient(),
            Self::Refresh { source, .. } => {
                source.as_ref().is_none_or(fenix_api::Error::is_transient)
            }
            Self::Persistence { .. } => true,
            _ => false,
        }
    }

    /// Wrap a failure to build the HTTP client (bad URL, unreadable CA).
    pub fn client_setup(err: &fenix_api::Error) -> Self {
        CoreError::Config {
            message: format!("HTTP client setup failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outage(status: u16) -> fenix_api::Error {
        fenix_api::Error::Api {
            status,
            message: "upstream".into(),
        }
    }

    #[test]
    fn server_outages_are_transient() {
        let err = CoreError::DeviceFetch {
            device: "dev-1".into(),
            source: outage(503),
        };
        assert!(err.is_transient());
        assert!(
            CoreError::Refresh {
                message: "no response".into(),
                source: None,
            }
            .is_transient()
        );
    }

    #[test]
    fn rejected_requests_are_not_transient() {
        let err = CoreError::DeviceWrite {
            device: "dev-1".into(),
            source: outage(400),
        };
        assert!(!err.is_transient());
        assert!(
            !CoreError::NotFound {
                identifier: "Attic".into(),
            }
            .is_transient()
        );
    }
}
