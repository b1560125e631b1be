// ── Runtime bridge configuration ──
//
// Describes how the bridge talks to the cloud and how often it does so.
// Built by the CLI from the config file; core never reads config files.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use fenix_api::{Endpoints, TransportConfig};

use crate::credential::DEFAULT_REFRESH_SKEW;
use crate::error::CoreError;
use crate::model::TemperatureUnit;

/// Configuration for one bridge instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub endpoints: Endpoints,
    pub transport: TransportConfig,
    /// Seed access token, used only until a persisted pair exists.
    pub access_token: SecretString,
    /// Seed refresh token.
    pub refresh_token: SecretString,
    pub temperature_unit: TemperatureUnit,
    /// Interval between thermostat polls.
    pub poll_interval: Duration,
    /// Interval between token expiry checks.
    pub token_check_interval: Duration,
    /// Lead time before expiry at which the token is refreshed.
    pub refresh_skew: Duration,
    /// Interval between inventory re-listings. `None` lists once at start.
    pub inventory_interval: Option<Duration>,
    /// Directory holding the credential file and accessory cache.
    pub storage_path: PathBuf,
}

impl BridgeConfig {
    /// Production endpoints with default intervals.
    pub fn new(
        access_token: SecretString,
        refresh_token: SecretString,
        storage_path: impl Into<PathBuf>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            endpoints: Endpoints::production().map_err(|e| CoreError::client_setup(&e))?,
            transport: TransportConfig::default(),
            access_token,
            refresh_token,
            temperature_unit: TemperatureUnit::default(),
            poll_interval: Duration::from_secs(30 * 60),
            token_check_interval: Duration::from_secs(15 * 60),
            refresh_skew: DEFAULT_REFRESH_SKEW,
            inventory_interval: None,
            storage_path: storage_path.into(),
        })
    }

    /// Reject intervals the scheduler cannot run.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, value) in [
            ("poll_interval", Some(self.poll_interval)),
            ("token_check_interval", Some(self.token_check_interval)),
            ("inventory_interval", self.inventory_interval),
        ] {
            if value.is_some_and(|d| d.is_zero()) {
                return Err(CoreError::Validation {
                    field: field.into(),
                    reason: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> BridgeConfig {
        BridgeConfig::new(
            SecretString::from("a".to_string()),
            SecretString::from("r".to_string()),
            "/tmp/fenix",
        )
        .unwrap()
    }

    #[test]
    fn defaults() {
        let config = config();
        assert_eq!(config.poll_interval, Duration::from_secs(1800));
        assert_eq!(config.token_check_interval, Duration::from_secs(900));
        assert_eq!(config.refresh_skew, Duration::from_secs(3600));
        assert!(config.inventory_interval.is_none());
        assert_eq!(config.temperature_unit, TemperatureUnit::Celsius);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = config();
        config.poll_interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(CoreError::Validation { field, .. }) if field == "poll_interval"
        ));
    }
}
