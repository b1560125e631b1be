// Per-thermostat endpoints: state snapshot and config writes

use secrecy::SecretString;
use tracing::debug;

use crate::client::FenixClient;
use crate::error::Error;
use crate::models::{ConfigEntry, ConfigReplace, MODE_CODE_MANUAL, ThermostatContent};

impl FenixClient {
    /// Fetch the current state of one thermostat.
    ///
    /// `GET /iotmanagement/v1/configuration/{id}/{id}/v1.0/content`
    pub async fn get_thermostat(
        &self,
        token: &SecretString,
        device_id: &str,
    ) -> Result<ThermostatContent, Error> {
        let url = self.api_url(&format!(
            "iotmanagement/v1/configuration/{device_id}/{device_id}/v1.0/content"
        ))?;
        self.get(url, token).await
    }

    /// Replace device config entries.
    ///
    /// `PUT /iotmanagement/v1/devices/twin/properties/config/replace`
    pub async fn replace_config(
        &self,
        token: &SecretString,
        device_id: &str,
        data: Vec<ConfigEntry>,
    ) -> Result<(), Error> {
        let url = self.api_url("iotmanagement/v1/devices/twin/properties/config/replace")?;
        let body = ConfigReplace::new(device_id, data);
        self.put_no_response(url, token, &body).await
    }

    /// Hold a setpoint in manual mode. The device has no standalone
    /// "heat" switch; heating to X° is this write.
    pub async fn set_setpoint(
        &self,
        token: &SecretString,
        device_id: &str,
        fahrenheit: f64,
    ) -> Result<(), Error> {
        debug!(device_id, fahrenheit, "writing setpoint");
        self.replace_config(
            token,
            device_id,
            vec![
                ConfigEntry::mode(MODE_CODE_MANUAL),
                ConfigEntry::setpoint_fahrenheit(fahrenheit),
            ],
        )
        .await
    }

    /// Switch the device mode.
    pub async fn set_mode_code(
        &self,
        token: &SecretString,
        device_id: &str,
        code: i64,
    ) -> Result<(), Error> {
        debug!(device_id, code, "writing mode");
        self.replace_config(token, device_id, vec![ConfigEntry::mode(code)])
            .await
    }
}
