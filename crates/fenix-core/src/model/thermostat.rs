// ── Thermostat domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use fenix_api::ThermostatContent;
use fenix_api::models::MODE_CODE_MANUAL;

/// Device-level operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceMode {
    Off,
    Manual,
    Auto,
    Antifreeze,
}

impl DeviceMode {
    /// The `Dm` code written to the device.
    pub fn code(self) -> i64 {
        match self {
            Self::Off => 0,
            Self::Auto => 1,
            Self::Antifreeze => 2,
            Self::Manual => MODE_CODE_MANUAL,
        }
    }

    /// Decode a `Dm` code. Unrecognized non-zero codes are program variants
    /// and are treated as `Auto`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Off,
            2 => Self::Antifreeze,
            MODE_CODE_MANUAL => Self::Manual,
            1 => Self::Auto,
            other => {
                debug!(code = other, "unrecognized device mode code, treating as auto");
                Self::Auto
            }
        }
    }

    pub fn is_off(self) -> bool {
        matches!(self, Self::Off)
    }
}

/// Snapshot of one thermostat. Temperatures are in °F (device-native).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermostatState {
    pub actual_temperature: f64,
    pub required_temperature: f64,
    pub mode: DeviceMode,
    pub model: String,
    pub software_version: String,
}

impl From<ThermostatContent> for ThermostatState {
    fn from(content: ThermostatContent) -> Self {
        Self {
            actual_temperature: content.actual.scaled(),
            required_temperature: content.setpoint.scaled(),
            // A missing or non-numeric mode cell reads as off.
            mode: content
                .mode
                .as_i64()
                .map_or(DeviceMode::Off, DeviceMode::from_code),
            model: content.model.as_text(),
            software_version: content.software_version.as_text(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mode_codes_round_trip() {
        for mode in [
            DeviceMode::Off,
            DeviceMode::Manual,
            DeviceMode::Auto,
            DeviceMode::Antifreeze,
        ] {
            assert_eq!(DeviceMode::from_code(mode.code()), mode);
        }
    }

    #[test]
    fn unknown_mode_code_reads_as_auto() {
        assert_eq!(DeviceMode::from_code(9), DeviceMode::Auto);
    }

    #[test]
    fn state_from_content() {
        let content: ThermostatContent = serde_json::from_value(json!({
            "At": { "value": 500, "divFactor": 10 },
            "Sp": { "value": 550, "divFactor": 10 },
            "Dm": { "value": 6 },
            "Ty": { "value": "TFT" },
            "Sv": { "value": "2.1" }
        }))
        .unwrap();

        let state = ThermostatState::from(content);
        assert!((state.actual_temperature - 50.0).abs() < 1e-9);
        assert!((state.required_temperature - 55.0).abs() < 1e-9);
        assert_eq!(state.mode, DeviceMode::Manual);
        assert_eq!(state.model, "TFT");
        assert_eq!(state.software_version, "2.1");
    }

    #[test]
    fn missing_mode_reads_as_off() {
        let content: ThermostatContent = serde_json::from_value(json!({
            "At": { "value": 700, "divFactor": 10 },
            "Sp": { "value": 680, "divFactor": 10 },
            "Dm": {},
            "Ty": {},
            "Sv": {}
        }))
        .unwrap();

        assert_eq!(ThermostatState::from(content).mode, DeviceMode::Off);
    }
}
