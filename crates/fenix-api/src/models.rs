// Wire types for the Fenix cloud API.
//
// Field names on the wire are terse device codes (S1, Sp, Dm, ...);
// these structs give them readable names and keep the raw shape intact.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `wattsType` code for the device mode.
pub const WATTS_TYPE_MODE: &str = "Dm";

/// `wattsType` code for the manual setpoint, tenths of a degree Fahrenheit.
pub const WATTS_TYPE_SETPOINT: &str = "Ma";

/// Device mode code for manual ("hold") heating.
pub const MODE_CODE_MANUAL: i64 = 6;

/// Scale factor between °F and the setpoint value sent to the device.
pub const SETPOINT_SCALE: f64 = 10.0;

// ── Installations ───────────────────────────────────────────────────

/// One home in the account's installation listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Installation {
    #[serde(default)]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Room {
    #[serde(default)]
    pub sensors: Vec<Sensor>,
}

/// A thermostat as listed in an installation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Sensor {
    /// Stable device identifier.
    #[serde(rename = "S1")]
    pub id: String,
    /// User-assigned display name.
    #[serde(rename = "S2", default)]
    pub name: String,
}

// ── Thermostat content ──────────────────────────────────────────────

/// A numeric reading carried with its divisor (`value / divFactor`).
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ScaledValue {
    pub value: f64,
    #[serde(rename = "divFactor", default = "unit_divisor")]
    pub div_factor: f64,
}

fn unit_divisor() -> f64 {
    1.0
}

impl ScaledValue {
    /// The reading in device-native units. A zero divisor is treated as 1.
    pub fn scaled(&self) -> f64 {
        if self.div_factor.abs() < f64::EPSILON {
            self.value
        } else {
            self.value / self.div_factor
        }
    }
}

/// A raw `{ "value": ... }` cell whose type varies by firmware.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawCell {
    #[serde(default)]
    pub value: Value,
}

impl RawCell {
    /// Render the cell value as text (strings unquoted, null as empty).
    pub fn as_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match &self.value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(f64_to_i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[allow(clippy::as_conversions, clippy::cast_possible_truncation)]
fn f64_to_i64(v: f64) -> i64 {
    v.round() as i64
}

/// Snapshot returned by the per-device `content` endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThermostatContent {
    /// Ambient (actual) temperature, °F scaled.
    #[serde(rename = "At")]
    pub actual: ScaledValue,
    /// Setpoint (required) temperature, °F scaled.
    #[serde(rename = "Sp")]
    pub setpoint: ScaledValue,
    /// Device mode code.
    #[serde(rename = "Dm")]
    pub mode: RawCell,
    /// Model / type code.
    #[serde(rename = "Ty")]
    pub model: RawCell,
    /// Software version.
    #[serde(rename = "Sv")]
    pub software_version: RawCell,
}

// ── Config replace ──────────────────────────────────────────────────

/// Body of `PUT /devices/twin/properties/config/replace`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigReplace {
    #[serde(rename = "Id_deviceId")]
    pub device_id: String,
    #[serde(rename = "S1")]
    pub sensor_id: String,
    #[serde(rename = "configurationVersion")]
    pub configuration_version: String,
    pub data: Vec<ConfigEntry>,
}

impl ConfigReplace {
    pub fn new(device_id: &str, data: Vec<ConfigEntry>) -> Self {
        Self {
            device_id: device_id.to_owned(),
            sensor_id: device_id.to_owned(),
            configuration_version: "v1.0".into(),
            data,
        }
    }
}

/// One `{timestamp, wattsType, wattsTypeValue}` tuple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigEntry {
    pub timestamp: Option<i64>,
    #[serde(rename = "wattsType")]
    pub watts_type: String,
    #[serde(rename = "wattsTypeValue")]
    pub watts_type_value: i64,
}

impl ConfigEntry {
    pub fn new(watts_type: &str, value: i64) -> Self {
        Self {
            timestamp: None,
            watts_type: watts_type.to_owned(),
            watts_type_value: value,
        }
    }

    /// Mode switch entry.
    pub fn mode(code: i64) -> Self {
        Self::new(WATTS_TYPE_MODE, code)
    }

    /// Setpoint entry from a °F value (sent in tenths).
    pub fn setpoint_fahrenheit(fahrenheit: f64) -> Self {
        Self::new(WATTS_TYPE_SETPOINT, f64_to_i64(fahrenheit * SETPOINT_SCALE))
    }
}
