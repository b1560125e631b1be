// ── Presentation layer ──
//
// What the host sees for one thermostat: temperatures in the configured
// display unit plus the derived heating/cooling state. Everything here is a
// pure function of a `ThermostatState` and a `TemperatureUnit`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::thermostat::{DeviceMode, ThermostatState};
use super::units::TemperatureUnit;

/// Lowest setpoint the device honors, in °C.
pub const MIN_USABLE_SETPOINT_C: f64 = 7.0;

/// Lowest setpoint the device honors, in °F (native).
pub const MIN_USABLE_SETPOINT_F: f64 = 44.6;

pub const MANUFACTURER: &str = "Fenix Trading s.r.o.";

/// What the thermostat is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CurrentHvacState {
    Off,
    Heat,
}

/// What the user asked the thermostat to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TargetHvacState {
    Off,
    Heat,
    Cool,
    Auto,
}

impl TargetHvacState {
    /// Device mode requested by this presentation value.
    ///
    /// `Cool` has no cooling hardware behind it; the device's closest
    /// equivalent is frost protection.
    pub fn device_mode(self) -> DeviceMode {
        match self {
            Self::Off => DeviceMode::Off,
            Self::Heat => DeviceMode::Manual,
            Self::Cool => DeviceMode::Antifreeze,
            Self::Auto => DeviceMode::Auto,
        }
    }
}

/// Observable values of one accessory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub current_temperature: f64,
    pub target_temperature: f64,
    pub current_hvac: CurrentHvacState,
    pub target_hvac: TargetHvacState,
    pub display_unit: TemperatureUnit,
}

/// Static accessory metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryInformation {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
}

impl AccessoryInformation {
    pub fn from_state(state: &ThermostatState) -> Self {
        Self {
            manufacturer: MANUFACTURER.to_owned(),
            model: format!("Fenix TFT Wifi {}", state.model),
            serial: state.software_version.clone(),
        }
    }
}

/// Value constraints the host applies to the target temperature and mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicProps {
    pub min_target: f64,
    pub max_target: f64,
    pub step: f64,
    pub valid_target_states: Vec<TargetHvacState>,
}

impl CharacteristicProps {
    pub fn for_unit(unit: TemperatureUnit) -> Self {
        let (min_target, max_target, step) = match unit {
            TemperatureUnit::Celsius => (0.0, 27.0, 0.5),
            TemperatureUnit::Fahrenheit => (0.0, 100.0, 1.0),
        };
        Self {
            min_target,
            max_target,
            step,
            valid_target_states: vec![
                TargetHvacState::Off,
                TargetHvacState::Heat,
                TargetHvacState::Cool,
                TargetHvacState::Auto,
            ],
        }
    }

    pub fn clamp_target(&self, value: f64) -> f64 {
        value.clamp(self.min_target, self.max_target)
    }
}

/// Derive the host-facing view of a state.
pub fn derive_presentation(state: &ThermostatState, unit: TemperatureUnit) -> Presentation {
    let (current_hvac, target_hvac) = if state.mode.is_off() {
        (CurrentHvacState::Off, TargetHvacState::Off)
    } else {
        let current = if state.required_temperature > state.actual_temperature {
            CurrentHvacState::Heat
        } else {
            CurrentHvacState::Off
        };
        let target = if state.required_temperature >= MIN_USABLE_SETPOINT_F {
            TargetHvacState::Heat
        } else {
            TargetHvacState::Off
        };
        (current, target)
    };

    let props = CharacteristicProps::for_unit(unit);
    Presentation {
        current_temperature: unit.from_native(state.actual_temperature),
        target_temperature: props.clamp_target(unit.from_native(state.required_temperature)),
        current_hvac,
        target_hvac,
        display_unit: unit,
    }
}

/// `true` if a requested setpoint (in `unit`) must stay local.
///
/// Only Celsius requests are checked. Fahrenheit values go to the device
/// as given.
pub fn below_usable_setpoint(value: f64, unit: TemperatureUnit) -> bool {
    match unit {
        TemperatureUnit::Celsius => value < MIN_USABLE_SETPOINT_C,
        TemperatureUnit::Fahrenheit => false,
    }
}
