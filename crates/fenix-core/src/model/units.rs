// ── Temperature units ──
//
// The remote API speaks Fahrenheit. Conversion happens only where a value
// crosses into or out of the presentation layer; stored state is never
// converted.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Temperature scale used by the presentation layer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Device-native unit of the Fenix API.
    pub const NATIVE: Self = Self::Fahrenheit;

    /// Convert a native (°F) value into this unit.
    pub fn from_native(self, fahrenheit: f64) -> f64 {
        match self {
            Self::Celsius => f_to_c(fahrenheit),
            Self::Fahrenheit => fahrenheit,
        }
    }

    /// Convert a value in this unit into native (°F).
    pub fn to_native(self, value: f64) -> f64 {
        match self {
            Self::Celsius => c_to_f(value),
            Self::Fahrenheit => value,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

/// `F = C × 9/5 + 32`
pub fn c_to_f(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// `C = (F − 32) × 5/9`
pub fn f_to_c(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}
