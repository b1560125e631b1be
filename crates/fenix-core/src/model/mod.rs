// Domain model types for the Fenix bridge.

pub mod device;
pub mod presentation;
pub mod thermostat;
pub mod units;

pub use device::{AccessoryRecord, DeviceDescriptor, accessory_uuid};
pub use presentation::{
    AccessoryInformation, CharacteristicProps, CurrentHvacState, MIN_USABLE_SETPOINT_C,
    MIN_USABLE_SETPOINT_F, Presentation, TargetHvacState, below_usable_setpoint,
    derive_presentation,
};
pub use thermostat::{DeviceMode, ThermostatState};
pub use units::{TemperatureUnit, c_to_f, f_to_c};
