use std::future::Future;

use crate::error::CoreError;
use crate::model::{DeviceMode, ThermostatState};

/// Remote operations for one thermostat, already bound to a credential
/// source. Errors are `DeviceFetch` or `DeviceWrite`.
pub trait ThermostatApi: Send + Sync + 'static {
    fn device_id(&self) -> &str;

    fn fetch_state(&self) -> impl Future<Output = Result<ThermostatState, CoreError>> + Send;

    /// Write a setpoint in °F. The device switches to manual mode.
    fn write_setpoint(&self, fahrenheit: f64)
    -> impl Future<Output = Result<(), CoreError>> + Send;

    fn write_mode(&self, mode: DeviceMode) -> impl Future<Output = Result<(), CoreError>> + Send;
}
