//! Single-thermostat commands: list, status, set-temp, set-mode.
//!
//! Each command builds a one-off sync engine, polls once, and (for writes)
//! goes through the same set hooks the bridge daemon uses.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;

use fenix_core::model::below_usable_setpoint;
use fenix_core::{
    AccessoryInformation, CurrentHvacState, DeviceDescriptor, DeviceHandle, RemoteSession,
    SyncEngine, TargetHvacState, TemperatureUnit,
};

use crate::cli::{DeviceArgs, GlobalOpts, SetModeArgs, SetTempArgs};
use crate::error::CliError;
use crate::output;

use super::{connect, resolve_device};

// ── Views ────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Device ID")]
    id: String,
    #[tabled(rename = "Accessory UUID")]
    uuid: String,
}

fn device_row(d: &DeviceDescriptor) -> DeviceRow {
    DeviceRow {
        name: d.display_name.clone(),
        id: d.remote_id.clone(),
        uuid: d.uuid().to_string(),
    }
}

/// Presented values of one thermostat after a poll.
#[derive(Debug, Serialize)]
struct ThermostatStatus {
    device_id: String,
    name: String,
    unit: TemperatureUnit,
    current_temperature: f64,
    target_temperature: f64,
    current_hvac: CurrentHvacState,
    target_hvac: TargetHvacState,
    #[serde(skip_serializing_if = "Option::is_none")]
    information: Option<AccessoryInformation>,
}

fn detail(status: &ThermostatStatus, color: bool) -> String {
    let symbol = status.unit.symbol();
    let mut out = String::new();
    let _ = writeln!(out, "Name:         {}", status.name);
    let _ = writeln!(out, "Device ID:    {}", status.device_id);
    let _ = writeln!(
        out,
        "Current:      {:.1} {symbol}",
        status.current_temperature
    );
    let _ = writeln!(out, "Target:       {:.1} {symbol}", status.target_temperature);
    let _ = writeln!(
        out,
        "State:        {}",
        output::paint_current(status.current_hvac, color)
    );
    let _ = write!(
        out,
        "Mode:         {}",
        output::paint_target(status.target_hvac, color)
    );
    if let Some(info) = &status.information {
        let _ = write!(
            out,
            "\nModel:        {}\nFirmware:     {}",
            info.model, info.serial
        );
    }
    out
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn list(global: &GlobalOpts) -> Result<(), CliError> {
    let (session, _) = connect(global)?;
    session.refresh_credentials().await;

    let devices = session.list_devices().await?;
    let out = output::render_list(&global.output, &devices, device_row, |d| {
        d.remote_id.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn status(args: &DeviceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let engine = polled_engine(&args.device, global).await?;
    print_status(&engine, global)
}

pub async fn set_temp(args: &SetTempArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let engine = polled_engine(&args.device, global).await?;
    let unit = engine.unit();

    let props = engine.props();
    if args.value < props.min_target || args.value > props.max_target {
        return Err(CliError::Validation {
            field: "value".into(),
            reason: format!(
                "{} {} is outside {}..={} {}",
                args.value,
                unit.symbol(),
                props.min_target,
                props.max_target,
                unit.symbol()
            ),
        });
    }

    engine.set_target_temperature(args.value, unit).await?;
    if below_usable_setpoint(args.value, unit) && !global.quiet {
        eprintln!(
            "note: {} {} is below the lowest setpoint the device accepts; not sent",
            args.value,
            unit.symbol()
        );
    }
    print_status(&engine, global)
}

pub async fn set_mode(args: &SetModeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let engine = polled_engine(&args.device, global).await?;
    engine.set_mode(args.mode.into()).await?;
    print_status(&engine, global)
}

// ── Helpers ──────────────────────────────────────────────────────────

async fn polled_engine(
    identifier: &str,
    global: &GlobalOpts,
) -> Result<SyncEngine<DeviceHandle>, CliError> {
    let (session, config) = connect(global)?;
    session.refresh_credentials().await;

    let descriptor = resolve_device(&session, identifier).await?;
    let engine = SyncEngine::new(
        session.device(&descriptor),
        descriptor.display_name.clone(),
        config.temperature_unit,
    );
    engine.poll().await?;
    Ok(engine)
}

fn print_status(engine: &SyncEngine<DeviceHandle>, global: &GlobalOpts) -> Result<(), CliError> {
    let presentation = engine.presentation().ok_or_else(|| CliError::Validation {
        field: "device".into(),
        reason: format!("no state received from {}", engine.display_name()),
    })?;

    let status = ThermostatStatus {
        device_id: engine.device_id().to_owned(),
        name: engine.display_name().to_owned(),
        unit: presentation.display_unit,
        current_temperature: presentation.current_temperature,
        target_temperature: presentation.target_temperature,
        current_hvac: presentation.current_hvac,
        target_hvac: presentation.target_hvac,
        information: engine.information(),
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &status,
        |s| detail(s, color),
        |s| format!("{:.1}", s.target_temperature),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
