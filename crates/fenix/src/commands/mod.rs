//! Command handlers and the shared plumbing they need: config loading,
//! session setup, and device lookup.

pub mod config_cmd;
pub mod devices;
pub mod run;
pub mod token;

use clap::CommandFactory;
use tracing::debug;

use fenix_config::Config;
use fenix_core::{
    BridgeConfig, CoreError, DeviceDescriptor, FenixSession, RemoteSession, TemperatureUnit,
};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

/// Route a parsed command line to its handler.
pub async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;
    debug!(command = ?command, "dispatching command");

    match command {
        // Config commands must work before any credentials exist.
        Command::Config(args) => config_cmd::handle(args, &global),

        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "fenix", &mut std::io::stdout());
            Ok(())
        }

        Command::Run(args) => run::handle(&args, &global).await,
        Command::Token(args) => token::handle(args, &global).await,
        Command::Devices => devices::list(&global).await,
        Command::Status(args) => devices::status(&args, &global).await,
        Command::SetTemp(args) => devices::set_temp(&args, &global).await,
        Command::SetMode(args) => devices::set_mode(&args, &global).await,
    }
}

// ── Shared helpers ───────────────────────────────────────────────────

/// Load the config file named by `--config`, or the platform default.
///
/// An explicit path must exist; the default may be absent.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    match &global.config {
        Some(path) if !path.exists() => Err(CliError::NoConfig {
            path: path.display().to_string(),
        }),
        Some(path) => Ok(fenix_config::load_config_from(path)?),
        None => Ok(fenix_config::load_config()?),
    }
}

/// Display unit: `--unit` wins over the config file.
pub fn display_unit(global: &GlobalOpts, cfg: &Config) -> TemperatureUnit {
    global.unit.map_or(cfg.temperature_unit, TemperatureUnit::from)
}

/// Runtime bridge configuration with global overrides applied.
pub fn bridge_config(global: &GlobalOpts, cfg: &Config) -> Result<BridgeConfig, CliError> {
    let mut config = fenix_config::to_bridge_config(cfg)?;
    config.temperature_unit = display_unit(global, cfg);
    config.validate()?;
    Ok(config)
}

/// Load config and open an authenticated session.
pub fn connect(global: &GlobalOpts) -> Result<(FenixSession, BridgeConfig), CliError> {
    let cfg = load_config(global)?;
    let config = bridge_config(global, &cfg)?;
    let session = FenixSession::connect(&config)?;
    Ok((session, config))
}

/// Find a thermostat by remote id, or by display name ignoring case.
pub async fn resolve_device(
    session: &FenixSession,
    identifier: &str,
) -> Result<DeviceDescriptor, CliError> {
    let devices = session.list_devices().await?;
    let device = find_device(devices, identifier).ok_or_else(|| CoreError::NotFound {
        identifier: identifier.to_owned(),
    })?;
    Ok(device)
}

fn find_device(devices: Vec<DeviceDescriptor>, identifier: &str) -> Option<DeviceDescriptor> {
    let mut by_name = None;
    for device in devices {
        if device.remote_id == identifier {
            return Some(device);
        }
        if by_name.is_none() && device.display_name.eq_ignore_ascii_case(identifier) {
            by_name = Some(device);
        }
    }
    by_name
}
