//! Clap derive structures for the `fenix` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use fenix_core::{TargetHvacState, TemperatureUnit};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fenix -- bridge Fenix TFT Wifi thermostats into a smart-home host
#[derive(Debug, Parser)]
#[command(
    name = "fenix",
    version,
    about = "Bridge and control Fenix TFT Wifi thermostats",
    long_about = "Keeps Fenix TFT Wifi thermostats in sync with a local accessory cache.\n\n\
        `fenix run` starts the bridge daemon; the other commands poll or\n\
        write a single thermostat through the Fenix cloud API.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to use instead of the platform default
    #[arg(long, env = "FENIX_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FENIX_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Temperature unit for display and input (overrides config)
    #[arg(long, short = 'u', global = true)]
    pub unit: Option<UnitArg>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, env = "FENIX_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Also write logs to a daily-rotated file in this directory
    #[arg(long, env = "FENIX_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    Celsius,
    Fahrenheit,
}

impl From<UnitArg> for TemperatureUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Celsius => Self::Celsius,
            UnitArg::Fahrenheit => Self::Fahrenheit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Switch the thermostat off
    Off,
    /// Hold the current setpoint
    Heat,
    /// Frost protection
    Cool,
    /// Follow the device schedule
    Auto,
}

impl From<ModeArg> for TargetHvacState {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Off => Self::Off,
            ModeArg::Heat => Self::Heat,
            ModeArg::Cool => Self::Cool,
            ModeArg::Auto => Self::Auto,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge daemon until interrupted
    Run(RunArgs),

    /// List thermostats on the account
    #[command(alias = "dev", alias = "d")]
    Devices,

    /// Poll one thermostat and show its presented values
    #[command(alias = "st")]
    Status(DeviceArgs),

    /// Set the target temperature of a thermostat
    SetTemp(SetTempArgs),

    /// Set the operating mode of a thermostat
    SetMode(SetModeArgs),

    /// Inspect or refresh the stored access token
    Token(TokenArgs),

    /// Manage CLI configuration
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Directory for the credential file and accessory cache
    #[arg(long, env = "FENIX_STORAGE_PATH")]
    pub storage: Option<PathBuf>,

    /// Minutes between thermostat polls
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Minutes between token expiry checks
    #[arg(long)]
    pub token_check_interval: Option<u64>,

    /// Minutes between device list refreshes (0 = only at start)
    #[arg(long)]
    pub inventory_interval: Option<u64>,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Device id or display name
    pub device: String,
}

#[derive(Debug, Args)]
pub struct SetTempArgs {
    /// Device id or display name
    pub device: String,

    /// Target temperature in the selected unit
    #[arg(allow_negative_numbers = true)]
    pub value: f64,
}

#[derive(Debug, Args)]
pub struct SetModeArgs {
    /// Device id or display name
    pub device: String,

    /// Requested mode
    pub mode: ModeArg,
}

// ── Token ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: Option<TokenCommand>,
}

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Show decoded claims and expiry (default)
    Show,
    /// Exchange the refresh token if the access token is near expiry
    Refresh,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,
    /// Show the resolved configuration (tokens redacted)
    Show,
    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
