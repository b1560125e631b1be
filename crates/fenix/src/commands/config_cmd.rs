//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Input, Password, Select};

use fenix_config::{Config, TokenKind};
use fenix_core::TemperatureUnit;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::load_config;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking tokens.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    let secret = |out: &mut String, key: &str, value: Option<&String>, env: Option<&String>| {
        if value.is_some() {
            let _ = writeln!(out, "{key} = \"****\"");
        }
        if let Some(env) = env {
            let _ = writeln!(out, "{key}_env = \"{env}\"");
        }
    };
    secret(
        &mut out,
        "access_token",
        cfg.access_token.as_ref(),
        cfg.access_token_env.as_ref(),
    );
    secret(
        &mut out,
        "refresh_token",
        cfg.refresh_token.as_ref(),
        cfg.refresh_token_env.as_ref(),
    );

    let _ = writeln!(out, "temperature_unit = \"{}\"", cfg.temperature_unit);
    let _ = writeln!(out, "poll_interval_minutes = {}", cfg.poll_interval_minutes);
    let _ = writeln!(
        out,
        "token_check_interval_minutes = {}",
        cfg.token_check_interval_minutes
    );
    let _ = writeln!(out, "token_refresh_skew_secs = {}", cfg.token_refresh_skew_secs);
    let _ = writeln!(
        out,
        "inventory_interval_minutes = {}",
        cfg.inventory_interval_minutes
    );
    let _ = writeln!(out, "storage_path = \"{}\"", cfg.storage_path().display());
    let _ = writeln!(out, "api_url = \"{}\"", cfg.api_url);
    let _ = writeln!(out, "identity_url = \"{}\"", cfg.identity_url);
    if let Some(ref ca) = cfg.ca_cert {
        let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
    }
    let _ = writeln!(out, "timeout_secs = {}", cfg.timeout_secs);
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = write!(out, "color = \"{}\"", cfg.defaults.color);

    out
}

/// Prompt for one token and store it in the keyring or return it for
/// plaintext config.
///
/// Returns `Some(token)` if the user chose plaintext, `None` if stored in
/// the keyring.
fn prompt_token(kind: TokenKind, label: &str) -> Result<Option<String>, CliError> {
    let token = Password::new().with_prompt(label).interact()?;
    if token.trim().is_empty() {
        return Err(CliError::Validation {
            field: label.to_lowercase(),
            reason: "cannot be empty".into(),
        });
    }

    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {}?", label.to_lowercase()))
        .items(choices)
        .default(0)
        .interact()?;

    if selection == 0 {
        fenix_config::store_token(kind, token.trim())?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(token.trim().to_owned()))
    }
}

fn save(cfg: &Config, global: &GlobalOpts) -> Result<std::path::PathBuf, CliError> {
    match &global.config {
        Some(path) => {
            fenix_config::save_config_to(cfg, path)?;
            Ok(path.clone())
        }
        None => Ok(fenix_config::save_config(cfg)?),
    }
}

fn config_path(global: &GlobalOpts) -> std::path::PathBuf {
    global.config.clone().unwrap_or_else(fenix_config::config_path)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => {
            let path = config_path(global);
            eprintln!("Fenix bridge configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            let mut cfg = if path.exists() {
                load_config(global)?
            } else {
                Config::default()
            };

            cfg.access_token = prompt_token(TokenKind::Access, "Access token")?;
            cfg.refresh_token = prompt_token(TokenKind::Refresh, "Refresh token")?;

            let units = &["celsius", "fahrenheit"];
            let unit = Select::new()
                .with_prompt("Temperature unit")
                .items(units)
                .default(usize::from(
                    cfg.temperature_unit == TemperatureUnit::Fahrenheit,
                ))
                .interact()?;
            cfg.temperature_unit = if unit == 0 {
                TemperatureUnit::Celsius
            } else {
                TemperatureUnit::Fahrenheit
            };

            cfg.poll_interval_minutes = Input::new()
                .with_prompt("Poll interval (minutes)")
                .default(cfg.poll_interval_minutes)
                .validate_with(|v: &u64| {
                    if *v == 0 {
                        Err("must be at least 1")
                    } else {
                        Ok(())
                    }
                })
                .interact_text()?;

            let saved = save(&cfg, global)?;
            eprintln!("\n   ✓ Configuration saved to {}", saved.display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = load_config(global)?;
            let out = output::render_single(
                &global.output,
                &redacted(&cfg),
                |_| format_config_redacted(&cfg),
                |_| config_path(global).display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config_path(global).display().to_string(), global.quiet);
            Ok(())
        }
    }
}

/// Copy of `cfg` safe to serialize.
fn redacted(cfg: &Config) -> Config {
    let mask = |v: Option<&String>| v.map(|_| "****".to_owned());
    Config {
        access_token: mask(cfg.access_token.as_ref()),
        refresh_token: mask(cfg.refresh_token.as_ref()),
        ..cfg.clone()
    }
}
