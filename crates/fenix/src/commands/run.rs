//! `fenix run`: the bridge daemon.
//!
//! Starts the bridge against the JSON accessory cache, logs every
//! presentation change, and shuts down cleanly on Ctrl-C or SIGTERM.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use fenix_core::{
    Bridge, BridgeSettings, DeviceHandle, FenixSession, JsonAccessoryCache, SyncEngine,
};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;

use super::{bridge_config, load_config};

type FenixBridge = Bridge<FenixSession, JsonAccessoryCache>;

/// How often the watcher looks for engines added by inventory refreshes.
const WATCH_RESCAN: Duration = Duration::from_secs(60);

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = load_config(global)?;
    if let Some(storage) = &args.storage {
        cfg.storage_path = Some(storage.clone());
    }
    if let Some(minutes) = args.poll_interval {
        cfg.poll_interval_minutes = minutes;
    }
    if let Some(minutes) = args.token_check_interval {
        cfg.token_check_interval_minutes = minutes;
    }
    if let Some(minutes) = args.inventory_interval {
        cfg.inventory_interval_minutes = minutes;
    }
    let config = bridge_config(global, &cfg)?;

    let session = Arc::new(FenixSession::connect(&config)?);
    let host = Arc::new(JsonAccessoryCache::open(&config.storage_path)?);
    info!(
        storage = %config.storage_path.display(),
        cached = host.len(),
        unit = %config.temperature_unit,
        "starting bridge"
    );

    let bridge = Arc::new(Bridge::new(session, host, BridgeSettings::from(&config)));
    bridge.start().await;

    let watcher = tokio::spawn(watch_engines(Arc::clone(&bridge)));

    shutdown_signal().await?;
    info!("shutdown requested");

    watcher.abort();
    bridge.shutdown().await;
    Ok(())
}

/// Log presentation changes for every engine the bridge runs, picking up
/// engines added after start.
async fn watch_engines(bridge: Arc<FenixBridge>) {
    let mut watchers: HashMap<String, JoinHandle<()>> = HashMap::new();
    let mut rescan = tokio::time::interval(WATCH_RESCAN);

    loop {
        rescan.tick().await;
        watchers.retain(|_, handle| !handle.is_finished());
        for engine in bridge.engines() {
            let device = engine.device_id().to_owned();
            watchers
                .entry(device)
                .or_insert_with(|| tokio::spawn(log_changes(engine)));
        }
    }
}

async fn log_changes(engine: Arc<SyncEngine<DeviceHandle>>) {
    let mut rx = engine.subscribe();
    let name = engine.display_name().to_owned();
    let device = engine.device_id().to_owned();
    // The engine may be retired; its sender is dropped with it.
    drop(engine);

    loop {
        let current = rx.borrow_and_update().clone();
        if let Some(p) = current {
            info!(
                device = %device,
                name = %name,
                current = p.current_temperature,
                target = p.target_temperature,
                state = %p.current_hvac,
                mode = %p.target_hvac,
                unit = %p.display_unit,
                "thermostat updated"
            );
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<(), CliError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = term.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<(), CliError> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
