// ── Bridge lifecycle ──
//
// Wires the pieces together: credential refresh on a timer, inventory
// reconciliation against the host's accessory cache, and one polling
// sync engine per registered thermostat.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::host::AccessoryHost;
use crate::model::{AccessoryRecord, TemperatureUnit, ThermostatState};
use crate::reconcile::{Reconciliation, reconcile};
use crate::schedule::{FirstRun, ScheduledTask};
use crate::session::RemoteSession;
use crate::sync::SyncEngine;

/// Timing and display settings the bridge runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSettings {
    pub temperature_unit: TemperatureUnit,
    pub poll_interval: Duration,
    pub token_check_interval: Duration,
    pub inventory_interval: Option<Duration>,
}

impl From<&BridgeConfig> for BridgeSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            temperature_unit: config.temperature_unit,
            poll_interval: config.poll_interval,
            token_check_interval: config.token_check_interval,
            inventory_interval: config.inventory_interval,
        }
    }
}

struct DeviceSlot<D> {
    engine: Arc<SyncEngine<D>>,
    task: ScheduledTask,
}

pub struct Bridge<R: RemoteSession, H> {
    session: Arc<R>,
    host: Arc<H>,
    settings: BridgeSettings,
    devices: DashMap<Uuid, DeviceSlot<R::Device>>,
    background: Mutex<Vec<ScheduledTask>>,
}

impl<R: RemoteSession, H: AccessoryHost + 'static> Bridge<R, H> {
    pub fn new(session: Arc<R>, host: Arc<H>, settings: BridgeSettings) -> Self {
        Self {
            session,
            host,
            settings,
            devices: DashMap::new(),
            background: Mutex::new(Vec::new()),
        }
    }

    pub fn session(&self) -> &Arc<R> {
        &self.session
    }

    /// Refresh credentials if due, reconcile the inventory, and start the
    /// background schedules.
    ///
    /// If the first listing fails the cached accessories are kept and
    /// polled as they are.
    pub async fn start(self: &Arc<Self>) {
        self.session.refresh_credentials().await;

        if self.reconcile_once().await.is_err() {
            for record in self.host.cached_accessories() {
                self.ensure_engine(&record);
            }
        }

        let mut background = self.background.lock().await;

        let session = Arc::clone(&self.session);
        background.push(ScheduledTask::spawn(
            "token-refresh",
            self.settings.token_check_interval,
            FirstRun::AfterPeriod,
            move || {
                let session = Arc::clone(&session);
                async move {
                    session.refresh_credentials().await;
                }
            },
        ));

        if let Some(period) = self.settings.inventory_interval {
            let bridge = Arc::clone(self);
            background.push(ScheduledTask::spawn(
                "inventory",
                period,
                FirstRun::AfterPeriod,
                move || {
                    let bridge = Arc::clone(&bridge);
                    async move {
                        // Failures are logged by reconcile_once().
                        let _ = bridge.reconcile_once().await;
                    }
                },
            ));
        }

        info!(devices = self.devices.len(), "bridge started");
    }

    /// List remote devices once and apply the difference to the host.
    ///
    /// A failed listing changes nothing.
    pub async fn reconcile_once(&self) -> Result<Reconciliation, CoreError> {
        let remote = match self.session.list_devices().await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "inventory listing failed, keeping current accessories"
                );
                return Err(e);
            }
        };

        let cached = self.host.cached_accessories();
        let mut result = reconcile(&remote, &cached);

        for record in &mut result.to_update {
            let latest = self
                .devices
                .get(&record.uuid)
                .and_then(|slot| slot.engine.snapshot());
            if latest.is_some() {
                record.cached_state = latest;
            }
        }

        self.apply_to_host("register", &result.to_register, |h, r| h.register(r));
        self.apply_to_host("update", &result.to_update, |h, r| h.update(r));
        self.apply_to_host("unregister", &result.to_retire, |h, r| h.unregister(r));

        for record in &result.to_retire {
            if let Some((_, slot)) = self.devices.remove(&record.uuid) {
                slot.task.stop();
            }
        }
        for record in result.active() {
            self.ensure_engine(record);
        }

        debug!(
            registered = result.to_register.len(),
            updated = result.to_update.len(),
            retired = result.to_retire.len(),
            "inventory reconciled"
        );
        Ok(result)
    }

    /// Engines for every registered thermostat, ordered by display name.
    pub fn engines(&self) -> Vec<Arc<SyncEngine<R::Device>>> {
        let mut engines: Vec<_> = self
            .devices
            .iter()
            .map(|slot| Arc::clone(&slot.engine))
            .collect();
        engines.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        engines
    }

    pub fn engine(&self, uuid: &Uuid) -> Option<Arc<SyncEngine<R::Device>>> {
        self.devices.get(uuid).map(|slot| Arc::clone(&slot.engine))
    }

    /// Stop all schedules and write each accessory's last known state back
    /// to the host cache.
    pub async fn shutdown(&self) {
        let background: Vec<ScheduledTask> = self.background.lock().await.drain(..).collect();
        for task in background {
            task.shutdown().await;
        }

        let uuids: Vec<Uuid> = self.devices.iter().map(|slot| *slot.key()).collect();
        let mut engines = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            if let Some((_, slot)) = self.devices.remove(&uuid) {
                slot.task.shutdown().await;
                engines.push((uuid, slot.engine));
            }
        }

        let records: Vec<AccessoryRecord> = self
            .host
            .cached_accessories()
            .into_iter()
            .filter_map(|mut record| {
                let (_, engine) = engines.iter().find(|(uuid, _)| *uuid == record.uuid)?;
                record.cached_state = Some(engine.snapshot()?);
                Some(record)
            })
            .collect();
        self.apply_to_host("update", &records, |h, r| h.update(r));

        info!(saved = records.len(), "bridge stopped");
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Start an engine for `record` unless one already runs under its name.
    ///
    /// A renamed device gets a fresh handle and engine seeded with the old
    /// engine's state.
    fn ensure_engine(&self, record: &AccessoryRecord) {
        match self.devices.entry(record.uuid) {
            Entry::Vacant(vacant) => {
                vacant.insert(self.spawn_slot(record, record.cached_state.clone()));
            }
            Entry::Occupied(mut occupied) => {
                if occupied.get().engine.display_name() == record.display_name {
                    return;
                }
                let seed = occupied
                    .get()
                    .engine
                    .snapshot()
                    .or_else(|| record.cached_state.clone());
                let previous = occupied.insert(self.spawn_slot(record, seed));
                previous.task.stop();
                debug!(
                    device = %record.device.remote_id,
                    name = %record.display_name,
                    "device renamed, engine replaced"
                );
            }
        }
    }

    fn spawn_slot(
        &self,
        record: &AccessoryRecord,
        seed: Option<ThermostatState>,
    ) -> DeviceSlot<R::Device> {
        let engine = Arc::new(
            SyncEngine::new(
                self.session.device(&record.device),
                record.display_name.clone(),
                self.settings.temperature_unit,
            )
            .with_cached_state(seed),
        );
        let task = engine.start(self.settings.poll_interval);
        DeviceSlot { engine, task }
    }

    fn apply_to_host(
        &self,
        action: &str,
        records: &[AccessoryRecord],
        apply: impl FnOnce(&H, &[AccessoryRecord]) -> Result<(), CoreError>,
    ) {
        if records.is_empty() {
            return;
        }
        if let Err(e) = apply(self.host.as_ref(), records) {
            warn!(action, count = records.len(), error = %e, "accessory cache update failed");
        }
    }
}
