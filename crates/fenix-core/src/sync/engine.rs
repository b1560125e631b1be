// ── Device synchronization engine ──
//
// One engine per thermostat. It holds the last confirmed remote snapshot
// plus any optimistic mutation made by a user write, and publishes the
// derived presentation whenever either changes. A poll replaces the whole
// state and drops anything pending.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::api::ThermostatApi;
use crate::error::CoreError;
use crate::model::presentation::below_usable_setpoint;
use crate::model::{
    AccessoryInformation, CharacteristicProps, CurrentHvacState, DeviceMode, Presentation,
    TargetHvacState, TemperatureUnit, ThermostatState, derive_presentation,
};
use crate::schedule::{FirstRun, ScheduledTask};

/// Setpoints closer than this (°F) are treated as equal.
const SETPOINT_TOLERANCE: f64 = 1e-6;

// ── State ────────────────────────────────────────────────────────────

/// Where the engine is in its confirm cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No snapshot yet.
    Uninitialized,
    /// Presentation reflects the last poll.
    Synced,
    /// A user write is applied locally and awaits the next poll.
    PendingConfirm,
}

/// Optimistic overlay on top of the confirmed snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
struct PendingWrite {
    required_temperature: Option<f64>,
    mode: Option<DeviceMode>,
}

#[derive(Debug, Clone, Default)]
struct EngineState {
    confirmed: Option<ThermostatState>,
    pending: Option<PendingWrite>,
}

impl EngineState {
    fn phase(&self) -> SyncPhase {
        match (&self.confirmed, &self.pending) {
            (None, _) => SyncPhase::Uninitialized,
            (Some(_), Some(_)) => SyncPhase::PendingConfirm,
            (Some(_), None) => SyncPhase::Synced,
        }
    }

    fn effective(&self) -> Option<ThermostatState> {
        let mut state = self.confirmed.clone()?;
        if let Some(pending) = &self.pending {
            if let Some(required) = pending.required_temperature {
                state.required_temperature = required;
            }
            if let Some(mode) = pending.mode {
                state.mode = mode;
            }
        }
        Some(state)
    }

    fn with_pending(&self, apply: impl FnOnce(&mut PendingWrite)) -> Self {
        let mut pending = self.pending.clone().unwrap_or_default();
        apply(&mut pending);
        Self {
            confirmed: self.confirmed.clone(),
            pending: Some(pending),
        }
    }
}

// ── SyncEngine ───────────────────────────────────────────────────────

pub struct SyncEngine<A> {
    api: A,
    display_name: String,
    unit: TemperatureUnit,
    state: ArcSwap<EngineState>,
    presentation: watch::Sender<Option<Presentation>>,
}

impl<A: ThermostatApi> SyncEngine<A> {
    pub fn new(api: A, display_name: impl Into<String>, unit: TemperatureUnit) -> Self {
        let (presentation, _) = watch::channel(None);
        Self {
            api,
            display_name: display_name.into(),
            unit,
            state: ArcSwap::from_pointee(EngineState::default()),
            presentation,
        }
    }

    /// Start from a previously cached snapshot. It counts as confirmed until
    /// the first poll replaces it.
    #[must_use]
    pub fn with_cached_state(self, cached: Option<ThermostatState>) -> Self {
        if let Some(state) = cached {
            self.state.store(Arc::new(EngineState {
                confirmed: Some(state),
                pending: None,
            }));
            self.publish();
        }
        self
    }

    pub fn device_id(&self) -> &str {
        self.api.device_id()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.load().phase()
    }

    /// Confirmed snapshot with any pending write applied.
    pub fn snapshot(&self) -> Option<ThermostatState> {
        self.state.load().effective()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Presentation>> {
        self.presentation.subscribe()
    }

    // ── Get hooks ────────────────────────────────────────────────────

    pub fn presentation(&self) -> Option<Presentation> {
        self.presentation.borrow().clone()
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.presentation.borrow().as_ref().map(|p| p.current_temperature)
    }

    pub fn target_temperature(&self) -> Option<f64> {
        self.presentation.borrow().as_ref().map(|p| p.target_temperature)
    }

    pub fn current_hvac_state(&self) -> Option<CurrentHvacState> {
        self.presentation.borrow().as_ref().map(|p| p.current_hvac)
    }

    pub fn target_hvac_state(&self) -> Option<TargetHvacState> {
        self.presentation.borrow().as_ref().map(|p| p.target_hvac)
    }

    pub fn information(&self) -> Option<AccessoryInformation> {
        self.state
            .load()
            .confirmed
            .as_ref()
            .map(AccessoryInformation::from_state)
    }

    pub fn props(&self) -> CharacteristicProps {
        CharacteristicProps::for_unit(self.unit)
    }

    // ── Poll ─────────────────────────────────────────────────────────

    /// Fetch the remote snapshot and replace local state with it.
    ///
    /// On failure the previous state, including anything pending, is kept.
    pub async fn poll(&self) -> Result<(), CoreError> {
        match self.api.fetch_state().await {
            Ok(state) => {
                debug!(
                    device = %self.device_id(),
                    actual = state.actual_temperature,
                    required = state.required_temperature,
                    mode = %state.mode,
                    "polled thermostat"
                );
                self.state.store(Arc::new(EngineState {
                    confirmed: Some(state),
                    pending: None,
                }));
                self.publish();
                Ok(())
            }
            Err(e) => {
                warn!(
                    device = %self.device_id(),
                    error = %e,
                    transient = e.is_transient(),
                    "poll failed, keeping last state"
                );
                Err(e)
            }
        }
    }

    /// Poll every `period`, starting now.
    pub fn start(self: &Arc<Self>, period: Duration) -> ScheduledTask {
        let engine = Arc::clone(self);
        ScheduledTask::spawn(
            format!("poll:{}", self.device_id()),
            period,
            FirstRun::Immediately,
            move || {
                let engine = Arc::clone(&engine);
                async move {
                    // Already logged by poll().
                    let _ = engine.poll().await;
                }
            },
        )
    }

    // ── Set hooks ────────────────────────────────────────────────────

    /// Set the target temperature, given in `unit`.
    ///
    /// Unchanged values are a no-op. Celsius values below the lowest usable
    /// setpoint are shown locally but never sent.
    pub async fn set_target_temperature(
        &self,
        value: f64,
        unit: TemperatureUnit,
    ) -> Result<(), CoreError> {
        if !value.is_finite() {
            return Err(CoreError::Validation {
                field: "target_temperature".into(),
                reason: format!("{value} is not a temperature"),
            });
        }
        let native = unit.to_native(value);

        let unchanged = self.snapshot().is_some_and(|current| {
            (current.required_temperature - native).abs() < SETPOINT_TOLERANCE
        });
        if unchanged {
            debug!(device = %self.device_id(), "target temperature unchanged");
            return Ok(());
        }

        if below_usable_setpoint(value, unit) {
            info!(
                device = %self.device_id(),
                value,
                unit = %unit,
                "setpoint below device minimum, applied locally only"
            );
            self.apply_pending(|p| p.required_temperature = Some(native));
            return Ok(());
        }

        // A setpoint write also switches the device to manual.
        self.apply_pending(|p| {
            p.required_temperature = Some(native);
            p.mode = Some(DeviceMode::Manual);
        });
        self.send(self.api.write_setpoint(native).await, "setpoint")
    }

    /// Set the heating/cooling mode. Always sent, even if unchanged.
    pub async fn set_mode(&self, target: TargetHvacState) -> Result<(), CoreError> {
        let mode = target.device_mode();

        if mode == DeviceMode::Manual {
            let Some(current) = self.snapshot() else {
                return Err(CoreError::Validation {
                    field: "mode".into(),
                    reason: "no setpoint known yet; poll first".into(),
                });
            };
            self.apply_pending(|p| p.mode = Some(DeviceMode::Manual));
            return self.send(
                self.api.write_setpoint(current.required_temperature).await,
                "mode",
            );
        }

        self.apply_pending(|p| p.mode = Some(mode));
        self.send(self.api.write_mode(mode).await, "mode")
    }

    // ── Internals ────────────────────────────────────────────────────

    fn apply_pending(&self, apply: impl Fn(&mut PendingWrite)) {
        self.state.rcu(|current| current.with_pending(&apply));
        self.publish();
    }

    fn send(&self, result: Result<(), CoreError>, what: &str) -> Result<(), CoreError> {
        match result {
            Ok(()) => {
                info!(device = %self.device_id(), what, "write accepted");
                Ok(())
            }
            Err(e) => {
                error!(
                    device = %self.device_id(),
                    what,
                    error = %e,
                    "write failed, local value pending until next poll"
                );
                Err(e)
            }
        }
    }

    fn publish(&self) {
        let next = self
            .state
            .load()
            .effective()
            .map(|state| derive_presentation(&state, self.unit));
        self.presentation.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

impl<A> std::fmt::Debug for SyncEngine<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("display_name", &self.display_name)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Setpoint(f64),
        Mode(DeviceMode),
    }

    /// Scripted thermostat: returns queued snapshots and records writes.
    #[derive(Default)]
    struct FakeThermostat {
        snapshots: Mutex<VecDeque<Option<ThermostatState>>>,
        calls: Mutex<Vec<Call>>,
        fail_writes: bool,
    }

    fn outage() -> fenix_api::Error {
        fenix_api::Error::Api {
            status: 503,
            message: "unavailable".into(),
        }
    }

    impl FakeThermostat {
        fn queue(&self, state: Option<ThermostatState>) {
            self.snapshots.lock().unwrap().push_back(state);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ThermostatApi for Arc<FakeThermostat> {
        fn device_id(&self) -> &str {
            "dev-1"
        }

        async fn fetch_state(&self) -> Result<ThermostatState, CoreError> {
            match self.snapshots.lock().unwrap().pop_front().flatten() {
                Some(state) => Ok(state),
                None => Err(CoreError::DeviceFetch {
                    device: "dev-1".into(),
                    source: outage(),
                }),
            }
        }

        async fn write_setpoint(&self, fahrenheit: f64) -> Result<(), CoreError> {
            self.calls.lock().unwrap().push(Call::Setpoint(fahrenheit));
            self.write_result()
        }

        async fn write_mode(&self, mode: DeviceMode) -> Result<(), CoreError> {
            self.calls.lock().unwrap().push(Call::Mode(mode));
            self.write_result()
        }
    }

    impl FakeThermostat {
        fn write_result(&self) -> Result<(), CoreError> {
            if self.fail_writes {
                Err(CoreError::DeviceWrite {
                    device: "dev-1".into(),
                    source: outage(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn state(actual: f64, required: f64, mode: DeviceMode) -> ThermostatState {
        ThermostatState {
            actual_temperature: actual,
            required_temperature: required,
            mode,
            model: "TFT".into(),
            software_version: "2.1".into(),
        }
    }

    fn engine(fake: &Arc<FakeThermostat>) -> SyncEngine<Arc<FakeThermostat>> {
        SyncEngine::new(Arc::clone(fake), "Bathroom", TemperatureUnit::Celsius)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    // ── Poll ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn poll_publishes_converted_presentation() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(50.0, 55.0, DeviceMode::Manual)));
        let engine = engine(&fake);
        assert_eq!(engine.phase(), SyncPhase::Uninitialized);
        assert!(engine.presentation().is_none());

        engine.poll().await.unwrap();

        assert_eq!(engine.phase(), SyncPhase::Synced);
        assert!(close(engine.current_temperature().unwrap(), 10.0));
        assert!(close(engine.target_temperature().unwrap(), 12.778));
        assert_eq!(engine.current_hvac_state(), Some(CurrentHvacState::Heat));
        assert_eq!(engine.target_hvac_state(), Some(TargetHvacState::Heat));
        assert_eq!(engine.information().unwrap().model, "Fenix TFT Wifi TFT");
    }

    #[tokio::test]
    async fn failed_poll_keeps_last_state() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(60.0, 65.0, DeviceMode::Auto)));
        fake.queue(None);
        let engine = engine(&fake);

        engine.poll().await.unwrap();
        let before = engine.presentation();
        let err = engine.poll().await.unwrap_err();

        assert!(matches!(err, CoreError::DeviceFetch { .. }));
        assert_eq!(engine.presentation(), before);
        assert_eq!(engine.phase(), SyncPhase::Synced);
    }

    #[tokio::test]
    async fn off_mode_presents_off() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(50.0, 70.0, DeviceMode::Off)));
        let engine = engine(&fake);
        engine.poll().await.unwrap();

        assert_eq!(engine.current_hvac_state(), Some(CurrentHvacState::Off));
        assert_eq!(engine.target_hvac_state(), Some(TargetHvacState::Off));
    }

    #[tokio::test]
    async fn cached_state_seeds_presentation() {
        let fake = Arc::new(FakeThermostat::default());
        let engine = engine(&fake).with_cached_state(Some(state(68.0, 68.0, DeviceMode::Auto)));
        assert_eq!(engine.phase(), SyncPhase::Synced);
        assert!(close(engine.current_temperature().unwrap(), 20.0));
    }

    // ── Writes ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn target_temperature_write_then_poll_confirms() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(66.0, 68.0, DeviceMode::Auto)));
        fake.queue(Some(state(66.0, 71.6, DeviceMode::Manual)));
        let engine = engine(&fake);
        engine.poll().await.unwrap();

        engine
            .set_target_temperature(22.0, TemperatureUnit::Celsius)
            .await
            .unwrap();

        assert_eq!(engine.phase(), SyncPhase::PendingConfirm);
        assert_eq!(fake.calls().len(), 1);
        let Call::Setpoint(sent) = fake.calls()[0].clone() else {
            panic!("expected a setpoint write");
        };
        assert!(close(sent, 71.6));
        assert!(close(engine.target_temperature().unwrap(), 22.0));

        engine.poll().await.unwrap();
        assert_eq!(engine.phase(), SyncPhase::Synced);
        assert!(close(engine.target_temperature().unwrap(), 22.0));
    }

    #[tokio::test]
    async fn unchanged_target_temperature_is_not_sent() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(66.0, 68.0, DeviceMode::Auto)));
        let engine = engine(&fake);
        engine.poll().await.unwrap();

        engine
            .set_target_temperature(20.0, TemperatureUnit::Celsius)
            .await
            .unwrap();
        engine
            .set_target_temperature(68.0, TemperatureUnit::Fahrenheit)
            .await
            .unwrap();

        assert!(fake.calls().is_empty());
        assert_eq!(engine.phase(), SyncPhase::Synced);
    }

    #[tokio::test]
    async fn repeated_target_temperature_is_sent_once() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(66.0, 68.0, DeviceMode::Auto)));
        let engine = engine(&fake);
        engine.poll().await.unwrap();

        for _ in 0..2 {
            engine
                .set_target_temperature(22.0, TemperatureUnit::Celsius)
                .await
                .unwrap();
        }

        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], Call::Setpoint(sent) if close(sent, 71.6)));
        assert_eq!(engine.phase(), SyncPhase::PendingConfirm);
    }

    #[tokio::test]
    async fn failed_write_stays_pending_until_poll() {
        let fake = Arc::new(FakeThermostat {
            fail_writes: true,
            ..FakeThermostat::default()
        });
        fake.queue(Some(state(66.0, 68.0, DeviceMode::Auto)));
        fake.queue(Some(state(66.0, 68.0, DeviceMode::Auto)));
        let engine = engine(&fake);
        engine.poll().await.unwrap();

        let err = engine
            .set_target_temperature(22.0, TemperatureUnit::Celsius)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DeviceWrite { .. }));
        assert_eq!(engine.phase(), SyncPhase::PendingConfirm);
        assert!(close(engine.target_temperature().unwrap(), 22.0));

        engine.poll().await.unwrap();
        assert_eq!(engine.phase(), SyncPhase::Synced);
        assert!(close(engine.target_temperature().unwrap(), 20.0));
    }

    #[tokio::test]
    async fn setpoint_below_minimum_is_local_only() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(66.0, 68.0, DeviceMode::Manual)));
        let engine = engine(&fake);
        engine.poll().await.unwrap();

        engine
            .set_target_temperature(5.0, TemperatureUnit::Celsius)
            .await
            .unwrap();

        assert!(fake.calls().is_empty());
        assert!(close(engine.target_temperature().unwrap(), 5.0));
        assert_eq!(engine.target_hvac_state(), Some(TargetHvacState::Off));
    }

    #[tokio::test]
    async fn low_fahrenheit_setpoint_is_sent() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(66.0, 68.0, DeviceMode::Manual)));
        let engine = SyncEngine::new(Arc::clone(&fake), "Bathroom", TemperatureUnit::Fahrenheit);
        engine.poll().await.unwrap();

        engine
            .set_target_temperature(40.0, TemperatureUnit::Fahrenheit)
            .await
            .unwrap();

        assert_eq!(fake.calls(), vec![Call::Setpoint(40.0)]);
        assert!(close(engine.target_temperature().unwrap(), 40.0));
        assert_eq!(engine.phase(), SyncPhase::PendingConfirm);
    }

    #[tokio::test]
    async fn heat_mode_is_sent_as_setpoint_write() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(66.0, 68.0, DeviceMode::Off)));
        let engine = engine(&fake);
        engine.poll().await.unwrap();

        engine.set_mode(TargetHvacState::Heat).await.unwrap();

        assert_eq!(fake.calls(), vec![Call::Setpoint(68.0)]);
        assert_eq!(engine.target_hvac_state(), Some(TargetHvacState::Heat));
    }

    #[tokio::test]
    async fn other_modes_send_mode_writes_every_time() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(66.0, 68.0, DeviceMode::Auto)));
        let engine = engine(&fake);
        engine.poll().await.unwrap();

        engine.set_mode(TargetHvacState::Off).await.unwrap();
        engine.set_mode(TargetHvacState::Off).await.unwrap();
        engine.set_mode(TargetHvacState::Cool).await.unwrap();
        engine.set_mode(TargetHvacState::Auto).await.unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                Call::Mode(DeviceMode::Off),
                Call::Mode(DeviceMode::Off),
                Call::Mode(DeviceMode::Antifreeze),
                Call::Mode(DeviceMode::Auto),
            ]
        );
    }

    #[tokio::test]
    async fn heat_without_snapshot_is_rejected() {
        let fake = Arc::new(FakeThermostat::default());
        let engine = engine(&fake);
        let err = engine.set_mode(TargetHvacState::Heat).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_optimistic_changes() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(66.0, 68.0, DeviceMode::Auto)));
        let engine = engine(&fake);
        engine.poll().await.unwrap();

        let mut rx = engine.subscribe();
        let _ = rx.borrow_and_update();
        engine.set_mode(TargetHvacState::Off).await.unwrap();

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone().unwrap();
        assert_eq!(seen.target_hvac, TargetHvacState::Off);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_polling() {
        let fake = Arc::new(FakeThermostat::default());
        fake.queue(Some(state(60.0, 65.0, DeviceMode::Auto)));
        fake.queue(Some(state(61.0, 65.0, DeviceMode::Auto)));
        let engine = Arc::new(engine(&fake));

        let task = engine.start(Duration::from_secs(1800));
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(close(engine.snapshot().unwrap().actual_temperature, 60.0));

        tokio::time::advance(Duration::from_secs(1800)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(close(engine.snapshot().unwrap().actual_temperature, 61.0));
        task.shutdown().await;
    }
}
