// fenix-core: credential lifecycle and thermostat sync between fenix-api and
// the accessory host.

pub mod bridge;
pub mod config;
pub mod credential;
pub mod error;
pub mod host;
pub mod model;
pub mod reconcile;
pub mod schedule;
pub mod session;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{Bridge, BridgeSettings};
pub use config::BridgeConfig;
pub use credential::{CredentialManager, RefreshOutcome, TokenClaims};
pub use error::CoreError;
pub use host::{AccessoryHost, JsonAccessoryCache};
pub use reconcile::{Reconciliation, reconcile};
pub use schedule::{FirstRun, ScheduledTask};
pub use session::{DeviceHandle, FenixCredentials, FenixSession, RemoteSession};
pub use sync::{SyncEngine, SyncPhase, ThermostatApi};

pub use model::{
    AccessoryInformation, AccessoryRecord, CharacteristicProps, CurrentHvacState, DeviceDescriptor,
    DeviceMode, Presentation, TargetHvacState, TemperatureUnit, ThermostatState,
};
