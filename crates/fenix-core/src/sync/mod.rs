// Per-thermostat state synchronization.

pub mod api;
pub mod engine;

pub use api::ThermostatApi;
pub use engine::{SyncEngine, SyncPhase};
