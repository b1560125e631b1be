// fenix-api: Async Rust client for the Fenix TFT Wifi cloud API

pub mod client;
pub mod error;
pub mod identity;
pub mod installations;
pub mod models;
pub mod thermostat;
pub mod transport;

pub use client::{DEFAULT_API_URL, DEFAULT_IDENTITY_URL, Endpoints, FenixClient};
pub use error::Error;
pub use identity::{RefreshGrant, TokenResponse};
pub use models::{
    ConfigEntry, ConfigReplace, Installation, RawCell, Room, ScaledValue, Sensor, ThermostatContent,
};
pub use transport::{TlsMode, TransportConfig};
