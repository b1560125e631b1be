// ── Remote session ──
//
// Binds the HTTP client to the credential manager so that every request
// carries the current bearer token. Hands out one `DeviceHandle` per
// thermostat for the sync engines.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use fenix_api::FenixClient;

use crate::config::BridgeConfig;
use crate::credential::{CredentialManager, JsonFileStore, RefreshOutcome};
use crate::error::CoreError;
use crate::model::{DeviceDescriptor, DeviceMode, ThermostatState};
use crate::sync::ThermostatApi;

/// Credential manager bound to the shared HTTP client.
pub type FenixCredentials = CredentialManager<Arc<FenixClient>>;

/// What the bridge needs from the remote side.
pub trait RemoteSession: Send + Sync + 'static {
    type Device: ThermostatApi;

    fn list_devices(&self) -> impl Future<Output = Result<Vec<DeviceDescriptor>, CoreError>> + Send;

    fn device(&self, descriptor: &DeviceDescriptor) -> Self::Device;

    fn refresh_credentials(&self) -> impl Future<Output = RefreshOutcome> + Send;
}

// ── FenixSession ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct FenixSession {
    client: Arc<FenixClient>,
    credentials: Arc<FenixCredentials>,
}

impl FenixSession {
    pub fn new(client: Arc<FenixClient>, credentials: Arc<FenixCredentials>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Build the client and credential manager described by `config` and
    /// load persisted credentials.
    ///
    /// An undecodable access token is logged and tolerated; requests will
    /// fail with an authentication error until the token is replaced.
    pub fn connect(config: &BridgeConfig) -> Result<Self, CoreError> {
        let client = Arc::new(
            FenixClient::new(config.endpoints.clone(), &config.transport)
                .map_err(|e| CoreError::client_setup(&e))?,
        );
        let credentials = CredentialManager::new(
            config.access_token.clone(),
            config.refresh_token.clone(),
            Box::new(JsonFileStore::in_dir(&config.storage_path)),
            Arc::clone(&client),
        )
        .with_skew(config.refresh_skew);

        // Degraded credentials are reported by initialize() itself.
        let _ = credentials.initialize();

        Ok(Self::new(client, Arc::new(credentials)))
    }

    pub fn client(&self) -> &FenixClient {
        &self.client
    }

    pub fn credentials(&self) -> &Arc<FenixCredentials> {
        &self.credentials
    }
}

impl RemoteSession for FenixSession {
    type Device = DeviceHandle;

    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, CoreError> {
        let subject = self
            .credentials
            .subject_id()
            .ok_or_else(|| CoreError::InventoryFetch {
                source: fenix_api::Error::InvalidToken("access token has no subject claim".into()),
            })?;

        let sensors = self
            .client
            .list_sensors(&self.credentials.current_token(), &subject)
            .await
            .map_err(|source| CoreError::InventoryFetch { source })?;

        debug!(count = sensors.len(), "listed remote thermostats");
        Ok(sensors.into_iter().map(DeviceDescriptor::from).collect())
    }

    fn device(&self, descriptor: &DeviceDescriptor) -> DeviceHandle {
        DeviceHandle {
            client: Arc::clone(&self.client),
            credentials: Arc::clone(&self.credentials),
            device_id: descriptor.remote_id.clone(),
        }
    }

    async fn refresh_credentials(&self) -> RefreshOutcome {
        self.credentials.refresh_if_needed().await
    }
}

// ── DeviceHandle ─────────────────────────────────────────────────────

/// One thermostat, reachable with the session's current token.
#[derive(Clone)]
pub struct DeviceHandle {
    client: Arc<FenixClient>,
    credentials: Arc<FenixCredentials>,
    device_id: String,
}

impl ThermostatApi for DeviceHandle {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn fetch_state(&self) -> Result<ThermostatState, CoreError> {
        self.client
            .get_thermostat(&self.credentials.current_token(), &self.device_id)
            .await
            .map(ThermostatState::from)
            .map_err(|source| CoreError::DeviceFetch {
                device: self.device_id.clone(),
                source,
            })
    }

    async fn write_setpoint(&self, fahrenheit: f64) -> Result<(), CoreError> {
        self.client
            .set_setpoint(&self.credentials.current_token(), &self.device_id, fahrenheit)
            .await
            .map_err(|source| CoreError::DeviceWrite {
                device: self.device_id.clone(),
                source,
            })
    }

    async fn write_mode(&self, mode: DeviceMode) -> Result<(), CoreError> {
        self.client
            .set_mode_code(&self.credentials.current_token(), &self.device_id, mode.code())
            .await
            .map_err(|source| CoreError::DeviceWrite {
                device: self.device_id.clone(),
                source,
            })
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}
