// ── Device identity types ──
//
// A DeviceDescriptor is what the remote listing says right now; an
// AccessoryRecord is what the local accessory cache remembers. They are
// joined on a UUID derived from the remote id, so the join survives
// re-listings and process restarts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fenix_api::Sensor;

use super::thermostat::ThermostatState;

/// Namespace for accessory UUIDs. Changing it orphans every cached accessory.
const ACCESSORY_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_2c4e_93b7_4d0a_8e25_f3c1_b0d9_7e42);

/// Deterministic accessory identity for a remote device id.
pub fn accessory_uuid(remote_id: &str) -> Uuid {
    Uuid::new_v5(&ACCESSORY_NAMESPACE, remote_id.as_bytes())
}

/// Identity snapshot of one thermostat from the remote inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub remote_id: String,
    pub display_name: String,
}

impl DeviceDescriptor {
    pub fn new(remote_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            display_name: display_name.into(),
        }
    }

    pub fn uuid(&self) -> Uuid {
        accessory_uuid(&self.remote_id)
    }
}

impl From<Sensor> for DeviceDescriptor {
    fn from(sensor: Sensor) -> Self {
        Self {
            remote_id: sensor.id,
            display_name: sensor.name,
        }
    }
}

/// A thermostat accessory as held by the host's persistent cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryRecord {
    pub uuid: Uuid,
    pub display_name: String,
    pub device: DeviceDescriptor,
    /// Last state seen by the sync engine, if any.
    #[serde(default)]
    pub cached_state: Option<ThermostatState>,
}

impl AccessoryRecord {
    /// New record for a device seen for the first time.
    pub fn new(device: DeviceDescriptor) -> Self {
        Self {
            uuid: device.uuid(),
            display_name: device.display_name.clone(),
            device,
            cached_state: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_is_stable_and_distinct() {
        let a = accessory_uuid("dev-1");
        assert_eq!(a, accessory_uuid("dev-1"));
        assert_ne!(a, accessory_uuid("dev-2"));
        assert_eq!(a.get_version_num(), 5);
    }

    #[test]
    fn new_record_derives_identity_from_remote_id() {
        let record = AccessoryRecord::new(DeviceDescriptor::new("dev-1", "Bathroom"));
        assert_eq!(record.uuid, accessory_uuid("dev-1"));
        assert_eq!(record.display_name, "Bathroom");
        assert!(record.cached_state.is_none());
    }
}
