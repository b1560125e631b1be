// ── Inventory reconciliation ──
//
// Diff the remote device listing against the cached accessory set. Pure:
// the caller applies the result to the host.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::model::{AccessoryRecord, DeviceDescriptor};

/// Changes needed to bring the cached accessory set in line with the remote
/// listing. The three lists never share an identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Devices seen for the first time.
    pub to_register: Vec<AccessoryRecord>,
    /// Cached accessories still listed remotely, with refreshed descriptors.
    pub to_update: Vec<AccessoryRecord>,
    /// Cached accessories whose device is gone.
    pub to_retire: Vec<AccessoryRecord>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.to_register.is_empty() && self.to_update.is_empty() && self.to_retire.is_empty()
    }

    /// Every accessory that stays registered after this pass.
    pub fn active(&self) -> impl Iterator<Item = &AccessoryRecord> {
        self.to_register.iter().chain(self.to_update.iter())
    }
}

pub fn reconcile(remote: &[DeviceDescriptor], cached: &[AccessoryRecord]) -> Reconciliation {
    let cached_by_id: HashMap<Uuid, &AccessoryRecord> =
        cached.iter().map(|record| (record.uuid, record)).collect();

    let mut active_ids: HashSet<Uuid> = HashSet::with_capacity(remote.len());
    let mut result = Reconciliation::default();

    for device in remote {
        let id = device.uuid();
        if !active_ids.insert(id) {
            // Listed twice; the first entry wins.
            continue;
        }

        match cached_by_id.get(&id) {
            Some(existing) => result.to_update.push(AccessoryRecord {
                uuid: id,
                display_name: device.display_name.clone(),
                device: device.clone(),
                cached_state: existing.cached_state.clone(),
            }),
            None => result.to_register.push(AccessoryRecord::new(device.clone())),
        }
    }

    let mut retired: HashSet<Uuid> = HashSet::new();
    result.to_retire = cached
        .iter()
        .filter(|record| !active_ids.contains(&record.uuid) && retired.insert(record.uuid))
        .cloned()
        .collect();

    result
}
