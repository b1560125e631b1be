// File-backed accessory cache. The whole set is rewritten on every change.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::AccessoryHost;
use crate::error::CoreError;
use crate::model::AccessoryRecord;

pub const ACCESSORY_CACHE_FILE_NAME: &str = "accessories.json";

#[derive(Debug)]
pub struct JsonAccessoryCache {
    path: PathBuf,
    records: DashMap<Uuid, AccessoryRecord>,
}

impl JsonAccessoryCache {
    /// Open (or start) the cache in `storage_dir`.
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = storage_dir.as_ref().join(ACCESSORY_CACHE_FILE_NAME);
        let records = DashMap::new();

        match fs::read_to_string(&path) {
            Ok(raw) => {
                let stored: Vec<AccessoryRecord> =
                    serde_json::from_str(&raw).map_err(|e| CoreError::HostCache {
                        message: format!("{}: {e}", path.display()),
                    })?;
                for record in stored {
                    records.insert(record.uuid, record);
                }
                debug!(path = %path.display(), count = records.len(), "restored accessory cache");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CoreError::HostCache {
                    message: format!("{}: {e}", path.display()),
                });
            }
        }

        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sorted(&self) -> Vec<AccessoryRecord> {
        let mut all: Vec<AccessoryRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.uuid.cmp(&b.uuid))
        });
        all
    }

    fn flush(&self) -> Result<(), CoreError> {
        let err = |e: &dyn std::fmt::Display| CoreError::HostCache {
            message: format!("{}: {e}", self.path.display()),
        };

        let body = serde_json::to_vec_pretty(&self.sorted()).map_err(|e| err(&e))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| err(&e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut handle = fs::File::create(&tmp).map_err(|e| err(&e))?;
        handle
            .write_all(&body)
            .and_then(|()| handle.sync_all())
            .map_err(|e| err(&e))?;
        fs::rename(&tmp, &self.path).map_err(|e| err(&e))
    }
}

impl AccessoryHost for JsonAccessoryCache {
    fn cached_accessories(&self) -> Vec<AccessoryRecord> {
        self.sorted()
    }

    fn register(&self, records: &[AccessoryRecord]) -> Result<(), CoreError> {
        for record in records {
            info!(name = %record.display_name, uuid = %record.uuid, "registering accessory");
            self.records.insert(record.uuid, record.clone());
        }
        self.flush()
    }

    fn update(&self, records: &[AccessoryRecord]) -> Result<(), CoreError> {
        for record in records {
            self.records.insert(record.uuid, record.clone());
        }
        self.flush()
    }

    fn unregister(&self, records: &[AccessoryRecord]) -> Result<(), CoreError> {
        for record in records {
            info!(name = %record.display_name, uuid = %record.uuid, "removing accessory");
            self.records.remove(&record.uuid);
        }
        self.flush()
    }
}
