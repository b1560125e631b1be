// ── Host accessory contract ──
//
// The host owns the set of exposed accessories and keeps it across
// restarts. The bridge only asks it for the cached set and tells it which
// records to add, refresh, or drop.

mod cache;

pub use cache::{ACCESSORY_CACHE_FILE_NAME, JsonAccessoryCache};

use crate::error::CoreError;
use crate::model::AccessoryRecord;

pub trait AccessoryHost: Send + Sync {
    /// Accessories restored from the persistent cache.
    fn cached_accessories(&self) -> Vec<AccessoryRecord>;

    fn register(&self, records: &[AccessoryRecord]) -> Result<(), CoreError>;

    /// Replace stored records that share a UUID with `records`.
    fn update(&self, records: &[AccessoryRecord]) -> Result<(), CoreError>;

    fn unregister(&self, records: &[AccessoryRecord]) -> Result<(), CoreError>;
}
