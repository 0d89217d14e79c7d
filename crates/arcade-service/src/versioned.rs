//! Version-checked whole-record replacement.
//!
//! The caller supplies the record as it read it. The write goes through
//! only if the stored record still carries that version, and then bumps
//! it. The final write is a compare-and-swap on the raw stored JSON, so a
//! concurrent writer that slipped in between is also detected.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use arcade_core::error::AppError;
use arcade_core::result::AppResult;
use arcade_core::traits::store::EphemeralStore;
use arcade_entity::challenge::Challenge;
use arcade_entity::session::Session;

/// A record carrying a write counter.
pub(crate) trait Versioned: Serialize + DeserializeOwned {
    /// Current version.
    fn version(&self) -> u64;
    /// Overwrite the version.
    fn set_version(&mut self, version: u64);
}

impl Versioned for Challenge {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Versioned for Session {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Replace the record stored at `key` with `record`, bumping its version.
///
/// `NotFound` if the key is gone, `Conflict` if the version moved.
pub(crate) async fn replace<T: Versioned>(
    store: &dyn EphemeralStore,
    key: &str,
    record: &mut T,
    ttl: Duration,
    what: &str,
) -> AppResult<()> {
    let current = store
        .get(key)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{what} not found")))?;
    let stored: T = serde_json::from_str(&current)?;

    if stored.version() != record.version() {
        return Err(AppError::conflict(format!(
            "{what} was modified concurrently (version {} != {}), retry",
            record.version(),
            stored.version()
        )));
    }

    let read_version = record.version();
    record.set_version(read_version + 1);
    let json = serde_json::to_string(record)?;

    if !store.compare_and_swap(key, &current, &json, ttl).await? {
        record.set_version(read_version);
        return Err(AppError::conflict(format!(
            "{what} was modified concurrently, retry"
        )));
    }
    Ok(())
}
