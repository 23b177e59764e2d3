//! Trait definitions for the local package store.

use async_trait::async_trait;
use hatch_types::InstalledPackageRecord;

use crate::error::Result;

/// Durable key/value record of installed packages, keyed by identifier.
///
/// Implementations give "last `put` wins" semantics and nothing stronger.
/// Callers must not race `put`/`delete` on the same identifier.
#[async_trait]
pub trait PackageStore: Send + Sync {
    /// Insert or replace the record for `record.id`.
    async fn put(&self, record: &InstalledPackageRecord) -> Result<()>;

    /// Get the record for an identifier.
    ///
    /// # Returns
    /// `Some(record)` if installed, `None` otherwise
    async fn get(&self, id: &str) -> Result<Option<InstalledPackageRecord>>;

    /// Every stored record, ordered by identifier.
    async fn get_all(&self) -> Result<Vec<InstalledPackageRecord>>;

    /// Remove the record for an identifier. Removing an absent record is not an error.
    ///
    /// # Returns
    /// `true` if a record was removed, `false` if none existed
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Flip the `enabled` flag on a stored record.
    ///
    /// # Returns
    /// `true` if the record existed
    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool> {
        let Some(mut record) = self.get(id).await? else {
            return Ok(false);
        };
        if record.enabled != enabled {
            record.enabled = enabled;
            self.put(&record).await?;
        }
        Ok(true)
    }
}
