use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manifest::PackageManifest;

/// A package as durably recorded on this device.
///
/// One record exists per identifier; installing the same identifier again
/// replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledPackageRecord {
    pub id: String,
    pub manifest: PackageManifest,
    pub code: String,
    pub installed_at: DateTime<Utc>,
    pub version: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl InstalledPackageRecord {
    /// Build a fresh, enabled record stamped with the current time.
    pub fn new(manifest: PackageManifest, code: String) -> Self {
        Self {
            id: manifest.id.clone(),
            version: manifest.version.clone(),
            manifest,
            code,
            installed_at: Utc::now(),
            enabled: true,
        }
    }
}
