//! Shared data model for hatch.
//!
//! These types cross every crate boundary: the registry client produces
//! manifests, the local store persists [`InstalledPackageRecord`]s, and the
//! installer reports [`InstallProgress`] to its caller.

pub mod manifest;
pub mod progress;
pub mod record;

pub use manifest::PackageManifest;
pub use progress::{InstallProgress, InstallStatus};
pub use record::InstalledPackageRecord;
