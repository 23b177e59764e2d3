//! Durable local record of installed packages.
//!
//! The [`PackageStore`] trait is the only way the rest of hatch touches
//! persisted package state. [`FilesystemPackageStore`] keeps one JSON
//! document per package identifier and survives process restarts.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::FilesystemPackageStore;
pub use error::{Result, StorageError};
pub use traits::PackageStore;
