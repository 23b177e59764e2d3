//! Hatch Store - registry resolution, validation and installation of packages
//!
//! This crate sequences the pieces that take a package identifier to a
//! running [`PackageInstance`](hatch_engine::PackageInstance):
//!
//! - [`RegistryClient`] resolves an identifier (or a repository URL) to a
//!   [`ResolvedBundle`] through a swappable [`Fetcher`].
//! - [`Validator`] checks the bundle's manifest, archive size and requested
//!   permissions.
//! - [`Installer`] persists validated bundles to a
//!   [`PackageStore`](hatch_storage::PackageStore) and instantiates them,
//!   reporting [`InstallProgress`](hatch_types::InstallProgress) along the way.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hatch_engine::ScriptEngine;
//! use hatch_storage::FilesystemPackageStore;
//! use hatch_store::{InstallOptions, Installer, NoProgress, RegistryClient, RegistryConfig, Validator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let installer = Installer::new(
//!     RegistryClient::new(RegistryConfig::default())?,
//!     Validator::default(),
//!     Arc::new(FilesystemPackageStore::new("./packages")),
//!     Arc::new(ScriptEngine::default()),
//! );
//!
//! let mut outcome = installer
//!     .install("com.example.sample", None, &InstallOptions::default(), &NoProgress)
//!     .await?;
//! outcome.instance.activate()?;
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod error;
pub mod http;
pub mod installer;
pub mod progress;
pub mod registry;
pub mod validation;

pub use bundle::{ArchiveMember, BundleOrigin, ResolvedBundle};
pub use error::{Result, StoreError};
pub use http::{FetchResponse, Fetcher, ReqwestFetcher};
pub use installer::{InstallOptions, InstallOutcome, Installer};
pub use progress::{NoProgress, ProgressSink};
pub use registry::{RegistryClient, RegistryConfig, RegistryMode, RepositoryConfig};
pub use validation::{
    FlagRule, FlaggedPermission, ValidationError, ValidationReport, Validator, ValidatorConfig,
};
