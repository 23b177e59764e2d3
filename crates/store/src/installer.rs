//! Install orchestration.
//!
//! Each invocation walks `resolving → validating → loading → complete`, or
//! ends in `failed` from any state. Invalid bundles are never persisted. A
//! validated bundle is persisted before it is loaded, so a package that
//! fails to load stays installed and can be retried or removed.

use std::sync::Arc;

use hatch_engine::{Instantiate, PackageInstance};
use hatch_storage::PackageStore;
use hatch_types::{InstallStatus, InstalledPackageRecord};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bundle::ResolvedBundle;
use crate::error::{Result, StoreError};
use crate::progress::{ProgressReporter, ProgressSink};
use crate::registry::RegistryClient;
use crate::validation::{FlaggedPermission, ValidationError, Validator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    /// Always resolve from the registry, even if a record exists.
    pub refresh: bool,
    /// Accept packages that request flagged permissions.
    pub allow_flagged: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            refresh: false,
            allow_flagged: true,
        }
    }
}

/// Result of a successful install.
#[derive(Debug)]
pub struct InstallOutcome {
    pub instance: PackageInstance,
    pub record: InstalledPackageRecord,
    pub flagged: Vec<FlaggedPermission>,
    /// `true` when the stored record was loaded instead of fetching.
    pub from_cache: bool,
}

pub struct Installer {
    registry: RegistryClient,
    validator: Validator,
    store: Arc<dyn PackageStore>,
    loader: Arc<dyn Instantiate>,
}

impl Installer {
    pub fn new(
        registry: RegistryClient,
        validator: Validator,
        store: Arc<dyn PackageStore>,
        loader: Arc<dyn Instantiate>,
    ) -> Self {
        Self {
            registry,
            validator,
            store,
            loader,
        }
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// Install `id`, reusing the stored record when one matches.
    ///
    /// The stored record is reused unless `options.refresh` is set or
    /// `version` names a different version than the stored one.
    pub async fn install(
        &self,
        id: &str,
        version: Option<&Version>,
        options: &InstallOptions,
        progress: &dyn ProgressSink,
    ) -> Result<InstallOutcome> {
        let mut reporter = ProgressReporter::new(id, progress);
        let result = self.run_install(id, version, options, &mut reporter).await;
        report_outcome(result, &mut reporter)
    }

    /// Install straight from a repository URL. Never reuses a stored record.
    ///
    /// Progress is reported under the URL until the manifest is fetched and
    /// under the package id from then on.
    pub async fn install_from_repository(
        &self,
        url: &str,
        options: &InstallOptions,
        progress: &dyn ProgressSink,
    ) -> Result<InstallOutcome> {
        let mut reporter = ProgressReporter::new(url, progress);
        reporter.update(InstallStatus::Resolving, format!("Resolving {url}"));

        let result = match self.registry.resolve_repository(url).await {
            Ok(bundle) => {
                reporter.set_id(bundle.requested_id.clone());
                self.persist_and_load(bundle, options, &mut reporter).await
            }
            Err(e) => Err(e),
        };
        report_outcome(result, &mut reporter)
    }

    /// Rebuild a live instance from the stored record.
    pub async fn load_installed(&self, id: &str) -> Result<PackageInstance> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::not_found(id))?;

        Ok(self.loader.instantiate(&record.code, &record.manifest)?)
    }

    /// Remove a package's record. Returns whether one existed.
    pub async fn uninstall(&self, id: &str) -> Result<bool> {
        let removed = self.store.delete(id).await?;
        if removed {
            info!(id, "Uninstalled package");
        }
        Ok(removed)
    }

    pub async fn list_installed(&self) -> Result<Vec<InstalledPackageRecord>> {
        Ok(self.store.get_all().await?)
    }

    pub async fn get_installed(&self, id: &str) -> Result<Option<InstalledPackageRecord>> {
        Ok(self.store.get(id).await?)
    }

    /// Returns whether a record existed.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool> {
        Ok(self.store.set_enabled(id, enabled).await?)
    }

    async fn run_install(
        &self,
        id: &str,
        version: Option<&Version>,
        options: &InstallOptions,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<InstallOutcome> {
        reporter.update(InstallStatus::Resolving, format!("Resolving {id}"));

        if !options.refresh {
            if let Some(record) = self.store.get(id).await? {
                if version.is_none_or(|v| record.version == v.to_string()) {
                    info!(id, version = %record.version, "Loading installed package");
                    return self.load_stored(record, options, reporter);
                }
                info!(id, installed = %record.version, "Installed version differs, resolving");
            }
        }

        let bundle = self.registry.resolve(id, version).await?;
        self.persist_and_load(bundle, options, reporter).await
    }

    fn load_stored(
        &self,
        record: InstalledPackageRecord,
        options: &InstallOptions,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<InstallOutcome> {
        let flagged = self.validator.flag_permissions(&record.manifest.permissions);
        check_flagged(&flagged, options)?;

        reporter.update(InstallStatus::Loading, "Loading installed package");
        let instance = self.loader.instantiate(&record.code, &record.manifest)?;

        Ok(InstallOutcome {
            instance,
            record,
            flagged,
            from_cache: true,
        })
    }

    async fn persist_and_load(
        &self,
        bundle: ResolvedBundle,
        options: &InstallOptions,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<InstallOutcome> {
        reporter.update(InstallStatus::Validating, "Validating package");
        let report = self.validator.validate(&bundle)?;
        check_flagged(&report.flagged, options)?;

        let record = InstalledPackageRecord::new(report.manifest, bundle.source);
        self.store.put(&record).await?;
        info!(id = %record.id, version = %record.version, "Stored package record");

        reporter.update(InstallStatus::Loading, "Loading package");
        let instance = self.loader.instantiate(&record.code, &record.manifest)?;

        Ok(InstallOutcome {
            instance,
            record,
            flagged: report.flagged,
            from_cache: false,
        })
    }
}

fn report_outcome(
    result: Result<InstallOutcome>,
    reporter: &mut ProgressReporter<'_>,
) -> Result<InstallOutcome> {
    match &result {
        Ok(outcome) => {
            info!(
                id = %outcome.record.id,
                strategy = %outcome.instance.strategy(),
                "Install complete"
            );
            reporter.update(InstallStatus::Complete, "Installed");
        }
        Err(e) => {
            warn!("Install failed: {}", e);
            reporter.fail(e);
        }
    }
    result
}

fn check_flagged(flagged: &[FlaggedPermission], options: &InstallOptions) -> Result<()> {
    if flagged.is_empty() || options.allow_flagged {
        return Ok(());
    }
    Err(ValidationError::FlaggedPermissions(flagged.to_vec()).into())
}
