//! Module loader for hatch packages.
//!
//! Turns package source text plus its manifest into a [`PackageInstance`].
//! Published packages use one of two module dialects, so loading is tried
//! twice in a fixed order:
//!
//! 1. [`Strategy::Declarative`]: evaluate the source as a standard module
//!    and read `activate` from its default export or its namespace.
//! 2. [`Strategy::Implicit`]: rewrite export forms into local declarations,
//!    run the result in a fresh function scope and harvest `activate`,
//!    `deactivate` and `metadata` by name.
//!
//! A failure of the first attempt only switches strategy; a failure of the
//! second is returned to the caller as a [`LoadError`].

pub mod error;
mod host;
pub mod instance;
mod rewrite;
pub mod strategy;

use boa_engine::Context;
use hatch_types::PackageManifest;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn};

pub use crate::error::{ActivationError, LoadError, Result};
pub use crate::instance::{Lifecycle, PackageInstance};
pub use crate::strategy::{AttemptFailure, Strategy};

use crate::instance::ScriptPackage;

/// The single entry point through which package code becomes executable.
pub trait Instantiate: Send + Sync {
    fn instantiate(&self, source: &str, manifest: &PackageManifest) -> Result<PackageInstance>;
}

/// Execution limits applied to package code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Maximum call depth before package code is aborted.
    pub recursion_limit: usize,
    /// Maximum iterations of any single loop before package code is aborted.
    pub loop_iteration_limit: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 512,
            loop_iteration_limit: u64::MAX,
        }
    }
}

/// [`Instantiate`] implementation backed by an embedded JavaScript engine.
///
/// Every attempt gets its own engine context with a `console` bound to host
/// tracing.
#[derive(Debug, Clone, Default)]
pub struct ScriptEngine {
    config: LoaderConfig,
}

impl ScriptEngine {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load `source` as a standard module.
    pub fn try_declarative(
        &self,
        source: &str,
        manifest: &PackageManifest,
    ) -> std::result::Result<PackageInstance, AttemptFailure> {
        self.attempt(Strategy::Declarative, source, manifest)
    }

    /// Load `source` through the implicit-assignment rewrite.
    pub fn try_implicit(
        &self,
        source: &str,
        manifest: &PackageManifest,
    ) -> std::result::Result<PackageInstance, AttemptFailure> {
        self.attempt(Strategy::Implicit, source, manifest)
    }

    fn attempt(
        &self,
        kind: Strategy,
        source: &str,
        manifest: &PackageManifest,
    ) -> std::result::Result<PackageInstance, AttemptFailure> {
        let mut context = self.new_context()?;
        let loaded = strategy::contain(|| match kind {
            Strategy::Declarative => strategy::load_declarative(source, &mut context),
            Strategy::Implicit => strategy::load_implicit(source, &mut context),
        })
        .map_err(AttemptFailure::Threw)??;

        let lifecycle = ScriptPackage {
            context,
            package: loaded.package,
            activate: loaded.activate,
            deactivate: loaded.deactivate,
        };

        Ok(PackageInstance::new(
            manifest.clone(),
            kind,
            loaded.metadata,
            Box::new(lifecycle),
        ))
    }

    fn new_context(&self) -> std::result::Result<Context, AttemptFailure> {
        let mut context = Context::default();

        let limits = context.runtime_limits_mut();
        limits.set_recursion_limit(self.config.recursion_limit);
        limits.set_loop_iteration_limit(self.config.loop_iteration_limit);

        host::register_console(&mut context).map_err(|e| AttemptFailure::Threw(e.to_string()))?;
        Ok(context)
    }
}

impl Instantiate for ScriptEngine {
    fn instantiate(&self, source: &str, manifest: &PackageManifest) -> Result<PackageInstance> {
        let _span = info_span!("package", id = %manifest.id).entered();

        let first = match self.try_declarative(source, manifest) {
            Ok(instance) => return Ok(instance),
            Err(failure) => failure,
        };
        debug!(failure = %first, "Declarative load failed, falling back to implicit assignment");

        self.try_implicit(source, manifest).map_err(|second| {
            warn!(failure = %second, "Implicit load failed");
            match (first, second) {
                // A module that ran and threw keeps its own error.
                (AttemptFailure::Threw(message), AttemptFailure::Parse(_)) => {
                    LoadError::Threw(message)
                }
                (_, second) => LoadError::from(second),
            }
        })
    }
}
