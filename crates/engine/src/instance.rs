use std::fmt;

use boa_engine::builtins::promise::PromiseState;
use boa_engine::object::builtins::JsPromise;
use boa_engine::{Context, JsError, JsObject, JsValue};
use hatch_types::PackageManifest;
use tracing::{info_span, warn};

use crate::error::ActivationError;
use crate::strategy::{Strategy, contain, describe};

/// Invocation points of a loaded package.
///
/// This is the seam between the installer and whatever executes package
/// code; a stronger isolation primitive only has to implement this.
pub trait Lifecycle {
    fn activate(&mut self) -> Result<(), ActivationError>;

    fn deactivate(&mut self) -> Result<(), ActivationError>;
}

/// A live package: its manifest plus bound lifecycle routines.
///
/// Not persisted. Rebuild it from the stored record whenever the host needs
/// a live instance again.
pub struct PackageInstance {
    manifest: PackageManifest,
    strategy: Strategy,
    metadata: Option<serde_json::Value>,
    lifecycle: Box<dyn Lifecycle>,
}

impl PackageInstance {
    pub fn new(
        manifest: PackageManifest,
        strategy: Strategy,
        metadata: Option<serde_json::Value>,
        lifecycle: Box<dyn Lifecycle>,
    ) -> Self {
        Self {
            manifest,
            strategy,
            metadata,
            lifecycle,
        }
    }

    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    /// The loading strategy that produced this instance.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// `metadata` declared by the package, if it had any.
    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    pub fn activate(&mut self) -> Result<(), ActivationError> {
        let _span = info_span!("package", id = %self.manifest.id).entered();
        self.lifecycle.activate()
    }

    pub fn deactivate(&mut self) -> Result<(), ActivationError> {
        let _span = info_span!("package", id = %self.manifest.id).entered();
        self.lifecycle.deactivate()
    }
}

impl fmt::Debug for PackageInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageInstance")
            .field("id", &self.manifest.id)
            .field("version", &self.manifest.version)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Lifecycle backed by an embedded script context.
///
/// Owns the context the package was evaluated in, so anything the lifecycle
/// functions close over stays alive between calls. Both functions are called
/// with the package object as `this`.
pub(crate) struct ScriptPackage {
    pub(crate) context: Context,
    pub(crate) package: JsObject,
    pub(crate) activate: JsObject,
    pub(crate) deactivate: Option<JsObject>,
}

impl ScriptPackage {
    fn invoke(&mut self, hook: &'static str, function: JsObject) -> Result<(), ActivationError> {
        contain(|| self.call(hook, function))
            .unwrap_or_else(|message| Err(ActivationError::Threw { hook, message }))
    }

    fn call(&mut self, hook: &'static str, function: JsObject) -> Result<(), ActivationError> {
        let this = JsValue::from(self.package.clone());
        let result = match function.call(&this, &[], &mut self.context) {
            Ok(result) => result,
            Err(e) => {
                return Err(ActivationError::Threw {
                    hook,
                    message: describe(&e, &mut self.context),
                });
            }
        };

        let Some(promise) = result
            .as_object()
            .and_then(|object| JsPromise::from_object(object.clone()).ok())
        else {
            return Ok(());
        };

        let _ = self.context.run_jobs();
        match promise.state() {
            PromiseState::Fulfilled(_) => Ok(()),
            PromiseState::Rejected(reason) => Err(ActivationError::Rejected {
                hook,
                message: describe(&JsError::from_opaque(reason), &mut self.context),
            }),
            PromiseState::Pending => {
                warn!(hook, "Lifecycle promise still pending after draining jobs");
                Ok(())
            }
        }
    }
}

impl Lifecycle for ScriptPackage {
    fn activate(&mut self) -> Result<(), ActivationError> {
        let function = self.activate.clone();
        self.invoke("activate", function)
    }

    fn deactivate(&mut self) -> Result<(), ActivationError> {
        match self.deactivate.clone() {
            Some(function) => self.invoke("deactivate", function),
            None => Ok(()),
        }
    }
}
