//! The two module-loading strategies, tried in a fixed order.
//!
//! Each strategy either yields the package object with its lifecycle
//! functions or a typed [`AttemptFailure`] saying why it did not.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use boa_engine::builtins::promise::PromiseState;
use boa_engine::object::builtins::JsPromise;
use boa_engine::{
    Context, JsError, JsObject, JsString, JsValue, Module, Script, Source, js_string,
};
use tracing::warn;

use crate::error::LoadError;
use crate::rewrite;

/// Which dialect produced a package instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Standard module with `export` statements.
    Declarative,
    /// Plain statements whose top-level declarations are harvested by name.
    Implicit,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Declarative => f.write_str("declarative"),
            Strategy::Implicit => f.write_str("implicit"),
        }
    }
}

/// Why a single strategy did not produce a package object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptFailure {
    #[error("source could not be parsed: {0}")]
    Parse(String),

    #[error("{0}")]
    Threw(String),

    #[error("no activation function")]
    NoActivation,
}

impl From<AttemptFailure> for LoadError {
    fn from(failure: AttemptFailure) -> Self {
        match failure {
            AttemptFailure::Parse(message) => LoadError::UnsupportedEncoding(message),
            AttemptFailure::Threw(message) => LoadError::Threw(message),
            AttemptFailure::NoActivation => LoadError::NoActivation,
        }
    }
}

/// Package object and the lifecycle members read from it.
pub(crate) struct Loaded {
    pub(crate) package: JsObject,
    pub(crate) activate: JsObject,
    pub(crate) deactivate: Option<JsObject>,
    pub(crate) metadata: Option<serde_json::Value>,
}

/// Evaluate `source` as a standard module.
///
/// The default export is the package object when present, otherwise the
/// module namespace is.
pub(crate) fn load_declarative(
    source: &str,
    context: &mut Context,
) -> Result<Loaded, AttemptFailure> {
    let module = Module::parse(Source::from_bytes(source), None, context)
        .map_err(|e| AttemptFailure::Parse(describe(&e, context)))?;

    // Unresolvable imports surface while loading or linking. Either way the
    // source is not a self-contained module.
    let loading = module.load(context);
    let _ = context.run_jobs();
    settle(loading, context).map_err(AttemptFailure::Parse)?;
    module
        .link(context)
        .map_err(|e| AttemptFailure::Parse(describe(&e, context)))?;

    let evaluation = module.evaluate(context);
    let _ = context.run_jobs();
    settle(evaluation, context).map_err(AttemptFailure::Threw)?;

    let namespace = module.namespace(context);
    let default = namespace
        .get(js_string!("default"), context)
        .map_err(|e| AttemptFailure::Threw(describe(&e, context)))?;

    let package = match default.as_object() {
        Some(object) => object.clone(),
        None => namespace,
    };

    harvest(package, context)
}

/// Outcome of a promise once the job queue has drained.
fn settle(promise: JsPromise, context: &mut Context) -> Result<(), String> {
    match promise.state() {
        PromiseState::Fulfilled(_) => Ok(()),
        PromiseState::Rejected(reason) => Err(describe(&JsError::from_opaque(reason), context)),
        PromiseState::Pending => Err("module evaluation did not settle".to_string()),
    }
}

/// Rewrite export forms away and evaluate `source` inside a function body.
pub(crate) fn load_implicit(source: &str, context: &mut Context) -> Result<Loaded, AttemptFailure> {
    let wrapped = rewrite::wrap_implicit(source);

    let script = Script::parse(Source::from_bytes(&wrapped), None, context)
        .map_err(|e| AttemptFailure::Parse(describe(&e, context)))?;
    let value = script
        .evaluate(context)
        .map_err(|e| AttemptFailure::Threw(describe(&e, context)))?;
    let _ = context.run_jobs();

    let package = value
        .as_object()
        .cloned()
        .ok_or(AttemptFailure::NoActivation)?;

    harvest(package, context)
}

fn harvest(package: JsObject, context: &mut Context) -> Result<Loaded, AttemptFailure> {
    let activate = read_member(&package, "activate", context)?
        .and_then(|value| callable(&value))
        .ok_or(AttemptFailure::NoActivation)?;

    let deactivate = match read_member(&package, "deactivate", context)? {
        Some(value) => {
            let function = callable(&value);
            if function.is_none() {
                warn!("Ignoring non-callable deactivate member");
            }
            function
        }
        None => None,
    };

    let metadata = match read_member(&package, "metadata", context)? {
        Some(value) => match value.to_json(context) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("Package metadata is not representable as JSON: {}", e);
                None
            }
        },
        None => None,
    };

    Ok(Loaded {
        package,
        activate,
        deactivate,
        metadata,
    })
}

/// Read a property, treating `undefined` and `null` as absent.
fn read_member(
    object: &JsObject,
    name: &str,
    context: &mut Context,
) -> Result<Option<JsValue>, AttemptFailure> {
    let value = object
        .get(JsString::from(name), context)
        .map_err(|e| AttemptFailure::Threw(describe(&e, context)))?;

    if value.is_null_or_undefined() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

fn callable(value: &JsValue) -> Option<JsObject> {
    value
        .as_object()
        .filter(|object| object.is_callable())
        .cloned()
}

/// Run engine work, turning an engine panic into an error message.
///
/// The engine panics instead of throwing when package code exhausts a
/// runtime limit inside a promise job, which includes module evaluation.
pub(crate) fn contain<T>(work: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(work)).map_err(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown engine failure".to_string());
        warn!(%reason, "Script engine aborted package code");
        format!("package code aborted by the engine: {reason}")
    })
}

/// Human-readable message for a thrown value, e.g. `Error: boom`.
pub(crate) fn describe(error: &JsError, context: &mut Context) -> String {
    match error.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => error.to_string(),
    }
}
