//! Source rewriting for the implicit-assignment fallback.
//!
//! Declarative `export` forms are turned into plain local declarations and
//! the result is wrapped in a function body that hands the well-known
//! lifecycle symbols back to the host.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Local binding that receives an `export default` value.
pub(crate) const DEFAULT_BINDING: &str = "__hatch_default__";

const EXPORTS_BINDING: &str = "__hatch_exports__";

/// Symbols copied out of the wrapped body, in order.
const HARVESTED: [&str; 3] = ["activate", "deactivate", "metadata"];

/// An `export` keyword at the start of a line or right after a statement
/// boundary. Group 1 is everything before the keyword.
const EXPORT_START: &str = r"(?m)(^[ \t]*|[;{}][ \t]*)export";

static DEFAULT_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{EXPORT_START}[ \t]+default[ \t]+"))
        .expect("valid default export pattern")
});

static DECLARATION_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"{EXPORT_START}[ \t]+((?:async[ \t]+)?function\b|const\b|let\b|var\b|class\b)"
    ))
    .expect("valid declaration export pattern")
});

/// Group 3 is set for re-exports, which are left alone.
static EXPORT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"{EXPORT_START}[ \t]*\{{([^}}]*)\}}([ \t]*from\b)?(?:[ \t]*;)?"
    ))
    .expect("valid export list pattern")
});

/// Rewrite `export function`, `export const`, `export default` and
/// `export { .. }` forms into local-scope declarations.
///
/// Exports are recognised at the start of a line or after `;`, `{` or `}`.
/// Re-exports (`export { a } from "b"`) and imports are left untouched and
/// will fail to parse later.
pub(crate) fn strip_exports(source: &str) -> String {
    let source = EXPORT_LIST.replace_all(source, |caps: &Captures| {
        if caps.get(3).is_some() {
            return caps[0].to_string();
        }
        let indent = &caps[1];
        let aliases: Vec<String> = caps[2]
            .split(',')
            .filter_map(|item| {
                let (local, exported) = item.trim().split_once(" as ")?;
                let (local, exported) = (local.trim(), exported.trim());
                if exported == "default" {
                    Some(format!("var {DEFAULT_BINDING} = {local};"))
                } else if exported != local {
                    Some(format!("var {exported} = {local};"))
                } else {
                    None
                }
            })
            .collect();
        format!("{indent}{}", aliases.join(" "))
    });
    let source = DEFAULT_EXPORT.replace_all(&source, format!("${{1}}var {DEFAULT_BINDING} = "));
    let source = DECLARATION_EXPORT.replace_all(&source, "${1}${2}");
    source.into_owned()
}

/// Build a script that evaluates `source` in a fresh function scope and
/// returns the package object.
///
/// The returned object holds whichever of `activate`, `deactivate` and
/// `metadata` the source declared. When no `activate` was declared but the
/// source had an object `export default`, that object is returned instead.
pub(crate) fn wrap_implicit(source: &str) -> String {
    let body = strip_exports(source);

    let mut harvest = format!("var {EXPORTS_BINDING} = {{}};\n");
    for name in HARVESTED {
        harvest.push_str(&format!(
            "if (typeof {name} !== \"undefined\") {{ {EXPORTS_BINDING}.{name} = {name}; }}\n"
        ));
    }
    harvest.push_str(&format!(
        "if (typeof {EXPORTS_BINDING}.activate === \"undefined\" \
         && typeof {DEFAULT_BINDING} === \"object\" && {DEFAULT_BINDING} !== null) \
         {{ return {DEFAULT_BINDING}; }}\n\
         return {EXPORTS_BINDING};\n"
    ));

    format!("(function () {{\n{body}\n;\n{harvest}}})();\n")
}
