//! Host functions exposed to package code.

use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{Context, JsResult, JsValue, NativeFunction, js_string};
use tracing::{Level, event};

/// Install a `console` global whose methods forward to host tracing.
pub(crate) fn register_console(context: &mut Context) -> JsResult<()> {
    let console = ObjectInitializer::new(context)
        .function(NativeFunction::from_fn_ptr(console_log), js_string!("log"), 0)
        .function(NativeFunction::from_fn_ptr(console_info), js_string!("info"), 0)
        .function(NativeFunction::from_fn_ptr(console_debug), js_string!("debug"), 0)
        .function(NativeFunction::from_fn_ptr(console_warn), js_string!("warn"), 0)
        .function(NativeFunction::from_fn_ptr(console_error), js_string!("error"), 0)
        .build();

    context.register_global_property(
        js_string!("console"),
        console,
        Attribute::WRITABLE | Attribute::CONFIGURABLE,
    )
}

macro_rules! console_method {
    ($name:ident, $level:expr) => {
        fn $name(_this: &JsValue, args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
            event!(
                target: "hatch_package",
                $level,
                message = %join_args(args),
            );
            Ok(JsValue::undefined())
        }
    };
}

console_method!(console_log, Level::INFO);
console_method!(console_info, Level::INFO);
console_method!(console_debug, Level::DEBUG);
console_method!(console_warn, Level::WARN);
console_method!(console_error, Level::ERROR);

fn join_args(args: &[JsValue]) -> String {
    args.iter()
        .map(|arg| match arg.as_string() {
            Some(text) => text.to_std_string_escaped(),
            None => arg.display().to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
