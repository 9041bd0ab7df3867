//! Flow handler: turns raw driver arguments into handler arguments.
//!
//! The raw argument contract is positional: the initiating actor first, the
//! payload second. A handler with no parameter specs receives the raw
//! arguments untouched. With specs, each parameter is extracted by kind;
//! positions the driver did not supply resolve to `Value::Null`.

use crate::error::Error;
use crate::guard::ExecutionContext;
use crate::metadata::{HandlerSpec, ParamKind, ParamSpec};
use serde_json::Value;

/// Whether a payload value supports keyed access. Arrays count: keyed access
/// into one simply misses, which keeps the behavior uniform for drivers that
/// deliver array payloads.
fn object_like(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

fn keyed(value: &Value, key: &str) -> Value {
    value.get(key).cloned().unwrap_or(Value::Null)
}

/// Resolve the argument list for one dispatch.
pub fn create_args(context: &ExecutionContext, spec: &HandlerSpec) -> Result<Vec<Value>, Error> {
    if spec.params.is_empty() {
        return Ok(context.args.clone());
    }

    // Arguments land at their declared signature position; indexes without a
    // spec stay null so later parameters keep their alignment.
    let len = spec
        .params
        .iter()
        .map(|param| param.index + 1)
        .max()
        .unwrap_or(0);
    let mut args = vec![Value::Null; len];
    for param in &spec.params {
        args[param.index] = resolve_param(context, param)?;
    }
    Ok(args)
}

fn resolve_param(context: &ExecutionContext, param: &ParamSpec) -> Result<Value, Error> {
    let value = match &param.kind {
        ParamKind::Player => {
            let player = context.args.first().cloned().unwrap_or(Value::Null);
            match &param.key {
                Some(key) => keyed(&player, key),
                None => player,
            }
        }
        ParamKind::Payload => {
            let payload = context.args.get(1).cloned().unwrap_or(Value::Null);
            if object_like(&payload) {
                match &param.key {
                    Some(key) => keyed(&payload, key),
                    None => payload,
                }
            } else {
                // Primitive payloads arrive flattened; hand back the tail.
                Value::Array(context.args.iter().skip(1).cloned().collect())
            }
        }
        ParamKind::Param => {
            let payload = context.args.get(1).cloned().unwrap_or(Value::Null);
            if object_like(&payload) {
                match &param.key {
                    Some(key) => keyed(&payload, key),
                    None => payload,
                }
            } else {
                // Positional fallback for flattened argument lists.
                context.args.get(param.index).cloned().unwrap_or(Value::Null)
            }
        }
        ParamKind::Custom(tag) => {
            return Err(Error::UnknownParamKind((*tag).to_string()));
        }
    };
    Ok(value)
}
