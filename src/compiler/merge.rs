//! Deep merge of compiled values

use serde_json::{Map, Value};

use super::error::{CompileError, CompileResult};
use crate::schema::value_type;

/// Merge `incoming` into `existing`
///
/// Objects are merged key by key and arrays are concatenated. Two scalars of
/// the same kind collapse to one value when equal and become a two-element
/// array otherwise. Any other pairing is a conflict.
pub fn merge_values(existing: &mut Value, incoming: Value) -> CompileResult<()> {
    match (existing, incoming) {
        (Value::Object(target), incoming @ Value::Object(_)) => merge_into_object(target, incoming),
        (Value::Array(target), Value::Array(source)) => {
            target.extend(source);
            Ok(())
        }
        (slot, value) if same_scalar_kind(slot, &value) => {
            if *slot != value {
                let previous = slot.take();
                *slot = Value::Array(vec![previous, value]);
            }
            Ok(())
        }
        (slot, value) => Err(CompileError::MergeConflict {
            existing: value_type(slot),
            incoming: value_type(&value),
        }),
    }
}

/// Merge an object-valued result into an object accumulator
pub fn merge_into_object(target: &mut Map<String, Value>, incoming: Value) -> CompileResult<()> {
    let source = match incoming {
        Value::Object(source) => source,
        other => {
            return Err(CompileError::MergeConflict {
                existing: "object",
                incoming: value_type(&other),
            });
        }
    };
    for (key, value) in source {
        match target.get_mut(&key) {
            Some(slot) => merge_values(slot, value)?,
            None => {
                target.insert(key, value);
            }
        }
    }
    Ok(())
}

fn same_scalar_kind(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Null, Value::Null)
            | (Value::Bool(_), Value::Bool(_))
            | (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
    )
}
