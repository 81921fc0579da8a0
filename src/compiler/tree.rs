//! Placement and unpacking of values inside the compiled tree

use serde_json::{Map, Value};

use super::error::{CompileError, CompileResult};
use super::merge::merge_values;
use crate::schema::Unpack;

/// One step taken while unpacking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackStep {
    /// Descended into an object key
    Key(String),
    /// Descended into the only element of an array
    Item,
}

/// Place `value` under `parts`, creating intermediate objects
///
/// A value already present at the final position is merged with the new one.
pub fn insert_at_path(tree: &mut Map<String, Value>, value: Value, parts: &[String]) -> CompileResult<()> {
    let Some((last, parents)) = parts.split_last() else {
        return Err(CompileError::PathConflict { path: Vec::new() });
    };

    let mut node = tree;
    for (depth, part) in parents.iter().enumerate() {
        let slot = node
            .entry(part.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        node = slot.as_object_mut().ok_or_else(|| CompileError::PathConflict {
            path: parts[..=depth].to_vec(),
        })?;
    }

    match node.get_mut(last) {
        Some(existing) => merge_values(existing, value),
        None => {
            node.insert(last.clone(), value);
            Ok(())
        }
    }
}

/// Descend through single-child containers
///
/// Returns the reached value and the steps taken. Scalars end the descent
/// early; a container with more than one child is an error.
pub fn unpack(value: Value, depth: Unpack) -> CompileResult<(Value, Vec<UnpackStep>)> {
    let limit = match depth {
        Unpack::Depth(levels) => Some(levels),
        Unpack::Full => None,
    };

    let mut current = value;
    let mut steps = Vec::new();
    while limit.is_none_or(|levels| steps.len() < levels) {
        let level = steps.len() + 1;
        current = match current {
            Value::Object(map) => {
                let found = map.len();
                match (map.into_iter().next(), found) {
                    (Some((key, inner)), 1) => {
                        steps.push(UnpackStep::Key(key));
                        inner
                    }
                    _ => return Err(CompileError::AmbiguousUnpack { level, found }),
                }
            }
            Value::Array(items) => {
                let found = items.len();
                match (items.into_iter().next(), found) {
                    (Some(inner), 1) => {
                        steps.push(UnpackStep::Item);
                        inner
                    }
                    _ => return Err(CompileError::AmbiguousUnpack { level, found }),
                }
            }
            scalar => return Ok((scalar, steps)),
        };
    }
    Ok((current, steps))
}
