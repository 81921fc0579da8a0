//! Schema annotation of compiled leaves
//!
//! When annotation is requested every scalar leaf `v` becomes
//! `{"value": v, "description": ..., "type": ...}` with the two optional
//! fields copied from the schema node describing that leaf.

use serde_json::{Map, Value};

use super::context::CompileOptions;
use super::tree::UnpackStep;
use crate::pattern::segment_regex;

/// Follow a local `#/...` reference if the node is one
pub fn resolve<'s>(node: &'s Value, root: &'s Value) -> &'s Value {
    let mut current = node;
    // Bounded to break reference cycles
    for _ in 0..32 {
        match current.get("$ref").and_then(Value::as_str) {
            Some(reference) if reference.starts_with("#/") => match root.pointer(&reference[1..]) {
                Some(target) => current = target,
                None => break,
            },
            _ => break,
        }
    }
    current
}

/// Schema node describing `key` below `node`
pub fn lookup<'s>(node: &'s Value, key: &str, root: &'s Value) -> Option<&'s Value> {
    let node = resolve(node, root);

    if let Some(found) = node.get("properties").and_then(|p| p.get(key)) {
        return Some(resolve(found, root));
    }

    if let Some(patterns) = node.get("patternProperties").and_then(Value::as_object) {
        if let Some(found) = patterns.get(key) {
            return Some(resolve(found, root));
        }
        let matched = patterns.iter().find(|(pattern, _)| {
            segment_regex(&format!("(?:{pattern})$")).is_ok_and(|regex| regex.is_match(key))
        });
        if let Some((_, found)) = matched {
            return Some(resolve(found, root));
        }
    }

    match node.get("additionalProperties") {
        Some(found @ Value::Object(_)) => Some(resolve(found, root)),
        _ => None,
    }
}

/// Schema node reached by following unpack steps
pub fn descend<'s>(node: &'s Value, steps: &[UnpackStep], root: &'s Value) -> Option<&'s Value> {
    let mut current = node;
    for step in steps {
        current = match step {
            UnpackStep::Key(key) => lookup(current, key, root)?,
            UnpackStep::Item => resolve(resolve(current, root).get("items")?, root),
        };
    }
    Some(current)
}

/// Schema node at a key path from the root of a schema
pub fn lookup_path<'s>(root: &'s Value, path: &[String]) -> Option<&'s Value> {
    let mut current = root;
    for key in path {
        current = lookup(current, key, root)?;
    }
    Some(current)
}

/// Annotate every scalar leaf of `value` described by `node`
pub fn annotate(value: Value, node: Option<&Value>, root: &Value, options: &CompileOptions) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| {
                    let child_node = node.and_then(|n| lookup(n, &key, root));
                    let annotated = annotate(child, child_node, root, options);
                    (key, annotated)
                })
                .collect(),
        ),
        Value::Array(items) => {
            let item_node = node.and_then(|n| resolve(n, root).get("items")).map(|n| resolve(n, root));
            Value::Array(
                items
                    .into_iter()
                    .map(|item| annotate(item, item_node, root, options))
                    .collect(),
            )
        }
        scalar => annotate_leaf(scalar, node, options),
    }
}

fn annotate_leaf(value: Value, node: Option<&Value>, options: &CompileOptions) -> Value {
    let mut leaf = Map::new();
    leaf.insert("value".to_string(), value);
    if let Some(node) = node {
        if options.add_description {
            if let Some(description) = node.get("description") {
                leaf.insert("description".to_string(), description.clone());
            }
        }
        if options.add_type {
            if let Some(kind) = node.get("type") {
                leaf.insert("type".to_string(), kind.clone());
            }
        }
    }
    Value::Object(leaf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn options() -> CompileOptions {
        CompileOptions {
            add_description: true,
            add_type: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_annotate_parser_value() {
        let root = json!({
            "$defs": {
                "time_parser": {
                    "type": "object",
                    "properties": {
                        "real": {"type": "string", "description": "wall clock"},
                        "user": {"$ref": "#/$defs/seconds"}
                    }
                },
                "seconds": {"type": "number", "description": "cpu seconds"}
            }
        });
        let node = root.pointer("/$defs/time_parser");
        let annotated = annotate(json!({"real": "1.2", "user": 0.3, "sys": 0.1}), node, &root, &options());
        assert_eq!(
            annotated,
            json!({
                "real": {"value": "1.2", "description": "wall clock", "type": "string"},
                "user": {"value": 0.3, "description": "cpu seconds", "type": "number"},
                "sys": {"value": 0.1}
            })
        );
    }

    #[test]
    fn test_lookup_pattern_properties() {
        let root = json!({
            "properties": {
                "run": {"patternProperties": {"^run_\\d+": {"description": "one run"}}}
            }
        });
        let run = lookup_path(&root, &["run".to_string()]).unwrap();
        assert_eq!(lookup(run, "run_3", &root), Some(&json!({"description": "one run"})));
        assert_eq!(lookup(run, "^run_\\d+", &root), Some(&json!({"description": "one run"})));
        assert_eq!(lookup(run, "walltime", &root), None);
    }

    #[test]
    fn test_only_requested_fields() {
        let node = json!({"type": "number", "description": "ratio"});
        let options = CompileOptions {
            add_type: true,
            ..Default::default()
        };
        assert_eq!(
            annotate(json!(5.0), Some(&node), &node, &options),
            json!({"value": 5.0, "type": "number"})
        );
    }
}
