// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Directive removal for schema export

use serde_json::{Map, Value};

use super::directive::Directive;

/// Remove interpretation directives so the result is plain JSON-Schema.
///
/// Built-in extension directives (`!parsing`, `!varname`, `!calculate`) are
/// always removed, together with any key listed in `extra`.
pub fn strip_directives(schema: &Value, extra: &[&str]) -> Value {
    match schema {
        Value::Object(object) => {
            let mut stripped = Map::with_capacity(object.len());
            for (key, value) in object {
                let is_extension = Directive::from_key(key).is_some_and(Directive::is_extension);
                if is_extension || extra.contains(&key.as_str()) {
                    continue;
                }
                stripped.insert(key.clone(), strip_directives(value, extra));
            }
            Value::Object(stripped)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| strip_directives(v, extra)).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_strip_nested_directives() {
        let schema = json!({
            "properties": {
                "archive": {
                    "patternProperties": {
                        "^station_": {
                            "!varname": "station",
                            "properties": {
                                "info": {"!parsing": {"keys": ["a"]}, "$ref": "#/$defs/S"},
                                "ratio": {"type": "number", "!calculate": {"expression": "{a}", "variables": {}}},
                                "tagged": {"!units": "m", "type": "string"}
                            }
                        }
                    }
                }
            },
            "$defs": {"S": {"type": "object"}}
        });

        assert_eq!(
            strip_directives(&schema, &["!units"]),
            json!({
                "properties": {
                    "archive": {
                        "patternProperties": {
                            "^station_": {
                                "properties": {
                                    "info": {"$ref": "#/$defs/S"},
                                    "ratio": {"type": "number"},
                                    "tagged": {"type": "string"}
                                }
                            }
                        }
                    }
                },
                "$defs": {"S": {"type": "object"}}
            })
        );
    }
}
