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

//! Schema interpreter
//!
//! Walks an annotated schema and produces the [`SchemaEntry`] tree consumed
//! by the metadata compiler. Each object is processed in two passes: first the
//! directives that only change the context of the current entry
//! (`patternProperties`, `!parsing`, `!varname` and registered rules), then
//! everything else. Branches created in the second pass therefore inherit the
//! complete context of their parent regardless of key order.

use log::{debug, log_enabled, Level};
use serde_json::{Map, Value};

use super::directive::{Directive, CALCULATE_KEY, PARSER_ID_KEY, SCHEMA_ARRAY_KEYWORDS};
use super::entry::{CalculateDirective, EntryNode, ParserReference, ParsingDirective, SchemaEntry};
use super::error::{SchemaError, SchemaResult};
use super::value_type;
use crate::expression::Expression;
use crate::pattern::Varname;
use crate::registry::{DirectiveRegistry, InterpretationScope};

/// Turns an annotated schema into an entry tree
pub struct SchemaInterpreter<'a> {
    root: &'a Map<String, Value>,
    defs: &'a Map<String, Value>,
    registry: &'a DirectiveRegistry,
}

impl<'a> SchemaInterpreter<'a> {
    /// Check the top-level layout of a schema
    pub fn new(schema: &'a Value, registry: &'a DirectiveRegistry) -> SchemaResult<Self> {
        let root = schema.as_object().ok_or(SchemaError::NotAnObject {
            found: value_type(schema),
        })?;

        match root.get("properties") {
            Some(Value::Object(_)) => {}
            Some(other) => {
                return Err(SchemaError::UnexpectedType {
                    key: "properties".to_string(),
                    expected: "object",
                    found: value_type(other),
                });
            }
            None => return Err(SchemaError::MissingRootKey { key: "properties" }),
        }

        let defs = match root.get("$defs") {
            Some(Value::Object(defs)) => defs,
            Some(other) => {
                return Err(SchemaError::UnexpectedType {
                    key: "$defs".to_string(),
                    expected: "object",
                    found: value_type(other),
                });
            }
            None => return Err(SchemaError::MissingRootKey { key: "$defs" }),
        };

        Ok(Self {
            root,
            defs,
            registry,
        })
    }

    /// Parser schemas declared under `$defs`
    pub fn defs(&self) -> &'a Map<String, Value> {
        self.defs
    }

    /// Build the entry tree
    pub fn generate(&self) -> SchemaResult<SchemaEntry> {
        let mut root = SchemaEntry::root();
        let items: Vec<_> = self.root.iter().filter(|(k, _)| k.as_str() != "$defs").collect();
        self.interpret_items(&items, "", &mut root)?;

        if log_enabled!(Level::Debug) {
            if let Ok(dump) = serde_json::to_string_pretty(&root) {
                debug!("Interpreted schema:\n{dump}");
            }
        }
        Ok(root)
    }

    fn interpret_object(&self, object: &Map<String, Value>, parent_key: &str, entry: &mut SchemaEntry) -> SchemaResult<()> {
        let items: Vec<_> = object.iter().collect();
        self.interpret_items(&items, parent_key, entry)
    }

    fn interpret_items(&self, items: &[(&String, &Value)], parent_key: &str, entry: &mut SchemaEntry) -> SchemaResult<()> {
        for (key, value) in items {
            match Directive::from_key(key) {
                Some(directive) if directive.is_contextual() => {
                    self.apply_context(directive, value, parent_key, entry)?;
                }
                Some(_) => {}
                None => {
                    if let Some(rule) = self.registry.interpretation_rule(key) {
                        let mut scope = InterpretationScope::new(key, parent_key, self.defs, entry);
                        rule.interpret(value, &mut scope)?;
                    }
                }
            }
        }

        for (key, value) in items {
            self.interpret_property(key, value, entry)?;
        }
        Ok(())
    }

    fn apply_context(&self, directive: Directive, value: &Value, parent_key: &str, entry: &mut SchemaEntry) -> SchemaResult<()> {
        match directive {
            Directive::PatternProperties => {
                expect_object(directive.as_str(), value)?;
                entry.context_mut().use_regex = true;
            }
            Directive::Parsing => {
                entry.context_mut().parsing = Some(ParsingDirective::from_value(value)?);
            }
            Directive::Varname => {
                let name = value.as_str().ok_or_else(|| SchemaError::UnexpectedType {
                    key: directive.as_str().to_string(),
                    expected: "string",
                    found: value_type(value),
                })?;
                if !entry.context().use_regex {
                    return Err(SchemaError::VarnameOutsideRegex {
                        name: name.to_string(),
                        key: parent_key.to_string(),
                    });
                }
                entry.context_mut().varname = Some(Varname::new(name, parent_key));
            }
            _ => {}
        }
        Ok(())
    }

    fn interpret_property(&self, key: &str, value: &Value, entry: &mut SchemaEntry) -> SchemaResult<()> {
        match Directive::from_key(key) {
            Some(Directive::Properties | Directive::AdditionalProperties | Directive::UnevaluatedProperties) => {
                // Boolean forms carry no structure
                match value {
                    Value::Object(object) => {
                        let parent_key = entry.key().to_string();
                        self.interpret_object(object, &parent_key, entry)
                    }
                    _ => Ok(()),
                }
            }
            Some(Directive::PatternProperties) => {
                for (pattern, sub_schema) in expect_object(key, value)? {
                    let object = sub_schema.as_object().ok_or_else(|| SchemaError::UnsupportedValue {
                        key: pattern.clone(),
                        found: value_type(sub_schema),
                    })?;
                    let mut child = entry.branch(pattern, true);
                    self.interpret_object(object, pattern, &mut child)?;
                    entry.insert_entry(pattern, child);
                }
                Ok(())
            }
            Some(Directive::Parsing | Directive::Varname) => Ok(()),
            Some(Directive::Reference) => self.interpret_reference(value, entry),
            Some(Directive::Calculate) => self.interpret_calculate(value, entry),
            None if self.registry.interpretation_rule(key).is_some() => Ok(()),
            None => match value {
                Value::Object(object) => {
                    let mut child = entry.branch(key, false);
                    self.interpret_object(object, key, &mut child)?;
                    entry.insert_entry(key, child);
                    Ok(())
                }
                Value::Array(_) if SCHEMA_ARRAY_KEYWORDS.contains(&key) => Ok(()),
                Value::Array(_) => Err(SchemaError::UnsupportedValue {
                    key: key.to_string(),
                    found: "array",
                }),
                _ => Ok(()),
            },
        }
    }

    fn interpret_reference(&self, value: &Value, entry: &mut SchemaEntry) -> SchemaResult<()> {
        let reference = value.as_str().ok_or_else(|| SchemaError::UnexpectedType {
            key: "$ref".to_string(),
            expected: "string",
            found: value_type(value),
        })?;

        let parsed = ParserReference::parse(reference)?;
        let parser_schema = self.defs.get(&parsed.id).ok_or_else(|| SchemaError::UnknownParser {
            id: parsed.id.clone(),
            reference: reference.to_string(),
        })?;
        check_subpath(parser_schema, &parsed.subpath, reference)?;

        entry.set_directive(PARSER_ID_KEY, EntryNode::ParserId(parsed))
    }

    fn interpret_calculate(&self, value: &Value, entry: &mut SchemaEntry) -> SchemaResult<()> {
        let object = expect_object(CALCULATE_KEY, value)?;
        let (Some(expression), Some(variables)) = (object.get("expression"), object.get("variables")) else {
            return Err(SchemaError::MalformedCalculate {
                reason: "both 'expression' and 'variables' are required".to_string(),
            });
        };

        let source = expression.as_str().ok_or_else(|| SchemaError::UnexpectedType {
            key: "expression".to_string(),
            expected: "string",
            found: value_type(expression),
        })?;
        let expression = Expression::parse(source).map_err(|source_error| SchemaError::InvalidExpression {
            expression: source.to_string(),
            source: source_error,
        })?;

        let variables = variables.as_object().ok_or_else(|| SchemaError::UnexpectedType {
            key: "variables".to_string(),
            expected: "object",
            found: value_type(variables),
        })?;

        if expression.variables().len() != variables.len() {
            return Err(SchemaError::VariableCountMismatch {
                expression: expression.to_string(),
                declared: variables.len(),
                found: expression.variables().len(),
            });
        }

        let mut variable_entries = indexmap::IndexMap::with_capacity(variables.len());
        for (name, variable) in variables {
            if !expression.variables().contains(name) {
                return Err(SchemaError::VariableNameMismatch {
                    name: name.clone(),
                    expression: expression.to_string(),
                });
            }

            let variable = variable.as_object().ok_or_else(|| SchemaError::UnexpectedType {
                key: name.clone(),
                expected: "object",
                found: value_type(variable),
            })?;
            let reference = variable
                .get("$ref")
                .ok_or_else(|| SchemaError::MissingVariableReference { name: name.clone() })?;

            let mut variable_entry = entry.calculation_variable();
            if let Some(parsing) = variable.get("!parsing") {
                variable_entry.context_mut().parsing = Some(ParsingDirective::from_value(parsing)?);
            }
            self.interpret_reference(reference, &mut variable_entry)?;
            variable_entries.insert(name.clone(), variable_entry);
        }

        entry.set_directive(
            CALCULATE_KEY,
            EntryNode::Calculate(CalculateDirective {
                expression,
                variables: variable_entries,
            }),
        )
    }
}

fn expect_object<'v>(key: &str, value: &'v Value) -> SchemaResult<&'v Map<String, Value>> {
    value.as_object().ok_or_else(|| SchemaError::UnexpectedType {
        key: key.to_string(),
        expected: "object",
        found: value_type(value),
    })
}

/// Every sub-path segment must name a nested property of the parser schema
fn check_subpath(parser_schema: &Value, subpath: &[String], reference: &str) -> SchemaResult<()> {
    let mut node = parser_schema;
    for segment in subpath {
        node = node
            .get("properties")
            .and_then(|properties| properties.get(segment))
            .ok_or_else(|| SchemaError::InvalidSubpath {
                reference: reference.to_string(),
                segment: segment.clone(),
            })?;
    }
    Ok(())
}

/// Interpret a schema with the built-in directives only
pub fn interpret(schema: &Value) -> SchemaResult<SchemaEntry> {
    let registry = DirectiveRegistry::default();
    SchemaInterpreter::new(schema, &registry)?.generate()
}
