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

//! Interpreted schema tree

use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};
use serde_json::Value;

use super::directive::REFERENCE_PREFIX;
use super::error::{SchemaError, SchemaResult};
use super::value_type;
use crate::expression::Expression;
use crate::pattern::Varname;

/// How far `!parsing.unpack` descends through single-branch containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unpack {
    /// Descend a fixed number of levels
    Depth(usize),
    /// Descend until a non-container value is reached
    Full,
}

impl Serialize for Unpack {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Unpack::Depth(depth) => serializer.serialize_u64(*depth as u64),
            Unpack::Full => serializer.serialize_bool(true),
        }
    }
}

/// Payload of a `!parsing` directive
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ParsingDirective {
    /// `/`-separated path pattern matched against the file path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// UNIX-path-like key selections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    /// Unpacking depth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unpack: Option<Unpack>,
}

impl ParsingDirective {
    /// Read a `!parsing` payload
    pub fn from_value(value: &Value) -> SchemaResult<Self> {
        let object = value.as_object().ok_or_else(|| SchemaError::UnexpectedType {
            key: "!parsing".to_string(),
            expected: "object",
            found: value_type(value),
        })?;

        let mut directive = ParsingDirective::default();
        for (key, value) in object {
            match key.as_str() {
                "path" => {
                    let path = value.as_str().ok_or_else(|| SchemaError::InvalidParsing {
                        reason: format!("path must be a string, found {}", value_type(value)),
                    })?;
                    directive.path = Some(path.to_string());
                }
                "keys" => {
                    let keys = value
                        .as_array()
                        .ok_or_else(|| SchemaError::InvalidParsing {
                            reason: format!("keys must be a list, found {}", value_type(value)),
                        })?
                        .iter()
                        .map(|k| {
                            k.as_str().map(str::to_string).ok_or_else(|| SchemaError::InvalidParsing {
                                reason: format!("keys entries must be strings, found {}", value_type(k)),
                            })
                        })
                        .collect::<SchemaResult<Vec<_>>>()?;
                    directive.keys = Some(keys);
                }
                "unpack" => {
                    directive.unpack = Some(match value {
                        Value::Bool(true) => Unpack::Full,
                        Value::Number(n) => match n.as_u64() {
                            Some(depth) if depth > 0 => Unpack::Depth(depth as usize),
                            _ => {
                                return Err(SchemaError::InvalidParsing {
                                    reason: format!("unpack depth must be a positive integer, found {n}"),
                                });
                            }
                        },
                        other => {
                            return Err(SchemaError::InvalidParsing {
                                reason: format!("incorrect unpacking configuration: unpack={other}"),
                            });
                        }
                    });
                }
                other => log::debug!("Ignoring unknown !parsing key '{other}'"),
            }
        }
        Ok(directive)
    }
}

/// Directive state inherited down the tree
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Context {
    /// Branch is matched against path segments
    #[serde(rename = "useRegex", skip_serializing_if = "std::ops::Not::not")]
    pub use_regex: bool,
    /// `!varname` binding
    #[serde(rename = "!varname", skip_serializing_if = "Option::is_none")]
    pub varname: Option<Varname>,
    /// `!parsing` payload
    #[serde(rename = "!parsing", skip_serializing_if = "Option::is_none")]
    pub parsing: Option<ParsingDirective>,
    /// Payloads set by registered directives
    #[serde(flatten)]
    pub custom: IndexMap<String, Value>,
}

impl Context {
    /// Path pattern of the `!parsing` directive, if any
    pub fn parsing_path(&self) -> Option<&str> {
        self.parsing.as_ref().and_then(|p| p.path.as_deref())
    }
}

/// A resolved `$ref` to a parser
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ParserReference {
    /// Parser identifier
    pub id: String,
    /// Property names below the parser root
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subpath: Vec<String>,
}

impl ParserReference {
    /// Parse `#/$defs/<id>[/<subpath>]`
    pub fn parse(reference: &str) -> SchemaResult<Self> {
        let malformed = |reason: &str| SchemaError::MalformedReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        if !reference.starts_with(REFERENCE_PREFIX) {
            return Err(malformed("expected prefix '#/$defs/'"));
        }
        let segments: Vec<&str> = reference.split('/').collect();
        if segments.len() < 3 {
            return Err(malformed("too few path segments"));
        }
        let id = segments[2];
        if id.is_empty() {
            return Err(malformed("empty parser identifier"));
        }

        Ok(Self {
            id: id.to_string(),
            subpath: segments[3..]
                .iter()
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
        })
    }
}

/// A validated `!calculate` directive
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CalculateDirective {
    /// Parsed expression
    pub expression: Expression,
    /// One single-reference entry per variable
    pub variables: IndexMap<String, SchemaEntry>,
}

/// Child of a schema entry
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum EntryNode {
    /// Nested branch
    Entry(SchemaEntry),
    /// `!parser_id` leaf
    ParserId(ParserReference),
    /// `!calculate` leaf
    Calculate(CalculateDirective),
    /// Leaf set by a registered directive
    Custom(Value),
}

impl EntryNode {
    /// Whether this node is a directive leaf
    pub fn is_directive(&self) -> bool {
        !matches!(self, EntryNode::Entry(_))
    }
}

/// Node of the interpreted schema tree
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SchemaEntry {
    key: String,
    key_path: Vec<String>,
    context: Context,
    #[serde(flatten)]
    children: IndexMap<String, EntryNode>,
    #[serde(skip)]
    pattern_key: bool,
}

impl SchemaEntry {
    /// Empty root entry
    pub fn root() -> Self {
        Self::default()
    }

    /// New child branch inheriting a copy of this entry's context
    pub(crate) fn branch(&self, key: &str, pattern_key: bool) -> Self {
        let mut key_path = self.key_path.clone();
        key_path.push(key.to_string());
        Self {
            key: key.to_string(),
            key_path,
            context: self.context.clone(),
            children: IndexMap::new(),
            pattern_key,
        }
    }

    /// Entry resolving one `!calculate` variable
    pub(crate) fn calculation_variable(&self) -> Self {
        Self {
            key: super::directive::CALCULATE_KEY.to_string(),
            key_path: self.key_path.clone(),
            context: self.context.clone(),
            children: IndexMap::new(),
            pattern_key: false,
        }
    }

    /// Property name that produced this entry
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Keys from the root to this entry
    pub fn key_path(&self) -> &[String] {
        &self.key_path
    }

    /// Inherited directive context
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub(crate) fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Whether the key came from a `patternProperties` map
    pub fn is_pattern_key(&self) -> bool {
        self.pattern_key
    }

    /// All children in schema order
    pub fn children(&self) -> impl Iterator<Item = (&String, &EntryNode)> {
        self.children.iter()
    }

    /// Child lookup
    pub fn get(&self, key: &str) -> Option<&EntryNode> {
        self.children.get(key)
    }

    /// Nested branches only
    pub fn entries(&self) -> impl Iterator<Item = (&String, &SchemaEntry)> {
        self.children.iter().filter_map(|(k, v)| match v {
            EntryNode::Entry(entry) => Some((k, entry)),
            _ => None,
        })
    }

    /// The directive leaf, if any
    pub fn directive(&self) -> Option<(&str, &EntryNode)> {
        self.children
            .iter()
            .find(|(_, v)| v.is_directive())
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Number of children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Entry has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn insert_entry(&mut self, key: &str, entry: SchemaEntry) {
        self.children.insert(key.to_string(), EntryNode::Entry(entry));
    }

    /// Attach a directive leaf. Only one leaf is allowed per entry.
    pub(crate) fn set_directive(&mut self, key: &str, node: EntryNode) -> SchemaResult<()> {
        if let Some((existing, _)) = self.directive() {
            return Err(SchemaError::DuplicateDirective {
                key: self.key.clone(),
                existing: existing.to_string(),
                directive: key.to_string(),
            });
        }
        self.children.insert(key.to_string(), node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_reference_with_subpath() {
        let reference = ParserReference::parse("#/$defs/time_parser/real").unwrap();
        assert_eq!(reference.id, "time_parser");
        assert_eq!(reference.subpath, vec!["real"]);
    }

    #[rstest]
    #[case("#/properties/time")]
    #[case("#/$defs/")]
    #[case("time_parser")]
    fn test_malformed_reference(#[case] reference: &str) {
        assert!(matches!(
            ParserReference::parse(reference),
            Err(SchemaError::MalformedReference { .. })
        ));
    }

    #[test]
    fn test_parsing_directive() {
        let directive = ParsingDirective::from_value(&json!({
            "path": "*/{b}/x.yml",
            "keys": ["real", "sys"],
            "unpack": 2
        }))
        .unwrap();
        assert_eq!(directive.path.as_deref(), Some("*/{b}/x.yml"));
        assert_eq!(directive.keys, Some(vec!["real".to_string(), "sys".to_string()]));
        assert_eq!(directive.unpack, Some(Unpack::Depth(2)));
    }

    #[rstest]
    #[case(json!({"unpack": false}))]
    #[case(json!({"unpack": 0}))]
    #[case(json!({"keys": "real"}))]
    #[case(json!(["real"]))]
    fn test_invalid_parsing_directive(#[case] value: Value) {
        assert!(ParsingDirective::from_value(&value).is_err());
    }

    #[test]
    fn test_branch_copies_context() {
        let mut parent = SchemaEntry::root();
        parent.context_mut().use_regex = true;
        let mut child = parent.branch("station", true);
        child.context_mut().varname = Some(Varname::new("s", "station"));

        assert!(child.context().use_regex);
        assert!(parent.context().varname.is_none());
        assert_eq!(child.key_path(), ["station".to_string()]);
        assert!(child.is_pattern_key());
    }

    #[test]
    fn test_single_directive_leaf() {
        let mut entry = SchemaEntry::root().branch("time", false);
        let reference = ParserReference::parse("#/$defs/P").unwrap();
        entry
            .set_directive("!parser_id", EntryNode::ParserId(reference.clone()))
            .unwrap();
        let err = entry
            .set_directive("!parser_id", EntryNode::ParserId(reference))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateDirective { .. }));
    }
}
