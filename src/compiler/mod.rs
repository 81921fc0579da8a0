//! Metadata compiler
//!
//! Walks an interpreted [`SchemaEntry`] tree and replaces every directive leaf
//! with the value its formatting rule produces from the parse cache.
//!
//! Entries below a `patternProperties` map stand for any number of matching
//! directories. Their results come back keyed by the real directory names,
//! rooted at the top of the schema, and are merged into one accumulator. At
//! the entry where the regex region starts, that accumulator is unwrapped
//! along the branch of literal keys leading to it so that only the matched
//! directories are attached under the entry's key.

pub mod annotate;
pub mod context;
pub mod error;
pub mod filter;
pub mod merge;
mod rules;
pub mod tree;

use log::{Level, debug, log_enabled};
use serde_json::{Map, Value};

pub use context::CompileOptions;
pub use error::{CompileError, CompileResult};
pub use merge::merge_values;

use crate::cache::CacheRegistry;
use crate::registry::{DirectiveRegistry, FormattingScope};
use crate::schema::{EntryNode, ParserReference, SchemaEntry, value_type};
use merge::merge_into_object;
use tree::insert_at_path;

/// Compiles one interpreted schema against a parse cache
pub struct MetadataCompiler<'a> {
    cache: &'a CacheRegistry,
    schema: &'a Value,
    registry: &'a DirectiveRegistry,
    options: &'a CompileOptions,
}

impl<'a> MetadataCompiler<'a> {
    /// Create a compiler
    ///
    /// `schema` is the document the entry tree was interpreted from; it is
    /// used to look up parser schemas and annotations.
    pub fn new(
        cache: &'a CacheRegistry,
        schema: &'a Value,
        registry: &'a DirectiveRegistry,
        options: &'a CompileOptions,
    ) -> Self {
        Self {
            cache,
            schema,
            registry,
            options,
        }
    }

    /// Parse results being compiled
    pub fn cache(&self) -> &'a CacheRegistry {
        self.cache
    }

    /// Source schema document
    pub fn schema(&self) -> &'a Value {
        self.schema
    }

    /// Caller options
    pub fn options(&self) -> &'a CompileOptions {
        self.options
    }

    /// Compile the tree rooted at `root`
    pub fn compile(&self, root: &SchemaEntry) -> CompileResult<Value> {
        let mut branch = Vec::new();
        let tree = self.compile_entry(root, &mut branch)?;

        if log_enabled!(Level::Debug) {
            if let Ok(dump) = serde_json::to_string_pretty(&tree) {
                debug!("Compiled metadata:\n{dump}");
            }
        }
        Ok(tree)
    }

    fn compile_entry(&self, entry: &SchemaEntry, branch: &mut Vec<String>) -> CompileResult<Value> {
        if let Some((directive, node)) = entry.directive() {
            if entry.len() > 1 {
                return Err(CompileError::InvalidEntryContent {
                    key: entry.key().to_string(),
                    children: entry
                        .children()
                        .filter(|(key, _)| key.as_str() != directive)
                        .map(|(key, _)| key.clone())
                        .collect(),
                });
            }
            return self.format_directive(entry, branch, directive, node);
        }

        let mut tree = Map::new();
        for (key, child) in entry.entries() {
            branch.push(key.clone());
            let result = self.compile_entry(child, branch)?;

            if entry.context().use_regex {
                merge_into_object(&mut tree, result)?;
            } else if child.context().use_regex {
                tree.insert(key.clone(), unwrap_branch(result, branch)?);
            } else {
                tree.insert(key.clone(), result);
            }
            branch.pop();
        }
        Ok(Value::Object(tree))
    }

    fn format_directive(&self, entry: &SchemaEntry, branch: &[String], directive: &str, node: &EntryNode) -> CompileResult<Value> {
        match node {
            EntryNode::ParserId(reference) => self.format_reference(entry, branch, reference, self.options),
            EntryNode::Calculate(calculation) => rules::format_calculation(self, entry, branch, calculation),
            EntryNode::Custom(payload) => {
                let rule = self
                    .registry
                    .formatting_rule(directive)
                    .ok_or_else(|| CompileError::UnknownDirective {
                        directive: directive.to_string(),
                    })?;
                let scope = FormattingScope::new(self, entry, branch, directive);
                rule.format(payload, &scope)
            }
            EntryNode::Entry(_) => Err(CompileError::UnknownDirective {
                directive: directive.to_string(),
            }),
        }
    }

    /// Resolve a parser reference as the `!parser_id` rule does
    pub(crate) fn format_reference(
        &self,
        entry: &SchemaEntry,
        branch: &[String],
        reference: &ParserReference,
        options: &CompileOptions,
    ) -> CompileResult<Value> {
        rules::format_parser_reference(self, entry, branch, reference, options)
    }
}

/// Strip the literal keys of `branch` from a regex recursion result
fn unwrap_branch(result: Value, branch: &[String]) -> CompileResult<Value> {
    let mut current = result;
    for (depth, key) in branch.iter().enumerate() {
        current = match current {
            // Nothing matched under the regex region
            Value::Object(map) if map.is_empty() => return Ok(Value::Object(map)),
            Value::Object(mut map) if map.len() == 1 => match map.remove(key) {
                Some(inner) => inner,
                None => {
                    return Err(CompileError::MalformedRecursion {
                        branch: branch.to_vec(),
                        reason: format!(
                            "expected key '{key}' at depth {depth}, found {:?}",
                            map.keys().collect::<Vec<_>>()
                        ),
                    });
                }
            },
            other => {
                return Err(CompileError::MalformedRecursion {
                    branch: branch.to_vec(),
                    reason: format!(
                        "expected a single-key object at depth {depth}, found {}",
                        describe(&other)
                    ),
                });
            }
        };
    }
    Ok(current)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Object(map) => format!("object with {} keys", map.len()),
        other => value_type(other).to_string(),
    }
}

/// Compile results without a schema: every result is placed under its path
/// relative to the explored root
pub fn compile_file_tree(cache: &CacheRegistry) -> CompileResult<Value> {
    let mut tree = Map::new();
    for (_, parser_cache) in cache.iter() {
        for entry in parser_cache {
            let parts: Vec<String> = entry
                .rel_path()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let value = cache.load(entry)?;
            insert_at_path(&mut tree, Value::clone(&value), &parts)?;
        }
    }
    Ok(Value::Object(tree))
}

/// Compile `root` with the built-in directives
pub fn compile(root: &SchemaEntry, schema: &Value, cache: &CacheRegistry, options: &CompileOptions) -> CompileResult<Value> {
    let registry = DirectiveRegistry::default();
    MetadataCompiler::new(cache, schema, &registry, options).compile(root)
}
