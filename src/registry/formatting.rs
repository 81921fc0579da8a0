//! Custom formatting rules

use serde_json::Value;

use crate::cache::CacheRegistry;
use crate::compiler::{CompileError, CompileOptions, CompileResult, MetadataCompiler};
use crate::schema::{ParserReference, SchemaEntry};

/// Formats a leaf created by a custom [`InterpretationRule`](super::InterpretationRule)
pub trait FormattingRule: Send + Sync {
    /// Directive key, matching the interpretation rule
    fn directive(&self) -> &str;

    /// Produce the value placed at the leaf's position
    fn format(&self, payload: &Value, scope: &FormattingScope<'_>) -> CompileResult<Value>;
}

/// Access granted to a [`FormattingRule`]
pub struct FormattingScope<'s> {
    compiler: &'s MetadataCompiler<'s>,
    entry: &'s SchemaEntry,
    branch: &'s [String],
    directive: &'s str,
}

impl<'s> FormattingScope<'s> {
    pub(crate) fn new(
        compiler: &'s MetadataCompiler<'s>,
        entry: &'s SchemaEntry,
        branch: &'s [String],
        directive: &'s str,
    ) -> Self {
        Self {
            compiler,
            entry,
            branch,
            directive,
        }
    }

    /// Entry holding the leaf
    pub fn entry(&self) -> &SchemaEntry {
        self.entry
    }

    /// Keys from the compile root to the entry
    pub fn branch(&self) -> &[String] {
        self.branch
    }

    /// Caller options, including custom ones
    pub fn options(&self) -> &CompileOptions {
        self.compiler.options()
    }

    /// Schema being compiled
    pub fn schema(&self) -> &Value {
        self.compiler.schema()
    }

    /// Parse results
    pub fn cache(&self) -> &CacheRegistry {
        self.compiler.cache()
    }

    /// Format a parser reference as if it were a `$ref` on this entry
    pub fn resolve(&self, reference: &ParserReference) -> CompileResult<Value> {
        self.compiler
            .format_reference(self.entry, self.branch, reference, self.compiler.options())
    }

    /// Error attributed to this directive
    pub fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Custom {
            directive: self.directive.to_string(),
            message: message.into(),
        }
    }
}
