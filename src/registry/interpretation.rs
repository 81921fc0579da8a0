//! Custom interpretation rules

use serde_json::{Map, Value};

use crate::schema::{Context, EntryNode, SchemaEntry, SchemaError, SchemaResult};

/// A directive interpreted while building the schema tree
///
/// Rules run before sibling branches are created, so context set here is
/// inherited by every branch below the entry.
pub trait InterpretationRule: Send + Sync {
    /// Directive key, e.g. `!units`
    fn directive(&self) -> &str;

    /// Apply the directive to the entry holding it
    fn interpret(&self, value: &Value, scope: &mut InterpretationScope<'_>) -> SchemaResult<()>;
}

/// Access granted to an [`InterpretationRule`]
pub struct InterpretationScope<'s> {
    directive: &'s str,
    parent_key: &'s str,
    defs: &'s Map<String, Value>,
    entry: &'s mut SchemaEntry,
}

impl<'s> InterpretationScope<'s> {
    pub(crate) fn new(
        directive: &'s str,
        parent_key: &'s str,
        defs: &'s Map<String, Value>,
        entry: &'s mut SchemaEntry,
    ) -> Self {
        Self {
            directive,
            parent_key,
            defs,
            entry,
        }
    }

    /// Directive being interpreted
    pub fn directive(&self) -> &str {
        self.directive
    }

    /// Key of the property holding the directive
    pub fn parent_key(&self) -> &str {
        self.parent_key
    }

    /// Parser schemas
    pub fn defs(&self) -> &Map<String, Value> {
        self.defs
    }

    /// Current context
    pub fn context(&self) -> &Context {
        self.entry.context()
    }

    /// Keys from the root to the entry
    pub fn key_path(&self) -> &[String] {
        self.entry.key_path()
    }

    /// Store a payload in the context under the directive key
    pub fn set_context(&mut self, payload: Value) {
        self.entry
            .context_mut()
            .custom
            .insert(self.directive.to_string(), payload);
    }

    /// Make the entry a leaf formatted by the matching formatting rule
    pub fn set_leaf(&mut self, payload: Value) -> SchemaResult<()> {
        self.entry
            .set_directive(self.directive, EntryNode::Custom(payload))
    }

    /// Error attributed to this directive
    pub fn error(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::Custom {
            directive: self.directive.to_string(),
            message: message.into(),
        }
    }
}
