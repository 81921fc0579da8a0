//! Registry of custom schema directives
//!
//! Built-in directives are a closed set handled by the interpreter and the
//! compiler directly. Additional directives are registered here as a pair of
//! rules: an [`InterpretationRule`] that records context or a leaf while the
//! schema is interpreted, and optionally a [`FormattingRule`] that turns that
//! leaf into a value during compilation.

pub mod formatting;
pub mod interpretation;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

pub use formatting::{FormattingRule, FormattingScope};
pub use interpretation::{InterpretationRule, InterpretationScope};

use crate::schema::{CALCULATE_KEY, Directive, PARSER_ID_KEY};

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// Name clashes with a built-in directive
    #[error("Directive {0} is built in and cannot be replaced")]
    Reserved(String),

    /// Custom directive names must start with `!`
    #[error("Directive name '{0}' must start with '!'")]
    InvalidName(String),

    /// Rule already registered for the directive
    #[error("A {kind} rule is already registered for {directive}")]
    AlreadyRegistered {
        /// Rule kind
        kind: &'static str,
        /// Directive key
        directive: String,
    },
}

/// Custom directive rules
#[derive(Clone, Default)]
pub struct DirectiveRegistry {
    interpretation: FxHashMap<String, Arc<dyn InterpretationRule>>,
    formatting: FxHashMap<String, Arc<dyn FormattingRule>>,
}

impl DirectiveRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interpretation rule
    pub fn register_interpretation<R: InterpretationRule + 'static>(&mut self, rule: R) -> RegistryResult<()> {
        let directive = check_name(rule.directive())?;
        if self.interpretation.contains_key(&directive) {
            return Err(RegistryError::AlreadyRegistered {
                kind: "interpretation",
                directive,
            });
        }
        self.interpretation.insert(directive, Arc::new(rule));
        Ok(())
    }

    /// Register a formatting rule
    pub fn register_formatting<R: FormattingRule + 'static>(&mut self, rule: R) -> RegistryResult<()> {
        let directive = check_name(rule.directive())?;
        if self.formatting.contains_key(&directive) {
            return Err(RegistryError::AlreadyRegistered {
                kind: "formatting",
                directive,
            });
        }
        self.formatting.insert(directive, Arc::new(rule));
        Ok(())
    }

    /// Interpretation rule for a directive
    pub fn interpretation_rule(&self, directive: &str) -> Option<Arc<dyn InterpretationRule>> {
        self.interpretation.get(directive).cloned()
    }

    /// Formatting rule for a directive
    pub fn formatting_rule(&self, directive: &str) -> Option<Arc<dyn FormattingRule>> {
        self.formatting.get(directive).cloned()
    }

    /// Whether a custom directive is known
    pub fn contains(&self, directive: &str) -> bool {
        self.interpretation.contains_key(directive) || self.formatting.contains_key(directive)
    }

    /// Custom directive keys, sorted
    pub fn directives(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .interpretation
            .keys()
            .chain(self.formatting.keys())
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

impl std::fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectiveRegistry")
            .field("directives", &self.directives())
            .finish()
    }
}

fn check_name(directive: &str) -> RegistryResult<String> {
    if Directive::from_key(directive).is_some() || directive == PARSER_ID_KEY || directive == CALCULATE_KEY {
        return Err(RegistryError::Reserved(directive.to_string()));
    }
    if !directive.starts_with('!') || directive.len() < 2 {
        return Err(RegistryError::InvalidName(directive.to_string()));
    }
    Ok(directive.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaInterpreter, SchemaResult};
    use serde_json::{Value, json};

    struct Units;

    impl InterpretationRule for Units {
        fn directive(&self) -> &str {
            "!units"
        }

        fn interpret(&self, value: &Value, scope: &mut InterpretationScope<'_>) -> SchemaResult<()> {
            if !value.is_string() {
                return Err(scope.error("units must be a string"));
            }
            scope.set_context(value.clone());
            Ok(())
        }
    }

    #[test]
    fn test_reserved_names() {
        struct Named(&'static str);
        impl InterpretationRule for Named {
            fn directive(&self) -> &str {
                self.0
            }
            fn interpret(&self, _: &Value, _: &mut InterpretationScope<'_>) -> SchemaResult<()> {
                Ok(())
            }
        }

        let mut registry = DirectiveRegistry::new();
        assert_eq!(
            registry.register_interpretation(Named("$ref")),
            Err(RegistryError::Reserved("$ref".into()))
        );
        assert_eq!(
            registry.register_interpretation(Named("!parser_id")),
            Err(RegistryError::Reserved("!parser_id".into()))
        );
        assert_eq!(
            registry.register_interpretation(Named("units")),
            Err(RegistryError::InvalidName("units".into()))
        );
        registry.register_interpretation(Named("!units")).unwrap();
        assert!(matches!(
            registry.register_interpretation(Named("!units")),
            Err(RegistryError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn test_custom_context_inherited() {
        let mut registry = DirectiveRegistry::new();
        registry.register_interpretation(Units).unwrap();

        let schema = json!({
            "properties": {
                "run": {
                    "properties": {"time": {"$ref": "#/$defs/P"}},
                    "!units": "s"
                }
            },
            "$defs": {"P": {}}
        });
        let root = SchemaInterpreter::new(&schema, &registry).unwrap().generate().unwrap();
        let run = root.entries().next().unwrap().1;
        let time = run.entries().next().unwrap().1;
        assert_eq!(time.context().custom.get("!units"), Some(&json!("s")));
        assert_eq!(registry.directives(), vec!["!units"]);
    }

    #[test]
    fn test_custom_rule_error() {
        let mut registry = DirectiveRegistry::new();
        registry.register_interpretation(Units).unwrap();
        let schema = json!({"properties": {"run": {"!units": 3}}, "$defs": {}});
        let err = SchemaInterpreter::new(&schema, &registry)
            .unwrap()
            .generate()
            .unwrap_err();
        assert!(matches!(err, crate::schema::SchemaError::Custom { .. }));
    }
}
