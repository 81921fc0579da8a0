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

//! Schema interpretation errors

use thiserror::Error;

use crate::expression::ExpressionError;

/// Result type for schema interpretation
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while interpreting an annotated schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Schema document is not an object
    #[error("Schema must be an object, found {found}")]
    NotAnObject {
        /// JSON type found instead
        found: &'static str,
    },

    /// Required top-level key is absent
    #[error("Schema is missing the top-level '{key}' key")]
    MissingRootKey {
        /// Missing key
        key: &'static str,
    },

    /// Value has the wrong JSON type for its key
    #[error("Incorrect type for '{key}': expected {expected}, found {found}")]
    UnexpectedType {
        /// Schema key
        key: String,
        /// Expected JSON type
        expected: &'static str,
        /// JSON type found
        found: &'static str,
    },

    /// `$ref` does not have the `#/$defs/<id>` form
    #[error("Malformed reference '{reference}': {reason}")]
    MalformedReference {
        /// Reference text
        reference: String,
        /// What is wrong with it
        reason: String,
    },

    /// `$ref` names a parser absent from `$defs`
    #[error("Unknown parser '{id}' in reference '{reference}'")]
    UnknownParser {
        /// Parser identifier
        id: String,
        /// Reference text
        reference: String,
    },

    /// `$ref` sub-path does not exist in the parser schema
    #[error("Reference '{reference}' has no property '{segment}' in the parser schema")]
    InvalidSubpath {
        /// Reference text
        reference: String,
        /// First unresolved segment
        segment: String,
    },

    /// `!varname` used without an enclosing `patternProperties`
    #[error("!varname '{name}' used outside of a patternProperties context at '{key}'")]
    VarnameOutsideRegex {
        /// Variable name
        name: String,
        /// Property key holding the directive
        key: String,
    },

    /// Malformed `!parsing` payload
    #[error("Invalid !parsing directive: {reason}")]
    InvalidParsing {
        /// What is wrong with it
        reason: String,
    },

    /// Malformed `!calculate` payload
    #[error("Malformed !calculate directive: {reason}")]
    MalformedCalculate {
        /// What is wrong with it
        reason: String,
    },

    /// Expression rejected by the validator
    #[error("Incorrect expression in !calculate directive '{expression}': {source}")]
    InvalidExpression {
        /// Expression text
        expression: String,
        /// Validation failure
        #[source]
        source: ExpressionError,
    },

    /// Number of variable occurrences differs from the declared variables
    #[error(
        "Variables count mismatch in !calculate directive '{expression}': {declared} declared, {found} used"
    )]
    VariableCountMismatch {
        /// Expression text
        expression: String,
        /// Declared variable count
        declared: usize,
        /// Occurrences in the expression
        found: usize,
    },

    /// Declared variable does not occur in the expression
    #[error("Variable name mismatch in !calculate directive '{expression}': {name}")]
    VariableNameMismatch {
        /// Declared variable name
        name: String,
        /// Expression text
        expression: String,
    },

    /// Variable entry has no `$ref`
    #[error("Variable '{name}' does not reference a parser in !calculate directive")]
    MissingVariableReference {
        /// Variable name
        name: String,
    },

    /// A second directive leaf was attached to the same entry
    #[error("Entry '{key}' already holds a {existing} directive, cannot add {directive}")]
    DuplicateDirective {
        /// Entry key
        key: String,
        /// Directive already present
        existing: String,
        /// Directive being added
        directive: String,
    },

    /// Value type not supported at a property position
    #[error("Unsupported {found} value for '{key}'")]
    UnsupportedValue {
        /// Schema key
        key: String,
        /// JSON type found
        found: &'static str,
    },

    /// Failure reported by a registered directive rule
    #[error("Directive {directive}: {message}")]
    Custom {
        /// Directive key
        directive: String,
        /// Rule message
        message: String,
    },
}
