//! Compilation error types

use thiserror::Error;

use crate::cache::CacheError;
use crate::expression::ExpressionError;
use crate::pattern::PatternError;

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors raised while compiling metadata from an interpreted schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Referenced parser is not registered with the cache
    #[error("Parser '{id}' is referenced by the schema but not registered")]
    UnknownParser {
        /// Parser identifier
        id: String,
    },

    /// Referenced parser produced no results
    #[error("No parsing results available for parser '{id}'")]
    NoParsingResults {
        /// Parser identifier
        id: String,
    },

    /// A directive leaf shares its entry with other children
    #[error("Invalid entry content for '{key}': a directive must be the only child, found {children:?}")]
    InvalidEntryContent {
        /// Entry key
        key: String,
        /// Child keys found next to the directive
        children: Vec<String>,
    },

    /// Recursion result does not line up with the branch being unwrapped
    #[error("Malformed recursion result along branch {branch:?}: {reason}")]
    MalformedRecursion {
        /// Branch that was unwrapped
        branch: Vec<String>,
        /// What did not match
        reason: String,
    },

    /// Two values of different kinds collided while merging
    #[error("Cannot merge {incoming} into {existing}")]
    MergeConflict {
        /// Kind already present
        existing: &'static str,
        /// Kind being merged in
        incoming: &'static str,
    },

    /// A value sits where an object is needed to continue a path
    #[error("Cannot place value at {path:?}: an intermediate value is not an object")]
    PathConflict {
        /// Path being written
        path: Vec<String>,
    },

    /// Unpacking reached a container with several children
    #[error("Cannot unpack level {level}: container has {found} children")]
    AmbiguousUnpack {
        /// Unpack level, starting at 1
        level: usize,
        /// Number of children found
        found: usize,
    },

    /// Key filter applied to a non-object value
    #[error("Key filters require an object, found {found}")]
    FilterTarget {
        /// Type found
        found: &'static str,
    },

    /// Invalid key filter
    #[error("Invalid key filter '{filter}': {message}")]
    InvalidFilter {
        /// Filter as written
        filter: String,
        /// Regex engine message
        message: String,
    },

    /// `$ref` sub-path not present in a parsed value
    #[error("Parsed value of '{id}' has no key '{segment}'")]
    SubpathMissing {
        /// Parser identifier
        id: String,
        /// Missing segment
        segment: String,
    },

    /// Calculation variable did not resolve to a number
    #[error("Variable '{name}' resolved to a non-numeric value: {value}")]
    NonNumericVariable {
        /// Variable name
        name: String,
        /// Resolved value
        value: String,
    },

    /// Calculation failed
    #[error("Failed to evaluate '{expression}': {source}")]
    Evaluation {
        /// Expression source
        expression: String,
        /// Evaluation error
        #[source]
        source: ExpressionError,
    },

    /// Directive leaf with no formatting rule
    #[error("No formatting rule registered for directive {directive}")]
    UnknownDirective {
        /// Directive key
        directive: String,
    },

    /// Error raised by a registered formatting rule
    #[error("Directive {directive}: {message}")]
    Custom {
        /// Directive key
        directive: String,
        /// Rule message
        message: String,
    },

    /// Pattern matching failed
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Loading a parse result failed
    #[error(transparent)]
    Cache(#[from] CacheError),
}
