//! Crate-level error type

use thiserror::Error;

use crate::cache::CacheError;
use crate::compiler::CompileError;
use crate::config::ConfigError;
use crate::explorer::ExploreError;
use crate::exporter::ExportError;
use crate::expression::ExpressionError;
use crate::parser::ParserError;
use crate::pattern::PatternError;
use crate::registry::RegistryError;
use crate::schema::SchemaError;

/// Result type used across the crate's high-level API
pub type Result<T> = std::result::Result<T, ArchivistError>;

/// Any error raised while archiving metadata
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArchivistError {
    /// Schema interpretation failed
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Parse cache failure, including integrity violations
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Expression rejected
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// Invalid path pattern
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A parser failed
    #[error(transparent)]
    Parser(#[from] ParserError),

    /// File discovery failed
    #[error(transparent)]
    Explore(#[from] ExploreError),

    /// Export failed
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Directive registration rejected
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Compilation requested before any file was parsed
    #[error("No parsing results available, parse files first")]
    NothingParsed,

    /// Operation not allowed in the current state
    #[error("Invalid operation: {0}")]
    InvalidState(String),
}
