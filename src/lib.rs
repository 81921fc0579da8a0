//! Schema-driven metadata extraction
//!
//! Output files of simulations, tools and logs are parsed by pluggable
//! [`Parser`]s and assembled into one document whose shape is declared by an
//! annotated JSON-Schema. The engine is split into:
//!
//! - [`schema`]: interprets the annotated schema into a tree of entries
//! - [`compiler`]: resolves that tree against cached parse results
//! - [`pattern`]: path segment matching with `{name}` substitution
//! - [`expression`]: the arithmetic grammar used by `!calculate`
//! - [`cache`]: per-file parse results, optionally persisted and verified
//! - [`registry`]: user-defined directives
//!
//! [`Formatter`] and [`Archivist`] wire these together with file discovery
//! and export.

pub mod archivist;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod error;
pub mod explorer;
pub mod exporter;
pub mod expression;
pub mod formatter;
pub mod logging;
pub mod parser;
pub mod pattern;
pub mod registry;
pub mod schema;

// Re-export main types
pub use archivist::Archivist;
pub use cache::{CacheEntry, CacheKey, CacheRegistry};
pub use compiler::{CompileOptions, MetadataCompiler, compile};
pub use config::ArchivistConfig;
pub use error::{ArchivistError, Result};
pub use expression::Expression;
pub use formatter::Formatter;
pub use parser::Parser;
pub use registry::DirectiveRegistry;
pub use schema::{SchemaEntry, SchemaInterpreter, interpret};
