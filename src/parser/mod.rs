//! File parsers
//!
//! A [`Parser`] turns one file into one raw JSON value. Each parser has a
//! unique id, a `/`-separated path pattern selecting the files it reads, and
//! a schema stored under `$defs.<id>` of the compiled schema.

pub mod structured;
pub mod validate;

use std::fmt;
use std::path::Path;

use log::{debug, warn};
use serde_json::Value;
use thiserror::Error;

pub use structured::{ParserDefinition, StructuredFileParser, StructuredFormat};
pub use validate::validate;

use crate::pattern::{PatternResult, path_matches};
use crate::schema::REFERENCE_PREFIX;

/// Result type for parsing
pub type ParserResult<T> = Result<T, ParserError>;

/// Parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    /// Input path is not a regular file
    #[error("Not a file: {path}")]
    NotAFile {
        /// Offending path
        path: String,
    },

    /// Reading the file failed
    #[error("Failed to read {path}: {message}")]
    Io {
        /// File path
        path: String,
        /// OS message
        message: String,
    },

    /// File content could not be decoded
    #[error("Failed to decode {path} as {format}: {message}")]
    Decode {
        /// File path
        path: String,
        /// Expected format
        format: StructuredFormat,
        /// Decoder message
        message: String,
    },

    /// No format could be inferred for the file
    #[error("Cannot infer a structured format for {path}")]
    UnknownFormat {
        /// File path
        path: String,
    },

    /// Error raised by a user parse function
    #[error("Parser '{id}' failed on {path}: {message}")]
    Failed {
        /// Parser id
        id: String,
        /// File path
        path: String,
        /// Failure description
        message: String,
    },
}

/// Maps one file to one raw value
pub trait Parser: Send + Sync {
    /// Unique identifier, also the `$defs` key of the parser schema
    fn id(&self) -> &str;

    /// Path pattern selecting input files, matched against the path tail
    fn input_file_pattern(&self) -> &str;

    /// Schema describing parse results
    fn schema(&self) -> &Value;

    /// Parse one file
    fn parse(&self, path: &Path) -> ParserResult<Value>;

    /// Schema reference resolving to this parser
    fn reference(&self) -> String {
        format!("{REFERENCE_PREFIX}{}", self.id())
    }

    /// Whether this parser reads `path`
    fn accepts(&self, path: &Path) -> PatternResult<bool> {
        path_matches(self.input_file_pattern(), path, None)
    }
}

impl fmt::Debug for dyn Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("id", &self.id())
            .field("input_file_pattern", &self.input_file_pattern())
            .finish()
    }
}

/// Parse a file and check the result against the parser schema
///
/// Schema mismatches are reported as warnings and never fail.
pub fn run_parser(parser: &dyn Parser, path: &Path) -> ParserResult<Value> {
    if !path.is_file() {
        return Err(ParserError::NotAFile {
            path: path.display().to_string(),
        });
    }

    debug!("Parsing {} with '{}'", path.display(), parser.id());
    let value = parser.parse(path)?;
    for problem in validate(parser.schema(), &value) {
        warn!(
            "ValidationWarning: {} parsed by '{}' does not match its schema: {problem}",
            path.display(),
            parser.id()
        );
    }
    Ok(value)
}

type ParseFn = dyn Fn(&Path) -> Result<Value, String> + Send + Sync;

/// Parser backed by a closure
pub struct FunctionParser {
    id: String,
    pattern: String,
    schema: Value,
    parse: Box<ParseFn>,
}

impl FunctionParser {
    /// Wrap a parse function
    pub fn new<F>(id: impl Into<String>, pattern: impl Into<String>, schema: Value, parse: F) -> Self
    where
        F: Fn(&Path) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            schema,
            parse: Box::new(parse),
        }
    }
}

impl Parser for FunctionParser {
    fn id(&self) -> &str {
        &self.id
    }

    fn input_file_pattern(&self) -> &str {
        &self.pattern
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    fn parse(&self, path: &Path) -> ParserResult<Value> {
        (self.parse)(path).map_err(|message| ParserError::Failed {
            id: self.id.clone(),
            path: path.display().to_string(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn time_parser() -> FunctionParser {
        FunctionParser::new(
            "time_parser",
            r"time\.txt",
            json!({"type": "object", "properties": {"real": {"type": "string"}}}),
            |path| {
                let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
                Ok(json!({"real": text.trim()}))
            },
        )
    }

    #[test]
    fn test_reference_and_accepts() {
        let parser = time_parser();
        assert_eq!(parser.reference(), "#/$defs/time_parser");
        assert!(parser.accepts(Path::new("run_1/time.txt")).unwrap());
        assert!(!parser.accepts(Path::new("run_1/env.yml")).unwrap());
    }

    #[test]
    fn test_run_parser() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("time.txt");
        fs::write(&file, "1.2\n").unwrap();

        let parser = time_parser();
        assert_eq!(run_parser(&parser, &file).unwrap(), json!({"real": "1.2"}));
        assert!(matches!(
            run_parser(&parser, dir.path()),
            Err(ParserError::NotAFile { .. })
        ));
    }

    #[test]
    fn test_failure_carries_parser_id() {
        let parser = FunctionParser::new("broken", ".*", json!({}), |_| Err("bad input".to_string()));
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x");
        fs::write(&file, "").unwrap();
        let err = run_parser(&parser, &file).unwrap_err();
        assert!(matches!(err, ParserError::Failed { id, message, .. } if id == "broken" && message == "bad input"));
    }
}
