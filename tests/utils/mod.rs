//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use metadata_archivist::parser::{FunctionParser, ParserDefinition, StructuredFileParser};
use metadata_archivist::{ArchivistConfig, Formatter, Parser};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Directory tree of fake output files
pub struct ArchiveFixture {
    dir: TempDir,
}

impl ArchiveFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file below the root, creating parent directories
    pub fn write(&self, rel_path: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, content).expect("write fixture");
        path
    }

    /// Every regular file below the root, sorted
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(self.root())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }
}

/// Parser reading `time` output: `real 1.2` / `user 0.3` / `sys 0.1` lines
pub fn time_parser() -> FunctionParser {
    FunctionParser::new(
        "time_parser",
        r"time\.txt",
        json!({
            "type": "object",
            "properties": {
                "real": {"type": "string", "description": "Elapsed wall clock time"},
                "user": {"type": "string", "description": "User CPU time"},
                "sys": {"type": "string", "description": "System CPU time"}
            }
        }),
        |path| {
            let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
            let mut fields = serde_json::Map::new();
            for line in text.lines() {
                if let Some((key, value)) = line.split_once(char::is_whitespace) {
                    fields.insert(key.to_string(), Value::String(value.trim().to_string()));
                }
            }
            Ok(Value::Object(fields))
        },
    )
}

/// YAML parser for files matching `pattern`
pub fn yaml_parser(id: &str, pattern: &str, schema: Value) -> StructuredFileParser {
    StructuredFileParser::new(ParserDefinition {
        id: id.to_string(),
        pattern: pattern.to_string(),
        format: Default::default(),
        schema,
    })
}

/// Formatter with the given schema and parsers, files already parsed
pub fn parsed_formatter(
    fixture: &ArchiveFixture,
    schema: Option<Value>,
    config: ArchivistConfig,
    parsers: Vec<Arc<dyn Parser>>,
) -> Formatter {
    let mut formatter = Formatter::new(schema, config).expect("formatter");
    for parser in parsers {
        formatter.add_shared_parser(parser).expect("register parser");
    }
    formatter
        .parse_files(fixture.root(), &fixture.files())
        .expect("parse files");
    formatter
}
