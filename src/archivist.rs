//! Orchestration of a full archiving run: explore, parse, compile, export

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_json::Value;

use crate::error::{ArchivistError, Result};
use crate::explorer::{DirectoryExplorer, Explorer};
use crate::exporter::Exporter;
use crate::formatter::Formatter;

/// Drives one archiving run over a directory
#[derive(Debug)]
pub struct Archivist<E: Explorer = DirectoryExplorer> {
    explorer: E,
    formatter: Formatter,
    persisted: Vec<PathBuf>,
    metadata: Option<Value>,
}

impl Archivist<DirectoryExplorer> {
    /// Archive the directory at `path`
    pub fn new(path: impl AsRef<Path>, formatter: Formatter) -> Self {
        Self::with_explorer(DirectoryExplorer::new(path.as_ref()), formatter)
    }
}

impl<E: Explorer> Archivist<E> {
    /// Archive the files found by `explorer`
    pub fn with_explorer(explorer: E, formatter: Formatter) -> Self {
        Self {
            explorer,
            formatter,
            persisted: Vec::new(),
            metadata: None,
        }
    }

    /// Formatter holding parsers and results
    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    /// Mutable formatter, e.g. to register more parsers before parsing
    pub fn formatter_mut(&mut self) -> &mut Formatter {
        &mut self.formatter
    }

    /// Find input files and parse them
    pub fn parse(&mut self) -> Result<()> {
        let patterns = self.formatter.input_file_patterns();
        if patterns.is_empty() {
            return Err(ArchivistError::InvalidState("no parsers registered".to_string()));
        }
        let exploration = self.explorer.explore(&patterns)?;
        debug!(
            "Found {} files in {} directories",
            exploration.files.len(),
            exploration.directories.len()
        );

        let persisted = self.formatter.parse_files(&exploration.root, &exploration.files)?;
        self.persisted.extend(persisted);
        self.metadata = None;
        Ok(())
    }

    /// Compiled metadata, compiled on first access
    ///
    /// Persisted parse results are deleted afterwards when `auto_cleanup` is
    /// set.
    pub fn get_metadata(&mut self) -> Result<&Value> {
        let metadata = match self.metadata.take() {
            Some(metadata) => metadata,
            None => {
                let metadata = self.formatter.compile_metadata()?;
                if self.formatter.config().auto_cleanup {
                    self.cleanup();
                }
                metadata
            }
        };
        Ok(self.metadata.insert(metadata))
    }

    /// Schema snapshot without directives
    pub fn formatted_schema(&self) -> Option<Value> {
        self.formatter.export_schema()
    }

    /// Compile if needed and write the metadata to the configured output
    pub fn export(&mut self) -> Result<PathBuf> {
        let exporter = Exporter::from_config(self.formatter.config());
        let metadata = self.get_metadata()?;
        Ok(exporter.export(metadata)?)
    }

    /// Persisted parse results not yet deleted
    pub fn persisted_files(&self) -> &[PathBuf] {
        &self.persisted
    }

    /// Delete persisted parse results
    pub fn cleanup(&mut self) {
        if self.persisted.is_empty() {
            return;
        }
        info!("Cleaning up {} cache files ...", self.persisted.len());
        for path in self.persisted.drain(..) {
            if let Err(err) = fs::remove_file(&path) {
                warn!("Failed to remove {}: {err}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArchivistConfig;
    use crate::parser::{ParserDefinition, StructuredFileParser};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn archivist(dir: &Path, config: ArchivistConfig) -> Archivist {
        let mut formatter = Formatter::new(
            Some(json!({"properties": {"env": {"$ref": "#/$defs/env"}}})),
            config,
        )
        .unwrap();
        formatter
            .add_parser(StructuredFileParser::new(ParserDefinition {
                id: "env".to_string(),
                pattern: r"env\.yml".to_string(),
                format: Default::default(),
                schema: json!({}),
            }))
            .unwrap();
        Archivist::new(dir, formatter)
    }

    #[test]
    fn test_lazy_run_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("env.yml"), "cpu: x86\n").unwrap();
        let config = ArchivistConfig {
            lazy_load: true,
            output_directory: dir.path().join("out"),
            ..Default::default()
        };

        let mut archivist = archivist(dir.path(), config);
        archivist.parse().unwrap();
        assert_eq!(archivist.persisted_files().len(), 2);

        let written = archivist.export().unwrap();
        assert!(archivist.persisted_files().is_empty());
        assert!(!dir.path().join("env.yml.env.meta.json").exists());

        let text = fs::read_to_string(written).unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&text).unwrap(),
            json!({"env": {"cpu": "x86"}})
        );
    }

    #[test]
    fn test_formatted_schema() {
        let dir = tempfile::tempdir().unwrap();
        let archivist = archivist(dir.path(), ArchivistConfig::default());
        let schema = archivist.formatted_schema().unwrap();
        assert_eq!(schema["$defs"]["env"], json!({}));
    }
}
