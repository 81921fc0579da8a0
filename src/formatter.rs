//! Parser registry and owner of the parse cache
//!
//! The [`Formatter`] holds the registered parsers, their cached results and an
//! immutable snapshot of the schema extended with every parser schema. The
//! snapshot is rebuilt whenever the parser set or the base schema changes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{Level, debug, info, log_enabled};
use rayon::prelude::*;
use serde_json::{Map, Value, json};

use crate::cache::{CacheEntry, CacheRegistry, ParserCache};
use crate::compiler::{CompileOptions, MetadataCompiler, compile_file_tree};
use crate::config::ArchivistConfig;
use crate::error::{ArchivistError, Result};
use crate::parser::{Parser, run_parser};
use crate::registry::DirectiveRegistry;
use crate::schema::{SchemaInterpreter, strip_directives};

/// `$defs` entry listing references to every registered parser
pub const NODE_DEF: &str = "node";

/// Parser registry, parse cache and schema snapshot
pub struct Formatter {
    parsers: IndexMap<String, Arc<dyn Parser>>,
    cache: CacheRegistry,
    base_schema: Option<Value>,
    schema: Option<Value>,
    registry: DirectiveRegistry,
    config: ArchivistConfig,
}

impl Formatter {
    /// Create a formatter with an optional base schema
    pub fn new(schema: Option<Value>, config: ArchivistConfig) -> Result<Self> {
        let cache = CacheRegistry::new(config.cache_key()?);
        let mut formatter = Self {
            parsers: IndexMap::new(),
            cache,
            base_schema: schema,
            schema: None,
            registry: DirectiveRegistry::default(),
            config,
        };
        formatter.rebuild_schema();
        Ok(formatter)
    }

    /// Use custom directives
    pub fn with_registry(mut self, registry: DirectiveRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Custom directives in use
    pub fn registry(&self) -> &DirectiveRegistry {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &ArchivistConfig {
        &self.config
    }

    /// Parse results
    pub fn cache(&self) -> &CacheRegistry {
        &self.cache
    }

    /// Schema snapshot including parser schemas
    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    /// Register a parser
    pub fn add_parser<P: Parser + 'static>(&mut self, parser: P) -> Result<()> {
        self.add_shared_parser(Arc::new(parser))
    }

    /// Register a parser shared with other owners
    pub fn add_shared_parser(&mut self, parser: Arc<dyn Parser>) -> Result<()> {
        let id = parser.id().to_string();
        self.cache.add(&id)?;
        debug!("Registered parser '{id}'");
        self.parsers.insert(id, parser);
        self.rebuild_schema();
        Ok(())
    }

    /// Replace a registered parser, discarding its previous results
    pub fn update_parser<P: Parser + 'static>(&mut self, parser: P) -> Result<()> {
        let id = parser.id().to_string();
        let slot = self
            .parsers
            .get_mut(&id)
            .ok_or_else(|| crate::cache::CacheError::UnknownParser { id: id.clone() })?;
        *slot = Arc::new(parser);
        self.cache.drop_parser(&id)?;
        self.cache.add(&id)?;
        self.rebuild_schema();
        Ok(())
    }

    /// Unregister a parser and drop its results
    pub fn remove_parser(&mut self, id: &str) -> Result<Arc<dyn Parser>> {
        self.cache.drop_parser(id)?;
        let parser = self
            .parsers
            .shift_remove(id)
            .ok_or_else(|| crate::cache::CacheError::UnknownParser { id: id.to_string() })?;
        self.rebuild_schema();
        Ok(parser)
    }

    /// A parser and its results
    pub fn get_parser(&self, id: &str) -> Option<(&Arc<dyn Parser>, &ParserCache)> {
        Some((self.parsers.get(id)?, self.cache.get(id)?))
    }

    /// Registered parsers in registration order
    pub fn parsers(&self) -> impl Iterator<Item = &Arc<dyn Parser>> {
        self.parsers.values()
    }

    /// Input patterns of every parser
    pub fn input_file_patterns(&self) -> Vec<&str> {
        self.parsers.values().map(|p| p.input_file_pattern()).collect()
    }

    /// Replace the base schema
    pub fn set_schema(&mut self, schema: Option<Value>) {
        self.base_schema = schema;
        self.rebuild_schema();
    }

    /// Snapshot with every directive removed
    pub fn export_schema(&self) -> Option<Value> {
        let custom = self.registry.directives();
        self.schema.as_ref().map(|schema| strip_directives(schema, &custom))
    }

    /// Whether parse results are persisted
    pub fn lazy_load(&self) -> bool {
        self.config.lazy_load
    }

    /// Switch lazy loading
    ///
    /// Enabling it once results are held in memory is rejected.
    pub fn set_lazy_load(&mut self, lazy: bool) -> Result<()> {
        if lazy && !self.config.lazy_load && !self.cache.is_empty() {
            return Err(ArchivistError::InvalidState(
                "lazy loading cannot be enabled after files were parsed".to_string(),
            ));
        }
        self.config.lazy_load = lazy;
        Ok(())
    }

    fn rebuild_schema(&mut self) {
        self.schema = self.base_schema.as_ref().map(|base| {
            let mut schema = base.clone();
            if let Value::Object(root) = &mut schema {
                let defs = root
                    .entry("$defs")
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(defs) = defs {
                    let references: Vec<Value> = self
                        .parsers
                        .values()
                        .map(|parser| json!({"$ref": parser.reference()}))
                        .collect();
                    for (id, parser) in &self.parsers {
                        defs.insert(id.clone(), parser.schema().clone());
                    }
                    defs.insert(NODE_DEF.to_string(), json!({"properties": {"anyOf": references}}));
                }
            }
            schema
        });
    }

    /// Parse every file with every parser whose pattern matches it
    ///
    /// Files are matched by their path relative to `root`. Parsing runs in
    /// parallel; results are stored in file order. In lazy mode every result
    /// is persisted and released, and the persisted files are returned.
    ///
    /// If any job fails nothing is stored, files persisted by the other jobs
    /// are removed and the first error in file order is returned.
    pub fn parse_files(&mut self, root: &Path, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
        info!("Parsing files ...");

        let mut jobs = Vec::new();
        for file in files {
            let rel_path = file.strip_prefix(root).unwrap_or(file);
            for parser in self.parsers.values() {
                if parser.accepts(rel_path)? {
                    jobs.push((Arc::clone(parser), file.as_path()));
                }
            }
        }
        debug!("{} parsing jobs for {} files", jobs.len(), files.len());

        let key = self.cache.key();
        let lazy = self.config.lazy_load;
        let overwrite = self.config.overwrite;
        let parsed: Vec<Result<CacheEntry>> = jobs
            .par_iter()
            .map(|(parser, file)| -> Result<CacheEntry> {
                let value = run_parser(parser.as_ref(), file)?;
                let mut entry = CacheEntry::new(parser.id(), root, *file, value);
                if lazy {
                    entry.save(key, overwrite)?;
                }
                Ok(entry)
            })
            .collect();

        let (entries, failures): (Vec<_>, Vec<_>) = parsed.into_iter().partition(Result::is_ok);
        if let Some(Err(err)) = failures.into_iter().next() {
            entries.iter().flatten().for_each(CacheEntry::discard);
            return Err(err);
        }

        let mut persisted = Vec::new();
        for entry in entries.into_iter().flatten() {
            if lazy {
                persisted.extend(entry.persisted_files());
            }
            let id = entry.parser_id().to_string();
            self.cache.get_mut(&id)?.add(entry);
        }
        Ok(persisted)
    }

    /// Compile metadata with the configured options
    pub fn compile_metadata(&self) -> Result<Value> {
        self.compile_metadata_with(&self.config.compile_options())
    }

    /// Compile metadata with explicit options
    ///
    /// Without a schema every result is placed under its relative file path.
    pub fn compile_metadata_with(&self, options: &CompileOptions) -> Result<Value> {
        if self.cache.is_empty() {
            return Err(ArchivistError::NothingParsed);
        }
        info!("Compiling metadata ...");

        let metadata = match &self.schema {
            Some(schema) => {
                let root = SchemaInterpreter::new(schema, &self.registry)?.generate()?;
                MetadataCompiler::new(&self.cache, schema, &self.registry, options).compile(&root)?
            }
            None => compile_file_tree(&self.cache)?,
        };

        if self.config.lazy_load {
            self.cache
                .iter()
                .flat_map(|(_, parser_cache)| parser_cache.iter())
                .for_each(CacheEntry::release);
        }
        info!("Done!");
        Ok(metadata)
    }

    /// Formatter holding the parsers of both `self` and `other`
    ///
    /// Configurations must agree and neither side may hold results.
    pub fn combine(self, other: Formatter, schema: Option<Value>) -> Result<Formatter> {
        if self.config != other.config {
            return Err(ArchivistError::InvalidState(
                "cannot combine formatters with different configurations".to_string(),
            ));
        }
        if !self.cache.is_empty() || !other.cache.is_empty() {
            return Err(ArchivistError::InvalidState(
                "cannot combine formatters holding parse results".to_string(),
            ));
        }

        let mut combined = Formatter::new(schema, self.config)?.with_registry(self.registry);
        for parser in self.parsers.into_values().chain(other.parsers.into_values()) {
            combined.add_shared_parser(parser)?;
        }
        if log_enabled!(Level::Debug) {
            debug!("Combined parsers: {:?}", combined.parsers.keys().collect::<Vec<_>>());
        }
        Ok(combined)
    }
}

impl std::fmt::Debug for Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter")
            .field("parsers", &self.parsers.keys().collect::<Vec<_>>())
            .field("results", &self.cache.entry_count())
            .field("has_schema", &self.schema.is_some())
            .field("registry", &self.registry)
            .finish()
    }
}
