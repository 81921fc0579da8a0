//! Command-line front end
//!
//! Extracts metadata from a directory of output files using a schema and a
//! list of declarative parsers.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use metadata_archivist::config::ArchivistConfig;
use metadata_archivist::exporter::ExportFormat;
use metadata_archivist::logging::{LogLevel, init_logging};
use metadata_archivist::parser::{ParserDefinition, StructuredFileParser};
use metadata_archivist::schema::SchemaInterpreter;
use metadata_archivist::{Archivist, Formatter, expression};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "archivist")]
#[command(about = "Compile structured metadata from output files described by an annotated schema")]
#[command(version)]
struct Cli {
    /// Verbosity: warning, info or debug
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore a directory, parse matching files and export the metadata
    Run {
        /// Directory to archive
        path: PathBuf,
        /// Annotated schema (JSON or YAML)
        #[arg(short, long)]
        schema: Option<PathBuf>,
        /// Parser definitions (JSON or YAML list)
        #[arg(short, long)]
        parsers: PathBuf,
        /// Configuration file (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Persist parse results instead of keeping them in memory
        #[arg(long)]
        lazy: bool,
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format: json or yaml
        #[arg(short, long)]
        format: Option<ExportFormat>,
    },
    /// Print the interpreted schema tree
    Interpret {
        /// Annotated schema
        #[arg(short, long)]
        schema: PathBuf,
        /// Parser definitions
        #[arg(short, long)]
        parsers: PathBuf,
    },
    /// Print the schema with parser schemas merged in and directives removed
    Strip {
        /// Annotated schema
        #[arg(short, long)]
        schema: PathBuf,
        /// Parser definitions
        #[arg(short, long)]
        parsers: PathBuf,
    },
    /// Validate a calculation expression and list its variables
    CheckExpression {
        /// Expression such as "{a} / {b}"
        expression: String,
    },
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.log_level);

    if let Err(err) = execute(cli.command) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn execute(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            path,
            schema,
            parsers,
            config,
            lazy,
            output,
            format,
        } => {
            let mut config = match config {
                Some(file) => ArchivistConfig::from_file(&file)?,
                None => ArchivistConfig::default(),
            };
            config.lazy_load |= lazy;
            if let Some(output) = output {
                config.output_directory = output;
            }
            if let Some(format) = format {
                config.output_format = format;
            }

            let schema = schema.as_deref().map(read_document).transpose()?;
            let formatter = build_formatter(schema, &parsers, config)?;
            let mut archivist = Archivist::new(&path, formatter);
            archivist.parse().context("parsing failed")?;
            let written = archivist.export().context("compilation failed")?;
            println!("{}", written.display());
        }
        Commands::Interpret { schema, parsers } => {
            let formatter = build_formatter(Some(read_document(&schema)?), &parsers, ArchivistConfig::default())?;
            let Some(snapshot) = formatter.schema() else {
                bail!("no schema loaded");
            };
            let tree = SchemaInterpreter::new(snapshot, formatter.registry())?.generate()?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        Commands::Strip { schema, parsers } => {
            let formatter = build_formatter(Some(read_document(&schema)?), &parsers, ArchivistConfig::default())?;
            let Some(stripped) = formatter.export_schema() else {
                bail!("no schema loaded");
            };
            println!("{}", serde_json::to_string_pretty(&stripped)?);
        }
        Commands::CheckExpression { expression } => {
            let variables = expression::validate(&expression)?;
            println!("valid; variables: {}", variables.join(", "));
        }
    }
    Ok(())
}

fn read_document(path: &Path) -> anyhow::Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"));
    let value = if is_yaml {
        serde_yaml::from_str(&text).with_context(|| format!("invalid YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?
    };
    Ok(value)
}

fn build_formatter(schema: Option<Value>, parsers: &Path, config: ArchivistConfig) -> anyhow::Result<Formatter> {
    let definitions: Vec<ParserDefinition> = serde_json::from_value(read_document(parsers)?)
        .with_context(|| format!("invalid parser definitions in {}", parsers.display()))?;

    let mut formatter = Formatter::new(schema, config)?;
    for definition in definitions {
        formatter.add_parser(StructuredFileParser::new(definition))?;
    }
    Ok(formatter)
}
