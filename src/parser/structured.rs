//! JSON and YAML file parser driven by configuration

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Parser, ParserError, ParserResult};

/// Structured text format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuredFormat {
    /// Choose by file extension
    #[default]
    Auto,
    /// JSON document
    Json,
    /// YAML document
    Yaml,
}

impl StructuredFormat {
    /// Format implied by a file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(StructuredFormat::Json),
            "yml" | "yaml" => Some(StructuredFormat::Yaml),
            _ => None,
        }
    }
}

impl fmt::Display for StructuredFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StructuredFormat::Auto => "auto",
            StructuredFormat::Json => "json",
            StructuredFormat::Yaml => "yaml",
        })
    }
}

impl FromStr for StructuredFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(StructuredFormat::Auto),
            "json" => Ok(StructuredFormat::Json),
            "yaml" | "yml" => Ok(StructuredFormat::Yaml),
            other => Err(format!("unknown structured format '{other}'")),
        }
    }
}

/// Declarative parser description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserDefinition {
    /// Parser id
    pub id: String,
    /// Input file pattern
    pub pattern: String,
    /// Input format
    #[serde(default)]
    pub format: StructuredFormat,
    /// Schema of the parsed value
    #[serde(default = "empty_schema")]
    pub schema: Value,
}

fn empty_schema() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Parser reading whole JSON or YAML documents
#[derive(Debug, Clone)]
pub struct StructuredFileParser {
    definition: ParserDefinition,
}

impl StructuredFileParser {
    /// Create a parser from its definition
    pub fn new(definition: ParserDefinition) -> Self {
        Self { definition }
    }

    /// Definition this parser was built from
    pub fn definition(&self) -> &ParserDefinition {
        &self.definition
    }
}

impl From<ParserDefinition> for StructuredFileParser {
    fn from(definition: ParserDefinition) -> Self {
        Self::new(definition)
    }
}

impl Parser for StructuredFileParser {
    fn id(&self) -> &str {
        &self.definition.id
    }

    fn input_file_pattern(&self) -> &str {
        &self.definition.pattern
    }

    fn schema(&self) -> &Value {
        &self.definition.schema
    }

    fn parse(&self, path: &Path) -> ParserResult<Value> {
        let format = match self.definition.format {
            StructuredFormat::Auto => StructuredFormat::from_extension(path).ok_or_else(|| ParserError::UnknownFormat {
                path: path.display().to_string(),
            })?,
            format => format,
        };

        let text = fs::read_to_string(path).map_err(|e| ParserError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let decoded = match format {
            StructuredFormat::Yaml => serde_yaml::from_str::<Value>(&text).map_err(|e| e.to_string()),
            _ => serde_json::from_str::<Value>(&text).map_err(|e| e.to_string()),
        };
        decoded.map_err(|message| ParserError::Decode {
            path: path.display().to_string(),
            format,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parser(format: StructuredFormat) -> StructuredFileParser {
        StructuredFileParser::new(ParserDefinition {
            id: "config".to_string(),
            pattern: r".*\.(yml|json)".to_string(),
            format,
            schema: json!({}),
        })
    }

    #[test]
    fn test_yaml_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("env.yml");
        fs::write(&file, "cpu: x86\ncores: 4\n").unwrap();
        assert_eq!(
            parser(StructuredFormat::Auto).parse(&file).unwrap(),
            json!({"cpu": "x86", "cores": 4})
        );
    }

    #[test]
    fn test_forced_json_rejects_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("env.yml");
        fs::write(&file, "cpu: x86\n").unwrap();
        assert!(matches!(
            parser(StructuredFormat::Json).parse(&file),
            Err(ParserError::Decode {
                format: StructuredFormat::Json,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("env.txt");
        fs::write(&file, "{}").unwrap();
        assert!(matches!(
            parser(StructuredFormat::Auto).parse(&file),
            Err(ParserError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_definition_defaults() {
        let definition: ParserDefinition =
            serde_json::from_value(json!({"id": "env", "pattern": "env\\.yml"})).unwrap();
        assert_eq!(definition.format, StructuredFormat::Auto);
        assert_eq!(definition.schema, json!({}));
    }
}
