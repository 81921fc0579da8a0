//! User-defined directives registered next to the built-in ones

use std::sync::Arc;

use metadata_archivist::compiler::{CompileError, CompileResult};
use metadata_archivist::parser::Parser;
use metadata_archivist::registry::{FormattingRule, FormattingScope, InterpretationRule, InterpretationScope};
use metadata_archivist::schema::{ParserReference, SchemaError, SchemaResult};
use metadata_archivist::{ArchivistConfig, ArchivistError, CompileOptions, DirectiveRegistry, Formatter};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

mod utils;
use utils::{ArchiveFixture, time_parser};

/// `!count: "#/$defs/<id>"` becomes the number of files parsed by `<id>`
struct Count;

impl InterpretationRule for Count {
    fn directive(&self) -> &str {
        "!count"
    }

    fn interpret(&self, value: &Value, scope: &mut InterpretationScope<'_>) -> SchemaResult<()> {
        let reference = value
            .as_str()
            .ok_or_else(|| scope.error("expected a parser reference"))?;
        let parsed = ParserReference::parse(reference)?;
        if !scope.defs().contains_key(&parsed.id) {
            return Err(scope.error(format!("unknown parser '{}'", parsed.id)));
        }
        scope.set_leaf(value.clone())
    }
}

impl FormattingRule for Count {
    fn directive(&self) -> &str {
        "!count"
    }

    fn format(&self, payload: &Value, scope: &FormattingScope<'_>) -> CompileResult<Value> {
        let reference = payload.as_str().ok_or_else(|| scope.error("payload is not a string"))?;
        let parsed = ParserReference::parse(reference).map_err(|e| scope.error(e.to_string()))?;
        let count = scope.cache().get(&parsed.id).map_or(0, |cache| cache.len());
        Ok(json!(count))
    }
}

/// `!unit: "<unit>"` is inherited by everything below the entry
struct Unit;

impl InterpretationRule for Unit {
    fn directive(&self) -> &str {
        "!unit"
    }

    fn interpret(&self, value: &Value, scope: &mut InterpretationScope<'_>) -> SchemaResult<()> {
        if !value.is_string() {
            return Err(scope.error("unit must be a string"));
        }
        scope.set_context(value.clone());
        Ok(())
    }
}

/// `!with_unit: "#/$defs/<id>"` resolves the reference and attaches the inherited unit
struct WithUnit;

impl InterpretationRule for WithUnit {
    fn directive(&self) -> &str {
        "!with_unit"
    }

    fn interpret(&self, value: &Value, scope: &mut InterpretationScope<'_>) -> SchemaResult<()> {
        scope.set_leaf(value.clone())
    }
}

impl FormattingRule for WithUnit {
    fn directive(&self) -> &str {
        "!with_unit"
    }

    fn format(&self, payload: &Value, scope: &FormattingScope<'_>) -> CompileResult<Value> {
        let reference = payload
            .as_str()
            .and_then(|r| ParserReference::parse(r).ok())
            .ok_or_else(|| scope.error("invalid reference"))?;
        let value = scope.resolve(&reference)?;
        let unit = scope
            .entry()
            .context()
            .custom
            .get("!unit")
            .cloned()
            .or_else(|| scope.options().custom("default_unit").cloned())
            .unwrap_or(Value::Null);
        Ok(json!({"value": value, "unit": unit}))
    }
}

fn registry() -> DirectiveRegistry {
    let mut registry = DirectiveRegistry::new();
    registry.register_interpretation(Count).unwrap();
    registry.register_formatting(Count).unwrap();
    registry.register_interpretation(Unit).unwrap();
    registry.register_interpretation(WithUnit).unwrap();
    registry.register_formatting(WithUnit).unwrap();
    registry
}

fn formatter(fixture: &ArchiveFixture, schema: Value) -> Formatter {
    let mut formatter = Formatter::new(Some(schema), ArchivistConfig::default())
        .unwrap()
        .with_registry(registry());
    let parser: Arc<dyn Parser> = Arc::new(time_parser());
    formatter.add_shared_parser(parser).unwrap();
    formatter.parse_files(fixture.root(), &fixture.files()).unwrap();
    formatter
}

#[test]
fn test_custom_leaf_and_inherited_context() {
    let fixture = ArchiveFixture::new();
    fixture.write("run_1/time.txt", "real 1.0\n");
    fixture.write("run_2/time.txt", "real 2.0\n");

    let schema = json!({
        "properties": {
            "runs": {"!count": "#/$defs/time_parser"},
            "timing": {
                "!unit": "s",
                "properties": {
                    "real": {
                        "!with_unit": "#/$defs/time_parser",
                        "!parsing": {"keys": ["real"], "unpack": true, "path": "run_1/time\\.txt"}
                    }
                }
            }
        }
    });
    let document = formatter(&fixture, schema).compile_metadata().unwrap();
    assert_eq!(
        document,
        json!({
            "runs": 2,
            "timing": {"real": {"value": {"run_1": {"time.txt": "1.0"}}, "unit": "s"}}
        })
    );
}

#[test]
fn test_custom_options_reach_rules() {
    let fixture = ArchiveFixture::new();
    fixture.write("time.txt", "real 1.0\n");

    let schema = json!({
        "properties": {
            "real": {"!with_unit": "#/$defs/time_parser", "!parsing": {"keys": ["real"], "unpack": true}}
        }
    });
    let mut options = CompileOptions::default();
    options.custom.insert("default_unit".to_string(), json!("ms"));

    let document = formatter(&fixture, schema).compile_metadata_with(&options).unwrap();
    assert_eq!(document, json!({"real": {"value": "1.0", "unit": "ms"}}));
}

#[test]
fn test_custom_directives_stripped_from_export() {
    let fixture = ArchiveFixture::new();
    fixture.write("time.txt", "real 1.0\n");
    let schema = json!({
        "properties": {"timing": {"!unit": "s", "type": "object"}}
    });
    let exported = formatter(&fixture, schema).export_schema().unwrap();
    assert_eq!(exported["properties"]["timing"], json!({"type": "object"}));
}

#[test]
fn test_custom_interpretation_error() {
    let fixture = ArchiveFixture::new();
    fixture.write("time.txt", "real 1.0\n");
    let schema = json!({"properties": {"runs": {"!count": "#/$defs/missing"}}});
    let err = formatter(&fixture, schema).compile_metadata().unwrap_err();
    assert!(matches!(err, ArchivistError::Schema(SchemaError::Custom { directive, .. }) if directive == "!count"));
}

#[test]
fn test_leaf_without_formatting_rule() {
    let fixture = ArchiveFixture::new();
    fixture.write("time.txt", "real 1.0\n");

    let mut registry = DirectiveRegistry::new();
    registry.register_interpretation(WithUnit).unwrap();
    let mut formatter = Formatter::new(
        Some(json!({"properties": {"real": {"!with_unit": "#/$defs/time_parser"}}})),
        ArchivistConfig::default(),
    )
    .unwrap()
    .with_registry(registry);
    formatter.add_parser(time_parser()).unwrap();
    formatter.parse_files(fixture.root(), &fixture.files()).unwrap();

    let err = formatter.compile_metadata().unwrap_err();
    assert!(matches!(
        err,
        ArchivistError::Compile(CompileError::UnknownDirective { directive }) if directive == "!with_unit"
    ));
}
