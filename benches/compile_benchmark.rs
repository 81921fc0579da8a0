//! Compilation benchmarks
//!
//! Measures schema interpretation, expression evaluation and compilation of a
//! synthetic archive of `runs` directories held in memory.

use std::hint::black_box;
use std::path::Path;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use metadata_archivist::expression::{Bindings, Numeric};
use metadata_archivist::{CacheEntry, CacheRegistry, CompileOptions, Expression, compile, interpret};
use serde_json::{Value, json};

fn archive_schema() -> Value {
    json!({
        "properties": {
            "simulation": {
                "patternProperties": {
                    "^run_\\d+": {
                        "!varname": "run",
                        "properties": {
                            "time": {"$ref": "#/$defs/time", "!parsing": {"keys": ["real"], "unpack": true}},
                            "config": {"$ref": "#/$defs/config", "!parsing": {"path": "{run}/config\\.yml"}}
                        }
                    }
                }
            },
            "speedup": {"!calculate": {
                "expression": "{serial}/{parallel}",
                "variables": {
                    "serial": {"$ref": "#/$defs/serial", "!parsing": {"keys": ["real"], "unpack": true}},
                    "parallel": {"$ref": "#/$defs/parallel", "!parsing": {"keys": ["real"], "unpack": true}}
                }
            }}
        },
        "$defs": {
            "time": {"type": "object", "properties": {"real": {"type": "number", "description": "Wall clock"}}},
            "config": {"type": "object"},
            "serial": {"type": "object"},
            "parallel": {"type": "object"}
        }
    })
}

fn archive_cache(runs: usize) -> CacheRegistry {
    let mut cache = CacheRegistry::default();
    for id in ["time", "config", "serial", "parallel"] {
        let _ = cache.add(id);
    }
    let root = Path::new("/archive");
    let mut push = |id: &str, rel: String, value: Value| {
        if let Ok(parser_cache) = cache.get_mut(id) {
            parser_cache.add(CacheEntry::new(id, root, root.join(rel), value));
        }
    };
    for run in 0..runs {
        push("time", format!("simulation/run_{run}/time.txt"), json!({"real": run as f64 * 0.5, "user": 1.0}));
        push("config", format!("simulation/run_{run}/config.yml"), json!({"threads": run % 8, "steps": 1000}));
    }
    push("serial", "serial/time.txt".to_string(), json!({"real": 120.0}));
    push("parallel", "parallel/time.txt".to_string(), json!({"real": 16.0}));
    cache
}

fn bench_interpret(c: &mut Criterion) {
    let schema = archive_schema();
    c.bench_function("interpret_schema", |b| b.iter(|| black_box(interpret(black_box(&schema)))));
}

fn bench_expression(c: &mut Criterion) {
    let source = "({a} + {b}) * 2 - {c} / 4";
    let expression = Expression::parse(source).expect("valid expression");
    let mut bindings = Bindings::default();
    bindings.insert("a".to_string(), Numeric::Int(3));
    bindings.insert("b".to_string(), Numeric::Float(1.5));
    bindings.insert("c".to_string(), Numeric::Int(8));

    c.bench_function("expression_parse", |b| b.iter(|| black_box(Expression::parse(black_box(source)))));
    c.bench_function("expression_evaluate", |b| b.iter(|| black_box(expression.evaluate(&bindings))));
}

fn bench_compile(c: &mut Criterion) {
    let schema = archive_schema();
    let root = interpret(&schema).expect("valid schema");

    let mut group = c.benchmark_group("compile_runs");
    for runs in [10, 100, 1000] {
        let cache = archive_cache(runs);
        for (label, options) in [
            ("plain", CompileOptions::default()),
            (
                "annotated",
                CompileOptions {
                    add_description: true,
                    add_type: true,
                    ..Default::default()
                },
            ),
        ] {
            group.bench_with_input(BenchmarkId::new(label, runs), &cache, |b, cache| {
                b.iter(|| black_box(compile(&root, &schema, cache, &options)))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_interpret, bench_expression, bench_compile);
criterion_main!(benches);
