//! Built-in formatting rules for `!parser_id` and `!calculate` leaves

use std::path::Path;

use log::{debug, warn};
use serde_json::{Map, Value};

use super::MetadataCompiler;
use super::annotate::{annotate, descend, lookup_path};
use super::context::CompileOptions;
use super::error::{CompileError, CompileResult};
use super::filter::filter_keys;
use super::tree::{insert_at_path, unpack};
use crate::cache::CacheEntry;
use crate::expression::{Bindings, Numeric};
use crate::pattern::{pattern_parts_match, reversed_pattern, reversed_parts};
use crate::schema::{CalculateDirective, EntryNode, ParserReference, SchemaEntry, Unpack};

/// Resolve a parser reference against every cached result of that parser
///
/// Results are keyed by path when the entry sits in a regex context or
/// declares `!parsing.path`; otherwise they are collected in a list, and a
/// single result is returned on its own.
pub(super) fn format_parser_reference(
    compiler: &MetadataCompiler<'_>,
    entry: &SchemaEntry,
    branch: &[String],
    reference: &ParserReference,
    options: &CompileOptions,
) -> CompileResult<Value> {
    let id = reference.id.as_str();
    let cache = compiler
        .cache()
        .get(id)
        .ok_or_else(|| CompileError::UnknownParser { id: id.to_string() })?;
    if cache.is_empty() {
        return Err(CompileError::NoParsingResults { id: id.to_string() });
    }

    let context = entry.context();
    let parsing = context.parsing.as_ref();
    let path_pattern = context.parsing_path().map(reversed_pattern);
    let keyed = context.use_regex || path_pattern.is_some();

    let parser_schema = compiler
        .schema()
        .get("$defs")
        .and_then(|defs| defs.get(id))
        .and_then(|node| descend_properties(node, &reference.subpath));

    let mut keyed_tree = Map::new();
    let mut listed = Vec::new();

    for cache_entry in cache {
        let mut placement = None;

        if context.use_regex {
            match regex_placement(entry, branch, cache_entry)? {
                Some(parts) => placement = Some(parts),
                None => continue,
            }
        }

        if let Some(pattern) = &path_pattern {
            let file_parts = reversed_parts(cache_entry.rel_path());
            if !pattern_parts_match(pattern, &file_parts, context.varname.as_ref())? {
                continue;
            }
            if placement.is_none() {
                placement = Some(file_parts.into_iter().rev().collect());
            }
        }

        debug!("Formatting {} for '{}'", cache_entry.rel_path().display(), entry.key());
        let loaded = compiler.cache().load(cache_entry)?;
        let mut value = narrow(&loaded, reference)?;

        if let Some(keys) = parsing.and_then(|p| p.keys.as_ref()) {
            value = filter_keys(&value, keys)?;
        }

        let mut steps = Vec::new();
        if let Some(depth) = parsing.and_then(|p| p.unpack) {
            (value, steps) = unpack(value, depth)?;
        }

        if options.annotates() {
            let node = parser_schema.and_then(|node| descend(node, &steps, compiler.schema()));
            value = annotate(value, node, compiler.schema(), options);
        }

        match placement {
            Some(parts) => insert_at_path(&mut keyed_tree, value, &parts)?,
            None => listed.push(value),
        }
    }

    if keyed {
        return Ok(Value::Object(keyed_tree));
    }
    Ok(match listed.len() {
        1 => listed.swap_remove(0),
        _ => Value::Array(listed),
    })
}

/// Where a result lands in a regex context, or `None` when its directory does
/// not match the branch
///
/// A pattern-keyed leaf stands for the directory itself and is placed at it.
/// Any other leaf is placed under its own key inside the matched directory.
fn regex_placement(entry: &SchemaEntry, branch: &[String], cache_entry: &CacheEntry) -> CompileResult<Option<Vec<String>>> {
    let parent = cache_entry.rel_path().parent().unwrap_or(Path::new(""));
    let parent_parts = reversed_parts(parent);

    let (pattern, own_key) = if entry.is_pattern_key() {
        (branch, None)
    } else {
        (&branch[..branch.len().saturating_sub(1)], Some(entry.key()))
    };
    let reversed: Vec<&str> = pattern.iter().rev().map(String::as_str).collect();

    if !pattern_parts_match(&reversed, &parent_parts, entry.context().varname.as_ref())? {
        return Ok(None);
    }

    // Keep only the directories aligned with the branch
    let mut parts: Vec<String> = parent_parts[..reversed.len()].iter().rev().cloned().collect();
    parts.extend(own_key.map(str::to_string));
    Ok(Some(parts))
}

fn narrow(value: &Value, reference: &ParserReference) -> CompileResult<Value> {
    let mut current = value;
    for segment in &reference.subpath {
        current = current.get(segment).ok_or_else(|| CompileError::SubpathMissing {
            id: reference.id.clone(),
            segment: segment.clone(),
        })?;
    }
    Ok(current.clone())
}

fn descend_properties<'s>(node: &'s Value, subpath: &[String]) -> Option<&'s Value> {
    subpath
        .iter()
        .try_fold(node, |node, segment| node.get("properties")?.get(segment))
}

/// Evaluate a `!calculate` leaf
pub(super) fn format_calculation(
    compiler: &MetadataCompiler<'_>,
    entry: &SchemaEntry,
    branch: &[String],
    calculation: &CalculateDirective,
) -> CompileResult<Value> {
    let options = compiler.options();
    if options.annotates() {
        warn!(
            "Annotation enabled for calculated value '{}'; variables are resolved without annotation",
            entry.key()
        );
    }
    let plain = options.without_annotation();

    let mut bindings = Bindings::default();
    for (name, variable) in &calculation.variables {
        let Some((_, EntryNode::ParserId(reference))) = variable.directive() else {
            return Err(CompileError::InvalidEntryContent {
                key: name.clone(),
                children: variable.children().map(|(key, _)| key.clone()).collect(),
            });
        };

        let resolved = format_parser_reference(compiler, variable, branch, reference, &plain)?;
        let (resolved, _) = unpack(resolved, Unpack::Full)?;
        let number = Numeric::from_json(&resolved).ok_or_else(|| CompileError::NonNumericVariable {
            name: name.clone(),
            value: resolved.to_string(),
        })?;
        bindings.insert(name.clone(), number);
    }

    let expression = &calculation.expression;
    let result = expression
        .evaluate(&bindings)
        .and_then(Numeric::to_json)
        .map_err(|source| CompileError::Evaluation {
            expression: expression.to_string(),
            source,
        })?;
    debug!("Calculated {expression} = {result}");

    if options.annotates() {
        let node = lookup_path(compiler.schema(), entry.key_path());
        return Ok(annotate(result, node, compiler.schema(), options));
    }
    Ok(result)
}
