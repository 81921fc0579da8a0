//! `!parsing.keys` selection

use regex::Regex;
use serde_json::{Map, Value};

use super::error::{CompileError, CompileResult};
use super::merge::merge_values;
use crate::pattern::{PatternError, segment_regex};
use crate::schema::value_type;

/// Keep only the parts of `value` selected by UNIX-path-like key filters
///
/// Each filter is split on `/` and every segment is a regex that must match a
/// whole key at its depth. Anything below the last segment, and any non-object
/// value reached early, is kept whole. Selections of all filters are merged.
pub fn filter_keys(value: &Value, filters: &[String]) -> CompileResult<Value> {
    let object = value.as_object().ok_or(CompileError::FilterTarget {
        found: value_type(value),
    })?;

    let mut selected = Value::Object(Map::new());
    for filter in filters {
        let levels = filter
            .split('/')
            .map(|segment| level_regex(filter, segment))
            .collect::<CompileResult<Vec<_>>>()?;
        log::debug!("Filtering key: {filter}");
        merge_values(&mut selected, Value::Object(filter_level(object, &levels)))?;
    }
    Ok(selected)
}

fn level_regex(filter: &str, segment: &str) -> CompileResult<Regex> {
    segment_regex(&format!("(?:{segment})$")).map_err(|err| match err {
        PatternError::InvalidRegex { message, .. } => CompileError::InvalidFilter {
            filter: filter.to_string(),
            message,
        },
        other => CompileError::Pattern(other),
    })
}

fn filter_level(object: &Map<String, Value>, levels: &[Regex]) -> Map<String, Value> {
    let Some((regex, deeper)) = levels.split_first() else {
        return object.clone();
    };

    object
        .iter()
        .filter(|(key, _)| regex.is_match(key))
        .map(|(key, value)| {
            let kept = match value {
                Value::Object(inner) => Value::Object(filter_level(inner, deeper)),
                other => other.clone(),
            };
            (key.clone(), kept)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn keys(filters: &[&str]) -> Vec<String> {
        filters.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_single_key() {
        let value = json!({"real": "1.2", "user": "0.3", "sys": "0.1"});
        let filtered = filter_keys(&value, &keys(&["real"])).unwrap();
        assert_eq!(filtered, json!({"real": "1.2"}));
    }

    #[test]
    fn test_nested_regex_levels_merge() {
        let value = json!({
            "cpu": {"model": "x", "cores": 4},
            "mem": {"total": 16, "free": 3},
            "disk": {"total": 100}
        });
        let filtered = filter_keys(&value, &keys(&["cpu|mem/total", "cpu/model"])).unwrap();
        assert_eq!(filtered, json!({"cpu": {"model": "x"}, "mem": {"total": 16}}));
    }

    #[test]
    fn test_whole_key_match_required() {
        let value = json!({"real": 1, "realtime": 2});
        assert_eq!(filter_keys(&value, &keys(&["real"])).unwrap(), json!({"real": 1}));
    }

    #[test]
    fn test_scalar_below_match_kept() {
        let value = json!({"a": 1, "b": {"c": 2}});
        assert_eq!(filter_keys(&value, &keys(&["a/x"])).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_non_object_target() {
        let err = filter_keys(&json!([1, 2]), &keys(&["a"])).unwrap_err();
        assert_eq!(err, CompileError::FilterTarget { found: "array" });
    }
}
