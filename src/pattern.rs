// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Path segment pattern matching with named-variable substitution
//!
//! Patterns and paths are compared as *reversed* sequences of segments so that
//! the file name lines up with the last pattern segment and matching proceeds
//! towards the root. Each pattern segment is one of:
//!
//! - `*`: matches any single segment
//! - a regular expression, anchored at the start of the segment
//! - a regular expression containing `{name}` placeholders, expanded with the
//!   regex bound to `name` by a `!varname` directive before matching

use std::borrow::Cow;
use std::path::Path;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for pattern operations
pub type PatternResult<T> = Result<T, PatternError>;

/// Pattern compilation and substitution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    /// Segment is not a valid regular expression
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidRegex {
        /// Pattern after variable substitution
        pattern: String,
        /// Regex engine message
        message: String,
    },

    /// Placeholder has no binding in the current context
    #[error("Unresolved variable '{{{name}}}' in pattern '{pattern}'")]
    UnresolvedVariable {
        /// Placeholder name
        name: String,
        /// Pattern containing the placeholder
        pattern: String,
    },
}

/// A named regular expression bound by a `!varname` directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Varname {
    /// Variable name used as `{name}` in path patterns
    pub name: String,
    /// Regex the variable expands to (the pattern property key)
    pub regexp: String,
}

impl Varname {
    /// Create a new binding
    pub fn new(name: impl Into<String>, regexp: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regexp: regexp.into(),
        }
    }
}

/// Compiled segment regexes shared across threads
static SEGMENT_CACHE: Lazy<DashMap<String, Regex>> = Lazy::new(DashMap::new);

/// Wildcard segment matching anything
pub const WILDCARD: &str = "*";

/// Locate the next `{identifier}` placeholder at or after `from`.
///
/// Regex repetition counts such as `{2}` or `{1,3}` are not identifiers and
/// are skipped.
fn next_placeholder(segment: &str, from: usize) -> Option<(usize, usize, &str)> {
    let mut search = from;
    while let Some(open) = segment[search..].find('{').map(|i| i + search) {
        let close = open + segment[open..].find('}')?;
        let name = &segment[open + 1..close];
        let mut chars = name.chars();
        let is_ident = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if is_ident {
            return Some((open, close + 1, name));
        }
        search = open + 1;
    }
    None
}

/// Expand `{name}` placeholders in a single pattern segment
pub fn expand_segment<'a>(segment: &'a str, varname: Option<&Varname>) -> PatternResult<Cow<'a, str>> {
    let Some(first) = next_placeholder(segment, 0) else {
        return Ok(Cow::Borrowed(segment));
    };

    let mut expanded = String::with_capacity(segment.len());
    let mut last = 0;
    let mut current = Some(first);
    while let Some((start, end, name)) = current {
        match varname {
            Some(binding) if binding.name == name => {
                expanded.push_str(&segment[last..start]);
                expanded.push_str(&binding.regexp);
                last = end;
            }
            _ => {
                return Err(PatternError::UnresolvedVariable {
                    name: name.to_string(),
                    pattern: segment.to_string(),
                });
            }
        }
        current = next_placeholder(segment, end);
    }
    expanded.push_str(&segment[last..]);
    Ok(Cow::Owned(expanded))
}

/// Get or compile the start-anchored regex for an expanded segment
pub fn segment_regex(pattern: &str) -> PatternResult<Regex> {
    if let Some(cached) = SEGMENT_CACHE.get(pattern) {
        return Ok(cached.clone());
    }

    let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|e| PatternError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    SEGMENT_CACHE.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// Match one pattern segment against one path segment
pub fn segment_matches(pattern: &str, segment: &str, varname: Option<&Varname>) -> PatternResult<bool> {
    if pattern == WILDCARD {
        return Ok(true);
    }
    let expanded = expand_segment(pattern, varname)?;
    Ok(segment_regex(&expanded)?.is_match(segment))
}

/// Positionally match reversed pattern segments against reversed path segments
///
/// Every pattern segment must match; a pattern longer than the path never
/// matches. Extra leading path segments (trailing after reversal) are allowed,
/// which lets a pattern describe only the tail of a path.
pub fn pattern_parts_match<P, S>(patterns: &[P], parts: &[S], varname: Option<&Varname>) -> PatternResult<bool>
where
    P: AsRef<str>,
    S: AsRef<str>,
{
    if patterns.len() > parts.len() {
        return Ok(false);
    }
    for (pattern, part) in patterns.iter().zip(parts) {
        if !segment_matches(pattern.as_ref(), part.as_ref(), varname)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Split a `/`-separated pattern and reverse it
pub fn reversed_pattern(pattern: &str) -> Vec<&str> {
    pattern.split('/').filter(|s| !s.is_empty()).rev().collect()
}

/// Reversed path components as strings
pub fn reversed_parts(path: &Path) -> Vec<String> {
    path.components()
        .rev()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// Match a `/`-separated pattern against the tail of a path
pub fn path_matches(pattern: &str, path: &Path, varname: Option<&Varname>) -> PatternResult<bool> {
    pattern_parts_match(&reversed_pattern(pattern), &reversed_parts(path), varname)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn station() -> Varname {
        Varname::new("b", "station_.*")
    }

    #[test]
    fn test_varname_substitution() {
        assert!(pattern_parts_match(&["{b}"], &["station_1"], Some(&station())).unwrap());
        assert!(!pattern_parts_match(&["{b}"], &["basin_1"], Some(&station())).unwrap());
    }

    #[test]
    fn test_fixed_mismatch() {
        assert!(!pattern_parts_match(&["fixed"], &["other"], None).unwrap());
    }

    #[test]
    fn test_pattern_longer_than_path_fails() {
        assert!(!pattern_parts_match(&["a", "b", "c"], &["a", "b"], None).unwrap());
    }

    #[test]
    fn test_tail_match() {
        let path = Path::new("archive/station_1/x.yml");
        assert!(path_matches(r".*\.yml", path, None).unwrap());
        assert!(path_matches(r"*/{b}/x\.yml", path, Some(&station())).unwrap());
        assert!(!path_matches(r"basin_.*/x\.yml", path, None).unwrap());
    }

    #[rstest]
    #[case("^basin_", "basin_12", true)]
    #[case("time\\.txt", "time.txt", true)]
    #[case("time\\.txt", "xtime.txt", false)]
    #[case("*", "anything", true)]
    #[case("[0-9]{2}", "42", true)]
    fn test_segment_matches(#[case] pattern: &str, #[case] segment: &str, #[case] expected: bool) {
        assert_eq!(segment_matches(pattern, segment, None).unwrap(), expected);
    }

    #[test]
    fn test_unresolved_variable() {
        let err = pattern_parts_match(&["{other}"], &["x"], Some(&station())).unwrap_err();
        assert!(matches!(err, PatternError::UnresolvedVariable { name, .. } if name == "other"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = segment_matches("(unclosed", "x", None).unwrap_err();
        assert!(matches!(err, PatternError::InvalidRegex { .. }));
    }

    #[test]
    fn test_embedded_placeholder() {
        let binding = Varname::new("run", "[0-9]+");
        assert!(segment_matches("run_{run}", "run_17", Some(&binding)).unwrap());
        assert_eq!(expand_segment("run_{run}", Some(&binding)).unwrap(), "run_[0-9]+");
    }
}
