//! Path pattern matching.
//!
//! # Responsibilities
//! - Translate `:name` and `{name}` segments into named capture groups
//! - Match request paths against the compiled expression
//! - Percent-decode captured values
//!
//! # Design Decisions
//! - Placeholders only at whole-segment level; anything else is literal
//! - Whole path anchored, trailing slash significant
//! - Matching is case-sensitive
//! - Literal segments outrank placeholders at the first position they differ

use std::cmp::Ordering;
use std::fmt;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::error::{Error, Result};

/// A compiled route pattern.
#[derive(Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
    names: Vec<String>,
    segments: Vec<Segment>,
}

/// One `/`-separated piece of a pattern. Placeholder names are dropped so
/// `/users/:id` and `/users/{name}` compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
}

impl Segment {
    fn is_param(&self) -> bool {
        matches!(self, Self::Param)
    }
}

impl PathPattern {
    /// Compile `pattern`.
    ///
    /// ```
    /// use tessera::routing::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/account/:name").unwrap();
    /// let params = pattern.captures("/account/Ann%20Lee").unwrap();
    /// assert_eq!(params, vec![("name".to_string(), "Ann Lee".to_string())]);
    /// ```
    pub fn parse(pattern: &str) -> Result<Self> {
        if !pattern.starts_with('/') {
            return Err(invalid(pattern, "must start with '/'"));
        }

        let mut expr = String::from("^");
        let mut names: Vec<String> = Vec::new();
        let mut segments = Vec::new();
        for (i, segment) in pattern.split('/').enumerate() {
            if i > 0 {
                expr.push('/');
            }
            match placeholder(segment) {
                Some(name) => {
                    if !is_valid_name(name) {
                        return Err(invalid(pattern, &format!("bad parameter name {name:?}")));
                    }
                    if names.iter().any(|existing| existing == name) {
                        return Err(invalid(pattern, &format!("duplicate parameter {name:?}")));
                    }
                    expr.push_str(&format!("(?P<{name}>[^/]+)"));
                    names.push(name.to_string());
                    segments.push(Segment::Param);
                }
                None => {
                    expr.push_str(&regex::escape(segment));
                    segments.push(Segment::Literal(segment.to_string()));
                }
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| invalid(pattern, &e.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
            names,
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Whether both patterns match exactly the same paths.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.segments == other.segments
    }

    /// Lookup order between two patterns: at the first segment where one is
    /// literal and the other a placeholder, the literal one sorts first.
    pub fn precedence(&self, other: &Self) -> Ordering {
        self.segments
            .iter()
            .map(Segment::is_param)
            .cmp(other.segments.iter().map(Segment::is_param))
    }

    /// Decoded parameter values for `path`, in pattern order, or `None` if
    /// the path does not match.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .filter_map(|name| {
                    caps.name(name).map(|m| {
                        let value = percent_decode_str(m.as_str()).decode_utf8_lossy();
                        (name.clone(), value.into_owned())
                    })
                })
                .collect(),
        )
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.source).finish()
    }
}

fn placeholder(segment: &str) -> Option<&str> {
    if let Some(name) = segment.strip_prefix(':') {
        return Some(name);
    }
    segment.strip_prefix('{')?.strip_suffix('}')
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn invalid(pattern: &str, reason: &str) -> Error {
    Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}
