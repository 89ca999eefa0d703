//! Filter expressions
//!
//! Queries are rewritten into a small expression tree that repositories either
//! evaluate in memory (`Filter::matches`) or translate to their storage's own
//! query language. Entities expose their fields through [`Document`], an
//! explicit mapping from a dotted path to a value.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use chrono::{DateTime, Utc};
use regex::Regex;

/// Value of a document field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Texts(Vec<String>),
    Time(DateTime<Utc>),
}

/// Field access by dotted path, e.g. `status.run`
pub trait Document {
    fn field(&self, path: &str) -> Option<FieldValue>;
}

/// Conversion of a query into a filter expression
pub trait IntoFilter {
    fn to_filter(&self) -> Filter;
}

/// Filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches everything
    All,
    /// Text field equals the value
    Eq { field: &'static str, value: String },
    /// Text field equals one of the values
    In {
        field: &'static str,
        values: Vec<String>,
    },
    /// One of the patterns held by the field matches the value
    Matches { field: &'static str, value: String },
    /// Time field is strictly before the instant
    Before {
        field: &'static str,
        instant: DateTime<Utc>,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<String>) -> Self {
        Filter::Eq {
            field,
            value: value.into(),
        }
    }

    pub fn one_of(field: &'static str, values: Vec<String>) -> Self {
        Filter::In { field, values }
    }

    pub fn matches_pattern(field: &'static str, value: impl Into<String>) -> Self {
        Filter::Matches {
            field,
            value: value.into(),
        }
    }

    pub fn before(field: &'static str, instant: DateTime<Utc>) -> Self {
        Filter::Before { field, instant }
    }

    /// Conjunction, dropping `All` terms and unwrapping a single term
    pub fn and(filters: Vec<Filter>) -> Self {
        let mut terms: Vec<Filter> = filters
            .into_iter()
            .filter(|f| *f != Filter::All)
            .collect();
        match terms.len() {
            0 => Filter::All,
            1 => terms.remove(0),
            _ => Filter::And(terms),
        }
    }

    /// Evaluates the expression against a document
    pub fn matches<D: Document + ?Sized>(&self, doc: &D) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => match doc.field(field) {
                Some(FieldValue::Text(actual)) => actual == *value,
                _ => false,
            },
            Filter::In { field, values } => match doc.field(field) {
                Some(FieldValue::Text(actual)) => values.contains(&actual),
                _ => false,
            },
            Filter::Matches { field, value } => match doc.field(field) {
                Some(FieldValue::Texts(patterns)) => {
                    patterns.iter().any(|p| pattern_matches(p, value))
                }
                Some(FieldValue::Text(pattern)) => pattern_matches(&pattern, value),
                _ => false,
            },
            Filter::Before { field, instant } => match doc.field(field) {
                Some(FieldValue::Time(actual)) => actual < *instant,
                _ => false,
            },
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

/// Anchored regular expression match, literal equality for invalid patterns
fn pattern_matches(pattern: &str, value: &str) -> bool {
    match compiled(pattern) {
        Some(re) => re.is_match(value),
        None => pattern == value,
    }
}

/// Compiled, anchored form of `pattern`, cached per pattern text
///
/// `None` when the pattern does not compile on its own.
fn compiled(pattern: &str) -> Option<Regex> {
    static PATTERNS: OnceLock<Mutex<HashMap<String, Option<Regex>>>> = OnceLock::new();

    let mut patterns = PATTERNS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(cached) = patterns.get(pattern) {
        return cached.clone();
    }

    let regex = match Regex::new(pattern) {
        Ok(_) => Regex::new(&format!("^(?:{})$", pattern)).ok(),
        Err(e) => {
            tracing::debug!("Invalid competency pattern '{}': {}", pattern, e);
            None
        }
    };
    patterns.insert(pattern.to_string(), regex.clone());
    regex
}
