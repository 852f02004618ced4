//! Record sources: where raw backup and binlog records come from.
//!
//! The log platform itself is an external collaborator; the engine only
//! needs something that answers a [`LogQuery`] with JSON records.

pub mod file;
pub mod memory;

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;

use crate::models::wire;
use crate::Result;

pub use file::FileSource;
pub use memory::MemorySource;

/// Fields tried in order when placing a record inside a query window.
const TIME_FIELDS: &[&str] = &[
    "backup_consistent_time",
    "consistent_backup_time",
    "stop_time",
    "file_mtime",
];

/// Field equality terms, rendered as the platform's free-text expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    terms: Vec<(String, String)>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, field: &str, value: impl ToString) -> Self {
        self.terms.push((field.to_string(), value.to_string()));
        self
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.terms.iter().all(|(field, expected)| {
            record
                .get(field)
                .and_then(wire::scalar_to_string)
                .is_some_and(|actual| actual == *expected)
        })
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("*");
        }
        let rendered: Vec<String> = self
            .terms
            .iter()
            .map(|(field, value)| format!("{field}: {value}"))
            .collect();
        f.write_str(&rendered.join(" AND "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Log collector (category) name.
    pub collector: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub filter: QueryFilter,
}

impl LogQuery {
    /// Whether a record passes the filter terms and falls inside the window.
    /// Records without a recognisable time field are only filtered by terms.
    pub fn admits(&self, record: &Value) -> bool {
        if !self.filter.matches(record) {
            return false;
        }
        match record_time(record) {
            Some(ts) => ts >= self.start && ts <= self.end,
            None => true,
        }
    }
}

fn record_time(record: &Value) -> Option<DateTime<Utc>> {
    TIME_FIELDS
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str))
        .and_then(wire::parse_timestamp)
}

/// Supplier of raw records. Implementations must be usable from several
/// pipelines at once.
pub trait RecordSource: Send + Sync {
    fn query(&self, query: &LogQuery) -> Result<Vec<Value>>;
}
