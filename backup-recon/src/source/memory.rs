//! In-memory record source.

use serde_json::Value;
use std::collections::HashMap;

use super::{LogQuery, RecordSource};
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    collectors: HashMap<String, Vec<Value>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, collector: &str, records: impl IntoIterator<Item = Value>) -> Self {
        self.collectors
            .entry(collector.to_string())
            .or_default()
            .extend(records);
        self
    }
}

impl RecordSource for MemorySource {
    fn query(&self, query: &LogQuery) -> Result<Vec<Value>> {
        Ok(self
            .collectors
            .get(&query.collector)
            .map(|records| records.iter().filter(|r| query.admits(r)).cloned().collect())
            .unwrap_or_default())
    }
}
