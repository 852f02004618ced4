//! Record source backed by JSON-lines files on disk.
//!
//! Layout: `<root>/<collector>/**/*.jsonl`, one record per line. Useful for
//! replaying exports from the log platform.

use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{LogQuery, RecordSource};
use crate::{ReconError, Result};

const EXTENSION: &str = "jsonl";

#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collector_files(&self, collector: &str) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(collector);
        if !dir.is_dir() {
            debug!("Collector directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ReconError::Source(e.to_string()))?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == EXTENSION) {
                files.push(path.to_path_buf());
            }
        }
        Ok(files)
    }
}

impl RecordSource for FileSource {
    fn query(&self, query: &LogQuery) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        for path in self.collector_files(&query.collector)? {
            let content = fs::read_to_string(&path)?;
            for (line_no, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(line) {
                    Ok(record) if query.admits(&record) => records.push(record),
                    Ok(_) => {}
                    Err(e) => warn!("Skipping {}:{}: {}", path.display(), line_no + 1, e),
                }
            }
        }
        debug!(
            "Collector {} returned {} records for filter [{}]",
            query.collector,
            records.len(),
            query.filter
        );
        Ok(records)
    }
}
