use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analysis::Category;
use crate::dispatch::QueryResult;

// ---------------------------------------------------------------------------
// Query log entry (JSONL history)
// ---------------------------------------------------------------------------

/// One line of the query history (`~/.site-tracker/query-log.jsonl`).
///
/// The query text itself is never written, only how it was handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub timestamp: String,
    pub category: Category,
    /// Provider the user had selected when the query was made.
    pub provider: String,
    /// `"local"` or `"remote"`: who actually produced the answer.
    pub source: String,
    #[serde(default)]
    pub enhanced: bool,
    pub latency_ms: u64,
    /// Error kind when a remote call failed and the local analyzer answered.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fallback_reason: Option<String>,
}

impl QueryLogEntry {
    pub fn from_result(result: &QueryResult, latency_ms: u64) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            category: result.category,
            provider: result.provider_id.clone(),
            source: result.source.to_string(),
            enhanced: result.enhanced,
            latency_ms,
            fallback_reason: result.fallback_reason.clone(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

// ---------------------------------------------------------------------------
// Log file
// ---------------------------------------------------------------------------

/// Append-only JSONL history at a fixed path.
#[derive(Debug, Clone)]
pub struct QueryLog {
    path: PathBuf,
}

impl QueryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log at the default location, if a home directory exists.
    pub fn at_default_path() -> Option<Self> {
        query_log_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry. Failures are swallowed; history must never break a query.
    pub fn record(&self, entry: &QueryLogEntry) {
        if let Err(e) = self.append(entry) {
            tracing::debug!(path = %self.path.display(), error = %e, "query log append failed");
        }
    }

    fn append(&self, entry: &QueryLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{json}")?;

        Ok(())
    }

    /// Every parseable entry. Malformed lines are skipped; a missing file is empty.
    pub fn read_all(&self) -> Vec<QueryLogEntry> {
        let Ok(file) = fs::File::open(&self.path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<QueryLogEntry>(&line).ok())
            .collect()
    }

    /// Entries from the last `days` days, or all of them for `None`.
    pub fn read_since_days(&self, days: Option<u32>) -> Vec<QueryLogEntry> {
        let entries = self.read_all();

        let Some(days) = days else {
            return entries;
        };

        let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();
        entries.into_iter().filter(|e| e.timestamp >= cutoff).collect()
    }
}

pub fn query_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".site-tracker").join("query-log.jsonl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(timestamp: &str, fallback: Option<&str>) -> QueryLogEntry {
        QueryLogEntry {
            timestamp: timestamp.to_string(),
            category: Category::Issues,
            provider: "openrouter".to_string(),
            source: "local".to_string(),
            enhanced: false,
            latency_ms: 12,
            fallback_reason: fallback.map(str::to_string),
        }
    }

    #[test]
    fn append_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = QueryLog::new(dir.path().join("nested").join("log.jsonl"));

        log.record(&entry(&Utc::now().to_rfc3339(), Some("network")));
        log.record(&entry(&Utc::now().to_rfc3339(), None));

        let all = log.read_all();
        assert_eq!(all.len(), 2);
        assert!(all[0].is_fallback());
        assert!(!all[1].is_fallback());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let good = serde_json::to_string(&entry("2024-01-01T00:00:00+00:00", None)).unwrap();
        fs::write(&path, format!("not json\n{good}\n{{}}\n")).unwrap();

        assert_eq!(QueryLog::new(&path).read_all().len(), 1);
    }

    #[test]
    fn window_filters_old_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = QueryLog::new(dir.path().join("log.jsonl"));
        log.record(&entry("2000-01-01T00:00:00+00:00", None));
        log.record(&entry(&Utc::now().to_rfc3339(), None));

        assert_eq!(log.read_since_days(None).len(), 2);
        assert_eq!(log.read_since_days(Some(7)).len(), 1);
    }

    #[test]
    fn missing_file_reads_empty() {
        let log = QueryLog::new("/nonexistent/dir/query-log.jsonl");
        assert!(log.read_all().is_empty());
    }

    #[test]
    fn fallback_reason_omitted_when_absent() {
        let json = serde_json::to_string(&entry("t", None)).unwrap();
        assert!(!json.contains("fallback_reason"));
    }
}
