use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::Category;
use crate::dispatch::SourceKind;

// ---------------------------------------------------------------------------
// Session usage counters
// ---------------------------------------------------------------------------

/// In-memory counters for the current session.
///
/// Owned by the dispatcher and updated exactly once per handled query.
#[derive(Debug, Clone)]
pub struct UsageTracker {
    started_at: DateTime<Utc>,
    total: u64,
    local: u64,
    remote: u64,
    by_category: BTreeMap<Category, u64>,
    by_provider: BTreeMap<String, u64>,
}

/// Snapshot returned to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub total_queries: u64,
    pub query_type_counts: BTreeMap<Category, u64>,
    pub provider_counts: BTreeMap<String, u64>,
    pub local_count: u64,
    pub remote_count: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_minutes: i64,
    pub average_queries_per_minute: f64,
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            total: 0,
            local: 0,
            remote: 0,
            by_category: BTreeMap::new(),
            by_provider: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, source: SourceKind, provider_id: &str, category: Category) {
        self.total += 1;
        match source {
            SourceKind::Local => self.local += 1,
            SourceKind::Remote => self.remote += 1,
        }
        *self.by_category.entry(category).or_default() += 1;
        *self.by_provider.entry(provider_id.to_string()).or_default() += 1;
    }

    pub fn stats(&self) -> UsageStats {
        self.stats_at(Utc::now())
    }

    /// Snapshot as of `now`; elapsed time below one minute counts as one.
    pub fn stats_at(&self, now: DateTime<Utc>) -> UsageStats {
        let elapsed_ms = (now - self.started_at).num_milliseconds().max(0) as f64;
        let elapsed_minutes = elapsed_ms / 60_000.0;

        UsageStats {
            total_queries: self.total,
            query_type_counts: self.by_category.clone(),
            provider_counts: self.by_provider.clone(),
            local_count: self.local,
            remote_count: self.remote,
            started_at: self.started_at,
            uptime_minutes: elapsed_minutes.round() as i64,
            average_queries_per_minute: self.total as f64 / elapsed_minutes.max(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn counts_partition_by_source() {
        let mut t = UsageTracker::new();
        t.record(SourceKind::Local, "local", Category::General);
        t.record(SourceKind::Remote, "openrouter", Category::Issues);
        t.record(SourceKind::Local, "openrouter", Category::Issues);

        let s = t.stats();
        assert_eq!(s.total_queries, 3);
        assert_eq!(s.local_count + s.remote_count, s.total_queries);
        assert_eq!(s.query_type_counts[&Category::Issues], 2);
        assert_eq!(s.provider_counts["openrouter"], 2);
    }

    #[test]
    fn rate_uses_at_least_one_minute() {
        let start = Utc::now();
        let mut t = UsageTracker::started_at(start);
        for _ in 0..6 {
            t.record(SourceKind::Local, "local", Category::General);
        }

        let early = t.stats_at(start + Duration::seconds(20));
        assert_eq!(early.uptime_minutes, 0);
        assert_eq!(early.average_queries_per_minute, 6.0);

        let later = t.stats_at(start + Duration::minutes(3));
        assert_eq!(later.uptime_minutes, 3);
        assert_eq!(later.average_queries_per_minute, 2.0);
    }

    #[test]
    fn stats_serialize_with_lowercase_categories() {
        let mut t = UsageTracker::new();
        t.record(SourceKind::Local, "local", Category::Statistics);
        let json = serde_json::to_value(t.stats()).unwrap();
        assert_eq!(json["query_type_counts"]["statistics"], 1);
    }
}
