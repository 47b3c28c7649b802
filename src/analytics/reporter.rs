//! History reporter: aggregates the JSONL query log.
//!
//! Answers "how have queries been handled": local vs remote split, fallback
//! rate, per-provider latency and per-category volume, plus a daily trend.

use std::collections::HashMap;

use serde::Serialize;

use crate::analysis::Category;
use crate::analytics::logger::{QueryLog, QueryLogEntry};

// ---------------------------------------------------------------------------
// Aggregated stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryStats {
    pub total_queries: usize,
    pub local: usize,
    pub remote: usize,
    /// Queries where a remote call failed and the local analyzer answered.
    pub fallbacks: usize,
    pub provider_stats: Vec<ProviderStat>,
    pub category_stats: Vec<CategoryStat>,
}

impl HistoryStats {
    pub fn pct(&self, count: usize) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            (count as f64 / self.total_queries as f64) * 100.0
        }
    }
}

/// Per selected-provider aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStat {
    pub provider: String,
    pub count: usize,
    pub remote: usize,
    pub fallbacks: usize,
    pub avg_latency_ms: u64,
    /// Most frequent fallback error kind, if any.
    pub top_fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryStat {
    pub category: Category,
    pub count: usize,
}

/// A single day of history.
#[derive(Debug, Clone, Serialize)]
pub struct TrendEntry {
    pub date: String,
    pub queries: usize,
    pub remote: usize,
    pub fallbacks: usize,
}

// ---------------------------------------------------------------------------
// Stats computation
// ---------------------------------------------------------------------------

pub fn compute_stats(log: &QueryLog, days: Option<u32>) -> HistoryStats {
    build_stats(&log.read_since_days(days))
}

pub fn build_stats(entries: &[QueryLogEntry]) -> HistoryStats {
    if entries.is_empty() {
        return HistoryStats::default();
    }

    let remote = entries.iter().filter(|e| e.source == "remote").count();

    HistoryStats {
        total_queries: entries.len(),
        local: entries.len() - remote,
        remote,
        fallbacks: entries.iter().filter(|e| e.is_fallback()).count(),
        provider_stats: compute_provider_stats(entries),
        category_stats: compute_category_stats(entries),
    }
}

/// Sorted by query count descending, then provider id.
fn compute_provider_stats(entries: &[QueryLogEntry]) -> Vec<ProviderStat> {
    let mut groups: HashMap<&str, Vec<&QueryLogEntry>> = HashMap::new();
    for entry in entries {
        groups.entry(entry.provider.as_str()).or_default().push(entry);
    }

    let mut stats: Vec<ProviderStat> = groups
        .into_iter()
        .map(|(provider, group)| {
            let count = group.len();
            let total_latency: u64 = group.iter().map(|e| e.latency_ms).sum();

            let mut reasons: HashMap<&str, usize> = HashMap::new();
            for reason in group.iter().filter_map(|e| e.fallback_reason.as_deref()) {
                *reasons.entry(reason).or_default() += 1;
            }
            let top_fallback_reason = reasons
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(reason, _)| reason.to_string());

            ProviderStat {
                provider: provider.to_string(),
                count,
                remote: group.iter().filter(|e| e.source == "remote").count(),
                fallbacks: group.iter().filter(|e| e.is_fallback()).count(),
                avg_latency_ms: total_latency / count as u64,
                top_fallback_reason,
            }
        })
        .collect();

    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.provider.cmp(&b.provider)));
    stats
}

fn compute_category_stats(entries: &[QueryLogEntry]) -> Vec<CategoryStat> {
    let mut counts: HashMap<Category, usize> = HashMap::new();
    for entry in entries {
        *counts.entry(entry.category).or_default() += 1;
    }

    let mut stats: Vec<CategoryStat> = counts
        .into_iter()
        .map(|(category, count)| CategoryStat { category, count })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    stats
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

/// Daily totals over the last `days` days, oldest first.
pub fn compute_trends(log: &QueryLog, days: u32) -> Vec<TrendEntry> {
    build_trends(&log.read_since_days(Some(days)))
}

pub fn build_trends(entries: &[QueryLogEntry]) -> Vec<TrendEntry> {
    let mut daily: HashMap<String, Vec<&QueryLogEntry>> = HashMap::new();
    for entry in entries {
        let date = entry.timestamp.get(..10).unwrap_or("unknown").to_string();
        daily.entry(date).or_default().push(entry);
    }

    let mut trends: Vec<TrendEntry> = daily
        .into_iter()
        .map(|(date, group)| TrendEntry {
            date,
            queries: group.len(),
            remote: group.iter().filter(|e| e.source == "remote").count(),
            fallbacks: group.iter().filter(|e| e.is_fallback()).count(),
        })
        .collect();

    trends.sort_by(|a, b| a.date.cmp(&b.date));
    trends
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(day: &str, provider: &str, source: &str, category: Category, fallback: Option<&str>, latency_ms: u64) -> QueryLogEntry {
        QueryLogEntry {
            timestamp: format!("2025-01-{day}T10:00:00+00:00"),
            category,
            provider: provider.to_string(),
            source: source.to_string(),
            enhanced: source == "remote",
            latency_ms,
            fallback_reason: fallback.map(str::to_string),
        }
    }

    fn sample_entries() -> Vec<QueryLogEntry> {
        vec![
            entry("15", "local", "local", Category::Issues, None, 2),
            entry("15", "openrouter", "remote", Category::Location, None, 800),
            entry("15", "openrouter", "local", Category::Issues, Some("network"), 400),
            entry("16", "openrouter", "local", Category::General, Some("network"), 300),
            entry("16", "deepseek", "local", Category::Issues, Some("missing_api_key"), 0),
        ]
    }

    #[test]
    fn totals_and_split() {
        let stats = build_stats(&sample_entries());
        assert_eq!(stats.total_queries, 5);
        assert_eq!(stats.local, 4);
        assert_eq!(stats.remote, 1);
        assert_eq!(stats.fallbacks, 3);
        assert_eq!(stats.pct(stats.remote), 20.0);
    }

    #[test]
    fn provider_grouping() {
        let stats = build_stats(&sample_entries());
        let first = &stats.provider_stats[0];
        assert_eq!(first.provider, "openrouter");
        assert_eq!(first.count, 3);
        assert_eq!(first.remote, 1);
        assert_eq!(first.fallbacks, 2);
        assert_eq!(first.avg_latency_ms, 500);
        assert_eq!(first.top_fallback_reason.as_deref(), Some("network"));
    }

    #[test]
    fn category_ordering() {
        let stats = build_stats(&sample_entries());
        assert_eq!(stats.category_stats[0].category, Category::Issues);
        assert_eq!(stats.category_stats[0].count, 3);
    }

    #[test]
    fn empty_history() {
        let stats = build_stats(&[]);
        assert_eq!(stats.total_queries, 0);
        assert_eq!(stats.pct(0), 0.0);
        assert!(stats.provider_stats.is_empty());
    }

    #[test]
    fn trends_are_daily_and_sorted() {
        let trends = build_trends(&sample_entries());
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].date, "2025-01-15");
        assert_eq!(trends[0].queries, 3);
        assert_eq!(trends[0].remote, 1);
        assert_eq!(trends[1].fallbacks, 2);
    }
}
