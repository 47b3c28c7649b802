//! Query classification.
//!
//! A query is matched against an ordered list of keyword patterns; the first
//! category whose pattern matches wins, and a query matching nothing is
//! [`Category::General`]. Patterns are substring matches, so `"stat"` also
//! fires on `"status"` and `"tech"` on `"technical"`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Analysis category selected for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Performance,
    Location,
    Connectivity,
    Technology,
    Provider,
    Issues,
    Statistics,
    Trends,
    General,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Self::Performance,
        Self::Location,
        Self::Connectivity,
        Self::Technology,
        Self::Provider,
        Self::Issues,
        Self::Statistics,
        Self::Trends,
        Self::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Location => "location",
            Self::Connectivity => "connectivity",
            Self::Technology => "technology",
            Self::Provider => "provider",
            Self::Issues => "issues",
            Self::Statistics => "statistics",
            Self::Trends => "trends",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered rules. Earlier entries take precedence.
static RULES: LazyLock<Vec<(Category, Regex)>> = LazyLock::new(|| {
    [
        (Category::Performance, r"performance|speed|latency|bandwidth|throughput"),
        (Category::Location, r"location|region|province|district|lgu|where|geographic"),
        (Category::Connectivity, r"connect|connection|link|network|internet|outage"),
        (Category::Technology, r"tech|technology|fiber|vsat|leo|satellite"),
        (Category::Provider, r"provider|isp|company|operator"),
        (Category::Issues, r"issue|problem|error|fault|down|offline|trouble"),
        (Category::Statistics, r"stat|statistics|count|total|average|summary"),
        (Category::Trends, r"trend|pattern|increase|decrease|growth|change"),
    ]
    .into_iter()
    .map(|(cat, pattern)| {
        let re = Regex::new(&format!("(?i){pattern}")).expect("category regex must compile");
        (cat, re)
    })
    .collect()
});

/// Classify a free-text query. Pure and total.
pub fn classify(query: &str) -> Category {
    RULES
        .iter()
        .find(|(_, re)| re.is_match(query))
        .map(|(cat, _)| *cat)
        .unwrap_or(Category::General)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        // "performance" (rule 1) beats "province" (rule 2).
        assert_eq!(classify("show performance by province"), Category::Performance);
        assert_eq!(classify("Where are the sites?"), Category::Location);
        assert_eq!(classify("any outage today"), Category::Connectivity);
        assert_eq!(classify("VSAT sites"), Category::Technology);
        assert_eq!(classify("which ISP is best"), Category::Provider);
        assert_eq!(classify("sites that are offline"), Category::Issues);
        assert_eq!(classify("give me a summary"), Category::Statistics);
        assert_eq!(classify("growth over time"), Category::Trends);
    }

    #[test]
    fn substring_matches_count() {
        assert_eq!(classify("network status"), Category::Connectivity);
        assert_eq!(classify("status report"), Category::Statistics);
    }

    #[test]
    fn unmatched_is_general() {
        assert_eq!(classify("hello"), Category::General);
        assert_eq!(classify(""), Category::General);
    }

    #[test]
    fn display_is_lowercase_name() {
        assert_eq!(Category::Statistics.to_string(), "statistics");
        assert_eq!(Category::ALL.len(), 9);
    }
}
