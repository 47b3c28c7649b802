//! Per-category dataset scans behind the local answers.
//!
//! Each function inspects the first record's field names for keywords and
//! summarises what it finds. None of them panic on empty input.

use super::anomaly::{AnalysisSettings, completeness, coordinate_issues};
use super::classifier::Category;
use super::insights::{describe_trend, field_trends};
use crate::dataset::Dataset;

/// Result of one category scan, before formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Findings {
    pub summary: String,
    pub details: Option<String>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Findings {
    fn new(summary: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            details: Some(details.into()),
            ..Self::default()
        }
    }

    fn summary_only(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }
}

pub const PERFORMANCE_HINTS: &[&str] = &["speed", "bandwidth", "latency", "performance"];
pub const LOCATION_HINTS: &[&str] = &["location", "address", "province", "district", "lgu", "region"];
pub const CONNECTIVITY_HINTS: &[&str] = &["connect", "link", "network", "status"];
pub const TECHNOLOGY_HINTS: &[&str] = &["tech", "type", "service"];
pub const PROVIDER_HINTS: &[&str] = &["provider", "company", "operator"];

pub fn analyze(category: Category, dataset: &Dataset, settings: &AnalysisSettings) -> Findings {
    if dataset.is_empty() {
        let subject = match category {
            Category::Statistics => "statistical",
            other => other.as_str(),
        };
        return Findings::summary_only(format!("No data available for {subject} analysis"));
    }
    match category {
        Category::Performance => performance(dataset),
        Category::Location => location(dataset),
        Category::Connectivity => connectivity(dataset),
        Category::Technology => technology(dataset),
        Category::Provider => provider(dataset),
        Category::Issues => issues(dataset),
        Category::Statistics => statistics(dataset),
        Category::Trends => trends(dataset, settings),
        Category::General => general(dataset),
    }
}

fn performance(dataset: &Dataset) -> Findings {
    let fields = dataset.headers_matching(PERFORMANCE_HINTS);
    let details = if fields.is_empty() {
        "No specific performance metrics detected in the current dataset".to_string()
    } else {
        format!("Performance metrics available: {}", fields.join(", "))
    };
    Findings::new(
        format!("Found {} performance-related fields in your data", fields.len()),
        details,
    )
}

fn location(dataset: &Dataset) -> Findings {
    let fields = dataset.headers_matching(LOCATION_HINTS);
    let unique = dataset.distinct_values(&fields);
    Findings::new(
        format!("Geographic data spans {} unique locations", unique.len()),
        format!("Location fields: {}", fields.join(", ")),
    )
}

fn connectivity(dataset: &Dataset) -> Findings {
    let fields = dataset.headers_matching(CONNECTIVITY_HINTS);
    let details = if fields.is_empty() {
        "No specific connectivity fields detected".to_string()
    } else {
        format!("Connectivity fields: {}", fields.join(", "))
    };
    Findings::new(
        format!("Connectivity analysis across {} related fields", fields.len()),
        details,
    )
}

fn technology(dataset: &Dataset) -> Findings {
    let fields = dataset.headers_matching(TECHNOLOGY_HINTS);
    let techs = dataset.distinct_values(&fields);
    Findings::new(
        format!("Technology analysis reveals {} different technology types", techs.len()),
        format!("Technologies detected: {}", techs.join(", ")),
    )
}

fn provider(dataset: &Dataset) -> Findings {
    let fields = dataset.headers_matching(PROVIDER_HINTS);
    let providers = dataset.distinct_values(&fields);
    Findings::new(
        format!("Provider analysis shows {} different service providers", providers.len()),
        format!("Providers: {}", providers.join(", ")),
    )
}

fn issues(dataset: &Dataset) -> Findings {
    let bad = coordinate_issues(dataset);
    let mut findings = Findings::new(
        format!("Issue detection complete: {bad} records with coordinate issues"),
        if bad > 0 {
            format!("{bad} records have missing or invalid coordinates")
        } else {
            "No major data quality issues detected".to_string()
        },
    );
    if bad > 0 {
        findings
            .recommendations
            .push("• Verify latitude/longitude values for the flagged records".to_string());
    }
    findings
}

fn statistics(dataset: &Dataset) -> Findings {
    Findings::new(
        format!(
            "Statistical Overview: {} records across {} fields with {}% data completeness",
            dataset.len(),
            dataset.headers().len(),
            completeness(dataset)
        ),
        "Data contains comprehensive information suitable for analysis and reporting",
    )
}

fn trends(dataset: &Dataset, settings: &AnalysisSettings) -> Findings {
    match field_trends(dataset, settings) {
        Some(trends) if !trends.is_empty() => {
            let mut findings = Findings::new(
                format!("Trend analysis across {} numeric fields", trends.len()),
                format!(
                    "Fitted a least-squares line over {} records in record order",
                    dataset.len()
                ),
            );
            findings.insights = trends.iter().map(|t| format!("• {}", describe_trend(t))).collect();
            findings
        }
        _ => Findings::new(
            "Trend analysis requires time-series data",
            "Consider adding timestamp fields to enable comprehensive trend analysis",
        ),
    }
}

fn general(dataset: &Dataset) -> Findings {
    Findings::new(
        format!("General dataset analysis: {} total records available", dataset.len()),
        "Dataset is ready for filtering, mapping, and detailed analysis through the dashboard interface",
    )
}
