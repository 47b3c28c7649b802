//! Data-quality scans: numeric outliers, duplicate rows, completeness and
//! coordinate validity.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, is_filled};

/// Tunable thresholds for the scans in this module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Outlier iff `|v - mean| > z_score_cutoff * stddev`.
    pub z_score_cutoff: f64,
    /// Severity is high iff `outliers > values * high_severity_ratio`.
    pub high_severity_ratio: f64,
    /// Rows sampled when deciding whether a field is numeric.
    pub numeric_sample_rows: usize,
    /// Share of sampled rows that must parse as numbers.
    pub numeric_field_ratio: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            z_score_cutoff: 2.0,
            high_severity_ratio: 0.1,
            numeric_sample_rows: 10,
            numeric_field_ratio: 0.7,
        }
    }
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Outliers found in one numeric field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierFinding {
    pub field: String,
    pub count: usize,
    pub values: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub severity: Severity,
}

impl OutlierFinding {
    pub fn description(&self) -> String {
        format!("{} statistical outliers detected in {}", self.count, self.field)
    }
}

/// Combined result of the "find issues" flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueReport {
    pub record_count: usize,
    pub coordinate_issues: usize,
    pub outliers: Vec<OutlierFinding>,
    pub duplicates: usize,
}

impl IssueReport {
    pub fn is_clean(&self) -> bool {
        self.coordinate_issues == 0 && self.outliers.is_empty() && self.duplicates == 0
    }

    /// One bullet per finding.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.coordinate_issues > 0 {
            lines.push(format!(
                "📍 {} records have missing or invalid coordinates",
                self.coordinate_issues
            ));
        }
        for o in &self.outliers {
            lines.push(format!("📈 {} ({} severity)", o.description(), o.severity));
        }
        if self.duplicates > 0 {
            lines.push(format!(
                "📑 {} duplicate records detected (medium severity)",
                self.duplicates
            ));
        }
        lines
    }

    pub fn render(&self) -> String {
        if self.record_count == 0 {
            return "I need data to check for issues. Please load your site data first.".to_string();
        }
        if self.is_clean() {
            return "✅ Good news! I didn't detect any obvious issues in your data.".to_string();
        }
        format!("⚠️ **Potential Issues Found**\n\n{}", self.lines().join("\n\n"))
    }
}

impl fmt::Display for IssueReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// ---------------------------------------------------------------------------
// Scans
// ---------------------------------------------------------------------------

/// Fields where at least `numeric_field_ratio` of the sampled rows parse as
/// finite numbers.
pub fn numeric_fields<'a>(dataset: &'a Dataset, settings: &AnalysisSettings) -> Vec<&'a str> {
    let sample = &dataset.records()[..dataset.len().min(settings.numeric_sample_rows)];
    if sample.is_empty() {
        return Vec::new();
    }
    let threshold = sample.len() as f64 * settings.numeric_field_ratio;

    dataset
        .headers()
        .into_iter()
        .filter(|field| {
            let numeric = sample.iter().filter(|r| r.number(field).is_some()).count();
            numeric as f64 >= threshold
        })
        .collect()
}

/// Population mean and standard deviation. `None` for an empty slice.
pub fn mean_std_dev(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Outlier scan over one list of values.
pub fn outliers_in(field: &str, values: &[f64], settings: &AnalysisSettings) -> Option<OutlierFinding> {
    let (mean, std_dev) = mean_std_dev(values)?;
    let cutoff = settings.z_score_cutoff * std_dev;
    let count = values.iter().filter(|v| (*v - mean).abs() > cutoff).count();
    if count == 0 {
        return None;
    }
    let severity = if count as f64 > values.len() as f64 * settings.high_severity_ratio {
        Severity::High
    } else {
        Severity::Medium
    };
    Some(OutlierFinding {
        field: field.to_string(),
        count,
        values: values.len(),
        mean,
        std_dev,
        severity,
    })
}

/// Outlier findings for every numeric field, unparsable values skipped.
pub fn detect_outliers(dataset: &Dataset, settings: &AnalysisSettings) -> Vec<OutlierFinding> {
    numeric_fields(dataset, settings)
        .into_iter()
        .filter_map(|field| {
            let values: Vec<f64> = dataset.records().iter().filter_map(|r| r.number(field)).collect();
            outliers_in(field, &values, settings)
        })
        .collect()
}

/// Number of records whose serialisation repeats an earlier record's.
pub fn count_duplicates(dataset: &Dataset) -> usize {
    let mut seen = HashSet::new();
    dataset
        .records()
        .iter()
        .filter(|r| !seen.insert(r.fingerprint()))
        .count()
}

/// Filled slots over total slots as a rounded percentage; 0 when empty.
pub fn completeness(dataset: &Dataset) -> u32 {
    let (total, filled) = dataset
        .records()
        .iter()
        .flat_map(|r| r.entries())
        .fold((0usize, 0usize), |(total, filled), (_, value)| {
            (total + 1, filled + usize::from(is_filled(value)))
        });
    if total == 0 {
        return 0;
    }
    (filled as f64 / total as f64 * 100.0).round() as u32
}

/// Latitude and longitude field names, if both exist.
pub fn coordinate_fields(dataset: &Dataset) -> Option<(&str, &str)> {
    let headers = dataset.headers();
    let lat = headers
        .iter()
        .copied()
        .find(|h| h.to_ascii_lowercase().contains("lat"))?;
    let lng = headers.iter().copied().find(|h| {
        let lower = h.to_ascii_lowercase();
        lower.contains("lng") || lower.contains("long")
    })?;
    Some((lat, lng))
}

/// Records whose coordinates are missing, unparsable or exactly zero.
pub fn coordinate_issues(dataset: &Dataset) -> usize {
    let Some((lat_field, lng_field)) = coordinate_fields(dataset) else {
        return 0;
    };
    dataset
        .records()
        .iter()
        .filter(|r| {
            let bad = |v: Option<f64>| v.is_none_or(|n| n == 0.0);
            bad(r.number(lat_field)) || bad(r.number(lng_field))
        })
        .count()
}

pub fn find_issues(dataset: &Dataset, settings: &AnalysisSettings) -> IssueReport {
    IssueReport {
        record_count: dataset.len(),
        coordinate_issues: coordinate_issues(dataset),
        outliers: detect_outliers(dataset, settings),
        duplicates: count_duplicates(dataset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;

    fn column(name: &str, values: &[f64]) -> Dataset {
        values
            .iter()
            .map(|v| Record::new().with(name, *v))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn uniform_values_have_no_outliers() {
        let ds = column("Speed", &[5.0, 5.0, 5.0, 5.0]);
        assert!(detect_outliers(&ds, &AnalysisSettings::default()).is_empty());
    }

    #[test]
    fn single_spike_is_medium_severity() {
        // mean 19, sd 27; |100-19| = 81 > 54. One outlier of ten is not > 1.0.
        let mut values = vec![10.0; 9];
        values.push(100.0);
        let found = detect_outliers(&column("Speed", &values), &AnalysisSettings::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].count, 1);
        assert_eq!(found[0].severity, Severity::Medium);
    }

    #[test]
    fn spike_in_small_sample_is_high_severity() {
        let values = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 100.0];
        let found = detect_outliers(&column("Latency", &values), &AnalysisSettings::default());
        assert_eq!(found[0].severity, Severity::High);
    }

    #[test]
    fn cutoff_is_strict() {
        // mean 28, population sd exactly 36: |100-28| = 72 is not > 72.
        let values = [10.0, 10.0, 10.0, 10.0, 100.0];
        let (mean, sd) = mean_std_dev(&values).unwrap();
        assert_eq!((mean, sd), (28.0, 36.0));
        assert!(outliers_in("x", &values, &AnalysisSettings::default()).is_none());
    }

    #[test]
    fn numeric_fields_use_sample_ratio() {
        let ds: Dataset = (0..10)
            .map(|i| {
                let bw = if i < 7 { format!("{i}") } else { "n/a".to_string() };
                let name = if i < 6 { format!("{i}") } else { "x".to_string() };
                Record::new().with("Bandwidth", bw).with("Name", name)
            })
            .collect::<Vec<_>>()
            .into();
        assert_eq!(numeric_fields(&ds, &AnalysisSettings::default()), vec!["Bandwidth"]);
    }

    #[test]
    fn duplicates_count_repeats_only() {
        let a = Record::new().with("Site", "A").with("Lat", 17.0);
        let b = Record::new().with("Site", "B").with("Lat", 16.0);
        let ds = Dataset::new(vec![a.clone(), b, a.clone(), a]);
        assert_eq!(count_duplicates(&ds), 2);
    }

    #[test]
    fn duplicates_ignore_original_index() {
        let ds = Dataset::new(vec![
            Record::new().with("_originalIndex", 0).with("a", 1).with("b", 2),
            Record::new().with("_originalIndex", 1).with("a", 1).with("b", 2),
            Record::new().with("_originalIndex", 2).with("a", 3).with("b", 4),
        ]);
        assert_eq!(count_duplicates(&ds), 1);
    }

    #[test]
    fn completeness_counts_blank_and_null_as_unfilled() {
        let ds = Dataset::new(vec![
            Record::new().with("a", "x").with("b", "  "),
            Record::new().with("a", serde_json::Value::Null).with("b", 0),
        ]);
        assert_eq!(completeness(&ds), 50);
        assert_eq!(completeness(&Dataset::empty()), 0);
    }

    #[test]
    fn coordinate_issue_rules() {
        let ds = Dataset::new(vec![
            Record::new().with("Latitude", "17.61").with("Longitude", "121.72"),
            Record::new().with("Latitude", "0").with("Longitude", "121.72"),
            Record::new().with("Latitude", "abc").with("Longitude", "121.72"),
            Record::new().with("Latitude", "17.2"),
        ]);
        assert_eq!(coordinate_issues(&ds), 3);
    }

    #[test]
    fn no_coordinate_fields_means_no_issues() {
        let ds = Dataset::new(vec![Record::new().with("Site", "A")]);
        assert_eq!(coordinate_issues(&ds), 0);
    }

    #[test]
    fn report_rendering() {
        let settings = AnalysisSettings::default();
        let clean = find_issues(&Dataset::new(vec![Record::new().with("Site", "A")]), &settings);
        assert!(clean.render().starts_with("✅"));

        let dup = Record::new().with("Site", "A");
        let dirty = find_issues(&Dataset::new(vec![dup.clone(), dup]), &settings);
        let text = dirty.render();
        assert!(text.starts_with("⚠️ **Potential Issues Found**"));
        assert!(text.contains("1 duplicate records detected"));

        assert!(find_issues(&Dataset::empty(), &settings).render().contains("load your site data"));
    }
}
