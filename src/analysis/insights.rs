//! Automated dataset insights and the linear trend predictor.

use serde::Serialize;

use super::anomaly::{AnalysisSettings, completeness, coordinate_fields, numeric_fields};
use crate::dataset::Dataset;
use crate::geo::{self, RegionProfile};

/// Header substrings that mark a time-like column.
pub const TIME_FIELD_HINTS: &[&str] = &["date", "time", "timestamp", "month", "year", "period"];

/// Least-squares line through `(i, values[i])`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
    /// Extrapolated value at `x = n`.
    pub next_value: f64,
}

impl Trend {
    pub fn direction(&self) -> &'static str {
        if self.slope > 0.0 {
            "increasing"
        } else if self.slope < 0.0 {
            "decreasing"
        } else {
            "flat"
        }
    }
}

/// Fit a line over record order. `None` for fewer than two points.
pub fn predict_trend(values: &[f64]) -> Option<Trend> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_xx: f64 = (0..n).map(|i| (i * i) as f64).sum();

    let denom = nf * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return None;
    }
    let slope = (nf * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / nf;
    Some(Trend {
        slope,
        intercept,
        next_value: slope * nf + intercept,
    })
}

/// Trend per numeric field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldTrend {
    pub field: String,
    pub trend: Trend,
}

/// Trends for every numeric, non-time field, when a time-like field exists.
///
/// Returns `None` when the dataset has no time-like column.
pub fn field_trends(dataset: &Dataset, settings: &AnalysisSettings) -> Option<Vec<FieldTrend>> {
    let time_fields = dataset.headers_matching(TIME_FIELD_HINTS);
    if time_fields.is_empty() {
        return None;
    }
    let trends = numeric_fields(dataset, settings)
        .into_iter()
        .filter(|f| !time_fields.contains(f))
        .filter_map(|field| {
            let values: Vec<f64> = dataset.records().iter().filter_map(|r| r.number(field)).collect();
            predict_trend(&values).map(|trend| FieldTrend {
                field: field.to_string(),
                trend,
            })
        })
        .collect();
    Some(trends)
}

pub fn describe_trend(t: &FieldTrend) -> String {
    format!(
        "{} is {} (slope {:.2} per record, next value ≈ {:.2})",
        t.field,
        t.trend.direction(),
        t.trend.slope,
        t.trend.next_value
    )
}

// ---------------------------------------------------------------------------
// Automated insights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub quality_score: u32,
    pub record_count: usize,
    pub field_count: usize,
    pub has_coordinates: bool,
    pub geographic: Option<String>,
    pub trends: Vec<FieldTrend>,
}

impl Insights {
    pub fn build(dataset: &Dataset, settings: &AnalysisSettings, profile: &RegionProfile) -> Self {
        let sites = geo::extract_sites(dataset, profile);
        let geographic = geo::dominant_province(&sites).map(|p| {
            format!(
                "🗺️ {} of {} records map inside {}; concentrated in {p}",
                sites.len(),
                dataset.len(),
                profile.name
            )
        });

        Self {
            quality_score: completeness(dataset),
            record_count: dataset.len(),
            field_count: dataset.headers().len(),
            has_coordinates: coordinate_fields(dataset).is_some(),
            geographic,
            trends: field_trends(dataset, settings).unwrap_or_default(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("📊 Data Quality Score: {}%", self.quality_score),
            format!(
                "📁 {} records across {} fields",
                self.record_count, self.field_count
            ),
            format!(
                "📍 Map Integration: {}",
                if self.has_coordinates { "Available" } else { "Not Available" }
            ),
        ];
        lines.extend(self.geographic.iter().cloned());
        lines.extend(self.trends.iter().map(|t| format!("📈 {}", describe_trend(t))));
        lines
    }

    pub fn render(&self) -> String {
        if self.record_count == 0 {
            return "I need data to generate insights. Please load your site data first.".to_string();
        }
        format!("💡 **Key Insights**\n\n{}", self.lines().join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;

    #[test]
    fn predictor_fits_a_line() {
        let t = predict_trend(&[1.0, 3.0, 5.0, 7.0]).unwrap();
        assert_eq!(t.slope, 2.0);
        assert_eq!(t.intercept, 1.0);
        assert_eq!(t.next_value, 9.0);
        assert_eq!(t.direction(), "increasing");
    }

    #[test]
    fn predictor_needs_two_points() {
        assert!(predict_trend(&[]).is_none());
        assert!(predict_trend(&[4.0]).is_none());
    }

    #[test]
    fn trends_require_time_field() {
        let settings = AnalysisSettings::default();
        let no_time = Dataset::new(vec![
            Record::new().with("Speed", 1),
            Record::new().with("Speed", 2),
        ]);
        assert!(field_trends(&no_time, &settings).is_none());

        let with_time = Dataset::new(vec![
            Record::new().with("Month", "2024-01").with("Speed", 10),
            Record::new().with("Month", "2024-02").with("Speed", 8),
            Record::new().with("Month", "2024-03").with("Speed", 6),
        ]);
        let trends = field_trends(&with_time, &settings).unwrap();
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].field, "Speed");
        assert_eq!(trends[0].trend.direction(), "decreasing");
    }

    #[test]
    fn insights_for_empty_dataset() {
        let i = Insights::build(&Dataset::empty(), &AnalysisSettings::default(), &RegionProfile::region2());
        assert_eq!(i.quality_score, 0);
        assert!(i.render().contains("load your site data"));
    }

    #[test]
    fn insights_lines_mention_quality_and_map() {
        let ds = Dataset::new(vec![
            Record::new().with("Lat", "17.61").with("Lng", "121.72"),
            Record::new().with("Lat", "").with("Lng", "121.70"),
        ]);
        let i = Insights::build(&ds, &AnalysisSettings::default(), &RegionProfile::region2());
        let lines = i.lines();
        assert_eq!(lines[0], "📊 Data Quality Score: 75%");
        assert_eq!(lines[2], "📍 Map Integration: Available");
        assert!(lines[3].contains("concentrated in Isabela"));
    }
}
