//! Local heuristic analyzer.
//!
//! Answers questions about the loaded dataset without any network access:
//! the query is classified by keyword ([`classifier`]), the matching
//! category scan runs over the records ([`findings`]), and the result is
//! rendered as a short markdown-ish report. The same inputs always produce
//! the same text.
//!
//! The separate "find issues" flow ([`anomaly`]) and the automated insights
//! ([`insights`]) are exposed here too so every surface goes through one
//! [`Analyzer`].

pub mod anomaly;
pub mod classifier;
pub mod findings;
pub mod insights;

pub use anomaly::{AnalysisSettings, IssueReport, OutlierFinding, Severity};
pub use classifier::{Category, classify};
pub use findings::Findings;
pub use insights::{Insights, Trend, predict_trend};

use crate::dataset::Dataset;
use crate::geo::{GeoReport, RegionProfile};

pub const HELP_TEXT: &str = "🤖 **AI Assistant Help**\n\n\
I can assist you with:\n\n\
📊 **Data Analysis**\n\
• \"Analyze my data\"\n\
• \"Show me performance trends\"\n\
• \"What patterns do you see?\"\n\n\
🔍 **Issue Detection**\n\
• \"Find problems in my data\"\n\
• \"Check for anomalies\"\n\
• \"Show connectivity issues\"\n\n\
📈 **Insights & Reports**\n\
• \"Generate insights\"\n\
• \"Create a summary\"\n\
• \"What should I focus on?\"\n\n\
📍 **Geographic Analysis**\n\
• \"Analyze by region\"\n\
• \"Show site distribution\"\n\
• \"Map coverage analysis\"\n\n\
Just ask me naturally - I'll understand and help! 😊";

/// Whether a query is asking what the assistant can do.
pub fn is_help_query(query: &str) -> bool {
    let lower = query.trim().to_lowercase();
    lower == "help" || lower == "?" || lower.contains("what can you do")
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    settings: AnalysisSettings,
    profile: RegionProfile,
}

impl Analyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            settings,
            profile: RegionProfile::region2(),
        }
    }

    pub fn with_profile(mut self, profile: RegionProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn profile(&self) -> &RegionProfile {
        &self.profile
    }

    pub fn classify(&self, query: &str) -> Category {
        classify(query)
    }

    /// Answer a query from the dataset alone.
    pub fn analyze(&self, query: &str, dataset: &Dataset) -> String {
        if is_help_query(query) {
            return HELP_TEXT.to_string();
        }
        let category = classify(query);
        let found = findings::analyze(category, dataset, &self.settings);
        format_report(query, &found)
    }

    pub fn find_issues(&self, dataset: &Dataset) -> IssueReport {
        anomaly::find_issues(dataset, &self.settings)
    }

    pub fn insights(&self, dataset: &Dataset) -> Insights {
        Insights::build(dataset, &self.settings, &self.profile)
    }

    pub fn geo_report(&self, dataset: &Dataset) -> GeoReport {
        GeoReport::build(dataset, &self.profile)
    }
}

/// Render findings under a title naming the query.
pub fn format_report(query: &str, found: &Findings) -> String {
    let mut out = format!("🔍 **Analysis Results for: \"{query}\"**\n\n");

    out.push_str("📊 **Findings:**\n");
    out.push_str(&found.summary);
    out.push_str("\n\n");
    if let Some(details) = &found.details {
        out.push_str(&format!("**Details:** {details}\n\n"));
    }

    if !found.insights.is_empty() {
        out.push_str(&format!("💡 **Insights:**\n{}\n\n", found.insights.join("\n")));
    }
    if !found.recommendations.is_empty() {
        out.push_str(&format!(
            "🚀 **Recommendations:**\n{}\n",
            found.recommendations.join("\n")
        ));
    }

    out
}
