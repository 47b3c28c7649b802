//! Dispatch decision types.
//!
//! Defines what the dispatcher decided for a query and what it handed back.

use std::fmt;

use serde::Serialize;

use crate::analysis::Category;

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Who produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Local heuristic analyzer, no network.
    Local,
    /// A remote chat provider.
    Remote,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Which path new queries start on. Derived from the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatchState {
    UsingLocal,
    UsingRemote,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsingLocal => write!(f, "using local analyzer"),
            Self::UsingRemote => write!(f, "using remote provider"),
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub source: SourceKind,
    /// The selected provider, even when the local analyzer answered.
    pub provider_id: String,
    pub text: String,
    /// True only for a successful remote answer.
    pub enhanced: bool,
    pub category: Category,
    /// Error kind of a suppressed remote failure.
    pub fallback_reason: Option<String>,
}

impl QueryResult {
    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_display_matches_serde() {
        assert_eq!(SourceKind::Local.to_string(), "local");
        assert_eq!(serde_json::to_value(SourceKind::Remote).unwrap(), "remote");
    }
}
