/// Dispatcher: the single entry point for dashboard questions.
///
/// ```text
///  query ──▶ registry lookup ──▶ local?  ──▶ Analyzer ─────────────┐
///                 │                                               │
///                 │ unknown id → Err       remote ─▶ RemoteAdapter ┤
///                 ▼                           │ any failure        │
///                                             └──▶ Analyzer ───────┤
///                                                                 ▼
///                                    UsageTracker + query log ◀── QueryResult
/// ```
///
/// Remote failures never reach the caller. They are logged, kept in
/// [`Dispatcher::last_fallback`] and named in [`QueryResult::fallback_reason`],
/// and the local analyzer answers instead. Only an unknown provider id is an
/// error.
pub mod decision;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::Analyzer;
use crate::analytics::{QueryLog, QueryLogEntry, UsageStats, UsageTracker};
use crate::dataset::Dataset;
use crate::llm::{LOCAL_PROVIDER, ProviderError, RemoteAdapter, RemoteCall, Secret};

pub use decision::{DispatchState, QueryResult, SourceKind};

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// What the user picked in the provider panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSelection {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

fn default_provider_id() -> String {
    LOCAL_PROVIDER.to_string()
}

impl Default for ProviderSelection {
    fn default() -> Self {
        Self::local()
    }
}

impl ProviderSelection {
    pub fn local() -> Self {
        Self {
            provider_id: default_provider_id(),
            api_key: None,
            model_id: None,
        }
    }

    pub fn remote(provider_id: impl Into<String>, api_key: Option<Secret>, model_id: Option<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            api_key,
            model_id,
        }
    }

    pub fn has_usable_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(Secret::is_usable)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    adapter: RemoteAdapter,
    analyzer: Analyzer,
    selection: ProviderSelection,
    tracker: UsageTracker,
    query_log: Option<QueryLog>,
    last_fallback: Option<ProviderError>,
}

impl Dispatcher {
    /// Starts on the local analyzer with fresh counters.
    pub fn new(adapter: RemoteAdapter, analyzer: Analyzer) -> Self {
        Self {
            adapter,
            analyzer,
            selection: ProviderSelection::local(),
            tracker: UsageTracker::new(),
            query_log: None,
            last_fallback: None,
        }
    }

    pub fn with_query_log(mut self, log: QueryLog) -> Self {
        self.query_log = Some(log);
        self
    }

    pub fn with_tracker(mut self, tracker: UsageTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Answer a query, returning only the text.
    pub fn dispatch(&mut self, query: &str, dataset: &Dataset) -> Result<String, ProviderError> {
        self.handle_query(query, dataset).map(|r| r.text)
    }

    /// Answer a query from the selected provider, falling back to the local
    /// analyzer on any remote failure.
    pub fn handle_query(&mut self, query: &str, dataset: &Dataset) -> Result<QueryResult, ProviderError> {
        let started = Instant::now();
        let provider = self.adapter.registry().lookup(&self.selection.provider_id)?;
        let provider_id = provider.id.clone();
        let category = self.analyzer.classify(query);

        let (source, text, failure) = if !provider.is_remote() {
            (SourceKind::Local, self.analyzer.analyze(query, dataset), None)
        } else {
            let call = RemoteCall {
                message: query,
                api_key: self.selection.api_key.as_ref(),
                model: self.selection.model_id.as_deref(),
                dataset: Some(dataset),
            };
            match self.adapter.call_provider(provider, &call) {
                Ok(reply) => (SourceKind::Remote, reply, None),
                Err(e) => {
                    warn!(provider = %provider_id, kind = e.kind(), error = %e, "remote provider failed, answering locally");
                    (SourceKind::Local, self.analyzer.analyze(query, dataset), Some(e))
                }
            }
        };

        let result = QueryResult {
            source,
            provider_id,
            text,
            enhanced: source == SourceKind::Remote,
            category,
            fallback_reason: failure.as_ref().map(|e| e.kind().to_string()),
        };
        if failure.is_some() {
            self.last_fallback = failure;
        }

        self.tracker.record(result.source, &result.provider_id, result.category);
        if let Some(log) = &self.query_log {
            let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            log.record(&QueryLogEntry::from_result(&result, latency_ms));
        }

        Ok(result)
    }

    /// Apply a new selection. Unknown provider ids are rejected and the
    /// current selection is kept.
    pub fn configuration_changed(&mut self, selection: ProviderSelection) -> Result<(), ProviderError> {
        let provider = self.adapter.registry().lookup(&selection.provider_id)?;
        let provider_id = provider.id.clone();

        info!(
            provider = %provider_id,
            model = selection.model_id.as_deref().unwrap_or(provider.default_model.as_str()),
            key_present = selection.has_usable_key(),
            "provider selection changed"
        );

        self.selection = ProviderSelection {
            provider_id,
            ..selection
        };
        Ok(())
    }

    pub fn state(&self) -> DispatchState {
        let remote = self
            .adapter
            .registry()
            .lookup(&self.selection.provider_id)
            .is_ok_and(|p| p.is_remote());
        if remote {
            DispatchState::UsingRemote
        } else {
            DispatchState::UsingLocal
        }
    }

    pub fn selection(&self) -> &ProviderSelection {
        &self.selection
    }

    pub fn usage_stats(&self) -> UsageStats {
        self.tracker.stats()
    }

    /// The most recent remote error that was answered locally instead.
    pub fn last_fallback(&self) -> Option<&ProviderError> {
        self.last_fallback.as_ref()
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn adapter(&self) -> &RemoteAdapter {
        &self.adapter
    }

    pub fn query_log(&self) -> Option<&QueryLog> {
        self.query_log.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_dispatcher() -> Dispatcher {
        Dispatcher::new(RemoteAdapter::with_defaults(), Analyzer::default())
    }

    #[test]
    fn starts_local() {
        let d = local_dispatcher();
        assert_eq!(d.state(), DispatchState::UsingLocal);
        assert_eq!(d.selection().provider_id, "local");
        assert!(d.last_fallback().is_none());
    }

    #[test]
    fn selection_id_is_canonicalised() {
        let mut d = local_dispatcher();
        d.configuration_changed(ProviderSelection::remote(" OpenRouter ", None, None))
            .unwrap();
        assert_eq!(d.selection().provider_id, "openrouter");
        assert_eq!(d.state(), DispatchState::UsingRemote);
    }

    #[test]
    fn unknown_selection_keeps_previous() {
        let mut d = local_dispatcher();
        let err = d
            .configuration_changed(ProviderSelection::remote("mystery", None, None))
            .unwrap_err();
        assert_eq!(err, ProviderError::UnknownProvider("mystery".into()));
        assert_eq!(d.selection().provider_id, "local");
    }

    #[test]
    fn selection_deserializes_with_defaults() {
        let s: ProviderSelection = serde_json::from_str("{}").unwrap();
        assert_eq!(s, ProviderSelection::local());

        let s: ProviderSelection =
            serde_json::from_str(r#"{"provider_id":"deepseek","api_key":"sk-abcdefghijklmnop"}"#).unwrap();
        assert!(s.has_usable_key());
        let shown = serde_json::to_string(&s).unwrap();
        assert!(!shown.contains("sk-abcdefghijklmnop"));
    }
}
