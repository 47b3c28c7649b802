//! JSON API handlers.
//!
//! Handlers work on [`AppState`] and return an [`ApiReply`]; the server
//! loop turns replies into `tiny_http` responses.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::analytics::reporter;
use crate::config::{self, SiteTrackerConfig};
use crate::dataset::Dataset;
use crate::dispatch::{Dispatcher, ProviderSelection};
use crate::llm::registry::OPENROUTER_MODELS;
use crate::llm::{ProviderError, Secret};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything the server owns between requests.
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub dataset: Dataset,
    pub config: SiteTrackerConfig,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, dataset: Dataset, config: SiteTrackerConfig) -> Self {
        Self {
            dispatcher,
            dataset,
            config,
        }
    }
}

/// Status code plus a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: String,
}

impl ApiReply {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

/// `PUT /api/selection` body. A missing key falls back to the configured one.
#[derive(Deserialize)]
struct SelectionRequest {
    provider_id: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    model_id: Option<String>,
}

#[derive(Serialize)]
struct SelectionResponse<'a> {
    provider_id: &'a str,
    model_id: Option<&'a str>,
    key_present: bool,
    api_key: Option<&'a Secret>,
    state: String,
}

#[derive(Serialize)]
struct ProviderResponse<'a> {
    id: &'a str,
    display_name: &'a str,
    endpoint: &'a str,
    default_model: &'a str,
    remote: bool,
    conversational: bool,
    key_configured: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn json_reply<T: Serialize>(status: u16, data: &T) -> Result<ApiReply> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(ApiReply { status, body })
}

fn error_reply(status: u16, message: impl std::fmt::Display) -> Result<ApiReply> {
    json_reply(status, &json!({ "error": message.to_string() }))
}

/// Parse the `?days=N` query parameter from a URL.
fn parse_days_param(url: &str) -> Option<u32> {
    url.split('?').nth(1)?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == "days" { v.parse().ok() } else { None }
    })
}

fn provider_error_reply(e: &ProviderError) -> Result<ApiReply> {
    json_reply(400, &json!({ "error": e.to_string(), "kind": e.kind() }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /api/query` with `{"query": "..."}`.
pub fn post_query(state: &mut AppState, body: &str) -> Result<ApiReply> {
    let Ok(req) = serde_json::from_str::<QueryRequest>(body) else {
        return error_reply(400, "expected JSON body {\"query\": \"...\"}");
    };
    if req.query.trim().is_empty() {
        return error_reply(400, "query must not be empty");
    }

    match state.dispatcher.handle_query(&req.query, &state.dataset) {
        Ok(result) => json_reply(200, &result),
        Err(e) => provider_error_reply(&e),
    }
}

/// `PUT /api/dataset` with a record array or a `{"values": [...]}` sheet.
pub fn put_dataset(state: &mut AppState, body: &str) -> Result<ApiReply> {
    match Dataset::from_json_str(body) {
        Ok(dataset) => {
            state.dataset = dataset;
            json_reply(
                200,
                &json!({ "records": state.dataset.len(), "fields": state.dataset.headers() }),
            )
        }
        Err(e) => error_reply(400, format!("{e:#}")),
    }
}

/// `GET /api/stats`: live session counters.
pub fn get_stats(state: &AppState) -> Result<ApiReply> {
    let d = &state.dispatcher;
    json_reply(
        200,
        &json!({
            "usage": d.usage_stats(),
            "state": d.state().to_string(),
            "last_fallback": d.last_fallback().map(|e| json!({ "kind": e.kind(), "message": e.to_string() })),
        }),
    )
}

/// `GET /api/history?days=N`: aggregated query log.
pub fn get_history(state: &AppState, url: &str) -> Result<ApiReply> {
    let Some(log) = state.dispatcher.query_log() else {
        return json_reply(200, &reporter::HistoryStats::default());
    };
    json_reply(200, &reporter::compute_stats(log, parse_days_param(url)))
}

pub fn get_selection(state: &AppState) -> Result<ApiReply> {
    let d = &state.dispatcher;
    let s = d.selection();
    json_reply(
        200,
        &SelectionResponse {
            provider_id: &s.provider_id,
            model_id: s.model_id.as_deref(),
            key_present: s.has_usable_key(),
            api_key: s.api_key.as_ref(),
            state: d.state().to_string(),
        },
    )
}

pub fn put_selection(state: &mut AppState, body: &str) -> Result<ApiReply> {
    let Ok(req) = serde_json::from_str::<SelectionRequest>(body) else {
        return error_reply(400, "expected JSON body {\"provider_id\": \"...\"}");
    };

    let api_key = req
        .api_key
        .filter(|k| !k.trim().is_empty())
        .map(Secret::new)
        .or_else(|| config::api_key_for(&state.config, &req.provider_id));
    let model_id = req.model_id.filter(|m| !m.trim().is_empty());

    match state
        .dispatcher
        .configuration_changed(ProviderSelection::remote(req.provider_id, api_key, model_id))
    {
        Ok(()) => get_selection(state),
        Err(e) => provider_error_reply(&e),
    }
}

pub fn get_providers(state: &AppState) -> Result<ApiReply> {
    let providers: Vec<ProviderResponse<'_>> = state
        .dispatcher
        .adapter()
        .registry()
        .providers()
        .iter()
        .map(|p| ProviderResponse {
            id: &p.id,
            display_name: &p.display_name,
            endpoint: &p.endpoint,
            default_model: &p.default_model,
            remote: p.is_remote(),
            conversational: p.conversational,
            key_configured: config::api_key_for(&state.config, &p.id).is_some_and(|k| k.is_usable()),
        })
        .collect();

    json_reply(
        200,
        &json!({ "providers": providers, "openrouter_models": OPENROUTER_MODELS }),
    )
}

pub fn get_issues(state: &AppState) -> Result<ApiReply> {
    let report = state.dispatcher.analyzer().find_issues(&state.dataset);
    json_reply(200, &json!({ "report": report, "text": report.render() }))
}

pub fn get_insights(state: &AppState) -> Result<ApiReply> {
    let insights = state.dispatcher.analyzer().insights(&state.dataset);
    json_reply(200, &json!({ "insights": insights, "text": insights.render() }))
}

pub fn get_geo(state: &AppState) -> Result<ApiReply> {
    let report = state.dispatcher.analyzer().geo_report(&state.dataset);
    json_reply(200, &json!({ "report": report, "text": report.render() }))
}

pub fn get_health(state: &AppState) -> Result<ApiReply> {
    json_reply(
        200,
        &json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "provider": state.dispatcher.selection().provider_id,
            "records": state.dataset.len(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
