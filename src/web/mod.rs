//! JSON API server for the dashboard.
//!
//! A small sync HTTP server (`tiny_http`) exposing the dispatcher, the
//! loaded dataset and the analysis views. Requests are handled one at a
//! time on the calling thread, so a query that arrives while another is
//! running simply waits its turn.
//!
//! Launched via `site-tracker-ai serve` (default: `http://127.0.0.1:8765`).

pub mod api;

use std::io::Cursor;

use anyhow::Result;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info, warn};

pub use api::{ApiReply, AppState};

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Serve the API on `addr`. Blocks the current thread.
pub fn serve(addr: &str, mut state: AppState) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    info!(%addr, provider = %state.dispatcher.selection().provider_id, "site tracker API listening");

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            let mut buf = String::new();
            if let Err(e) = request.as_reader().read_to_string(&mut buf) {
                warn!(%method, %url, error = %e, "failed to read request body");
            }
            Some(buf)
        } else {
            None
        };

        let reply = route(&mut state, &method, &url, body.as_deref()).unwrap_or_else(|e| ApiReply {
            status: 500,
            body: serde_json::json!({ "error": format!("{e:#}") }).to_string(),
        });

        debug!(%method, %url, status = reply.status, "request handled");
        if let Err(e) = request.respond(to_response(reply)) {
            warn!(%url, error = %e, "failed to send response");
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch one request to its handler.
pub fn route(state: &mut AppState, method: &Method, url: &str, body: Option<&str>) -> Result<ApiReply> {
    let path = url.split('?').next().unwrap_or(url);
    let body = body.unwrap_or("");

    match (method, path) {
        (&Method::Post, "/api/query") => api::post_query(state, body),
        (&Method::Put, "/api/dataset") => api::put_dataset(state, body),

        (&Method::Get, "/api/stats") => api::get_stats(state),
        (&Method::Get, "/api/history") => api::get_history(state, url),

        (&Method::Get, "/api/selection") => api::get_selection(state),
        (&Method::Put, "/api/selection") => api::put_selection(state, body),
        (&Method::Get, "/api/providers") => api::get_providers(state),

        (&Method::Get, "/api/issues") => api::get_issues(state),
        (&Method::Get, "/api/insights") => api::get_insights(state),
        (&Method::Get, "/api/geo") => api::get_geo(state),

        (&Method::Get, "/api/health") => api::get_health(state),

        _ => Ok(ApiReply {
            status: 404,
            body: r#"{"error": "not found"}"#.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn to_response(reply: ApiReply) -> Response<Cursor<Vec<u8>>> {
    let response = Response::from_data(reply.body.into_bytes()).with_status_code(StatusCode(reply.status));
    match content_type_json() {
        Some(header) => response.with_header(header),
        None => response,
    }
}

fn content_type_json() -> Option<Header> {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::config::SiteTrackerConfig;
    use crate::dataset::Dataset;
    use crate::dispatch::Dispatcher;
    use crate::llm::RemoteAdapter;

    fn state() -> AppState {
        AppState::new(
            Dispatcher::new(RemoteAdapter::with_defaults(), Analyzer::default()),
            Dataset::empty(),
            SiteTrackerConfig::default(),
        )
    }

    #[test]
    fn unknown_route_is_404() {
        let reply = route(&mut state(), &Method::Get, "/nope", None).unwrap();
        assert_eq!(reply.status, 404);
    }

    #[test]
    fn query_string_is_ignored_for_matching() {
        let reply = route(&mut state(), &Method::Get, "/api/health?x=1", None).unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.json()["status"], "ok");
    }

    #[test]
    fn method_matters() {
        let reply = route(&mut state(), &Method::Get, "/api/query", None).unwrap();
        assert_eq!(reply.status, 404);
    }

    #[test]
    fn empty_dataset_views_render_placeholders() {
        let mut s = state();
        let issues = route(&mut s, &Method::Get, "/api/issues", None).unwrap().json();
        assert!(issues["text"].as_str().unwrap().contains("load your site data"));
        let geo = route(&mut s, &Method::Get, "/api/geo", None).unwrap().json();
        assert_eq!(geo["text"], "No data available for geographic analysis");
    }
}
