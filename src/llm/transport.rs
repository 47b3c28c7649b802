//! Blocking HTTP seam for provider calls.
//!
//! The adapter only ever talks to a [`Transport`], so tests swap in a
//! scripted implementation and never touch the network.

use std::fmt;
use std::time::Duration;

use super::error::ProviderError;

const HIDDEN: &str = "[HIDDEN]";

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// A fully built provider request: URL, headers, JSON body.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.into(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Copy with credentials replaced by `[HIDDEN]`, safe to log.
    pub fn redacted(&self) -> Self {
        let headers = self
            .headers
            .iter()
            .map(|(k, v)| {
                let value = if k.eq_ignore_ascii_case("authorization") {
                    format!("Bearer {HIDDEN}")
                } else if k.eq_ignore_ascii_case("x-api-key") {
                    HIDDEN.to_string()
                } else {
                    v.clone()
                };
                (k.clone(), value)
            })
            .collect();

        Self {
            url: redact_url_key(&self.url),
            headers,
            body: self.body.clone(),
        }
    }
}

/// Never prints credentials, even through `{:?}`.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.redacted();
        f.debug_struct("HttpRequest")
            .field("url", &r.url)
            .field("headers", &r.headers)
            .field("body", &r.body)
            .finish()
    }
}

fn redact_url_key(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let params: Vec<String> = query
        .split('&')
        .map(|p| {
            if p.starts_with("key=") {
                format!("key={HIDDEN}")
            } else {
                p.to_string()
            }
        })
        .collect();
    format!("{base}?{}", params.join("&"))
}

/// Raw status and body of a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Sends one POST and returns whatever the server answered.
///
/// Non-2xx statuses are returned as responses, not errors; only failures to
/// get an answer at all (DNS, refused, TLS, timeout) are `Network` errors.
pub trait Transport {
    fn post_json(&self, request: &HttpRequest, timeout: Duration)
    -> Result<HttpResponse, ProviderError>;
}

/// Default transport over `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqTransport;

impl Transport for UreqTransport {
    fn post_json(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, ProviderError> {
        let mut req = ureq::post(&request.url).timeout(timeout);
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }

        match req.send_string(&request.body) {
            Ok(resp) => {
                let status = resp.status();
                let body = resp
                    .into_string()
                    .map_err(|e| ProviderError::Network(e.to_string()))?;
                Ok(HttpResponse { status, body })
            }
            Err(ureq::Error::Status(status, resp)) => Ok(HttpResponse {
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(t)) => Err(ProviderError::Network(t.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_hides_every_credential_location() {
        let req = HttpRequest::new(
            "https://example.test/v1/models/gemini-pro:generateContent?key=AIzaSECRET",
            "{}",
        )
        .header("Authorization", "Bearer sk-SECRET")
        .header("x-api-key", "sk-ant-SECRET");

        let shown = format!("{:?}", req);
        assert!(!shown.contains("SECRET"));
        assert!(shown.contains("key=[HIDDEN]"));
        assert!(shown.contains("Bearer [HIDDEN]"));

        // The original keeps its credentials for sending.
        assert_eq!(req.header_value("authorization"), Some("Bearer sk-SECRET"));
    }

    #[test]
    fn urls_without_query_are_untouched() {
        assert_eq!(
            redact_url_key("https://api.openai.com/v1/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse { status: 204, body: String::new() }.is_success());
        assert!(!HttpResponse { status: 302, body: String::new() }.is_success());
    }
}
