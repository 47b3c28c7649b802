//! Remote provider adapter.
//!
//! Given a provider id and a question, builds the vendor request through the
//! provider's [`ChatWire`], sends it over the injected [`Transport`] and
//! extracts the reply text. One POST per call, no retries.
//!
//! [`ChatWire`]: super::wire::ChatWire

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::error::ProviderError;
use super::prompts::{ContextOptions, build_messages};
use super::registry::{ProviderConfig, ProviderRegistry};
use super::secret::Secret;
use super::transport::{Transport, UreqTransport};
use super::wire::ChatCall;
use crate::dataset::Dataset;

/// Request-shaping knobs shared by every remote call.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f64,
    pub include_data_context: bool,
    pub sample_records: usize,
    pub referer: String,
    pub app_title: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            max_tokens: 1000,
            temperature: 0.7,
            include_data_context: true,
            sample_records: 5,
            referer: "http://localhost".to_string(),
            app_title: "Site Tracker Dashboard".to_string(),
        }
    }
}

/// One question for a remote provider.
#[derive(Debug, Clone, Copy)]
pub struct RemoteCall<'a> {
    pub message: &'a str,
    pub api_key: Option<&'a Secret>,
    /// Overrides the provider's default model when set and non-blank.
    pub model: Option<&'a str>,
    pub dataset: Option<&'a Dataset>,
}

pub struct RemoteAdapter {
    registry: ProviderRegistry,
    transport: Box<dyn Transport>,
    settings: RemoteSettings,
}

impl RemoteAdapter {
    pub fn new(registry: ProviderRegistry, transport: Box<dyn Transport>, settings: RemoteSettings) -> Self {
        Self {
            registry,
            transport,
            settings,
        }
    }

    /// Built-in registry over `ureq` with default settings.
    pub fn with_defaults() -> Self {
        Self::new(
            ProviderRegistry::builtin(),
            Box::new(UreqTransport),
            RemoteSettings::default(),
        )
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    /// Ask `provider_id` the question and return its reply text.
    pub fn call(&self, provider_id: &str, call: &RemoteCall<'_>) -> Result<String, ProviderError> {
        let provider = self.registry.lookup(provider_id)?;
        self.call_provider(provider, call)
    }

    /// Same as [`call`](Self::call) against an explicit provider row, which
    /// need not be registered (endpoint probing).
    pub fn call_provider(
        &self,
        provider: &ProviderConfig,
        call: &RemoteCall<'_>,
    ) -> Result<String, ProviderError> {
        let Some(wire) = provider.wire.as_ref() else {
            return Err(ProviderError::NotRemote(provider.id.clone()));
        };

        let api_key = match call.api_key {
            Some(key) if key.is_usable() => key.expose().trim(),
            _ => return Err(ProviderError::MissingApiKey(provider.id.clone())),
        };

        let model = call
            .model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&provider.default_model);

        let messages = build_messages(
            call.message,
            call.dataset,
            provider.conversational,
            ContextOptions {
                include_data_context: self.settings.include_data_context,
                sample_records: self.settings.sample_records,
            },
        );

        let request = wire.build_request(&ChatCall {
            endpoint: &provider.endpoint,
            model,
            messages: &messages,
            api_key,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            referer: &self.settings.referer,
            app_title: &self.settings.app_title,
        });

        debug!(provider = %provider.id, model, request = ?request, "sending provider request");

        let response = self.transport.post_json(&request, self.settings.timeout)?;
        if !response.is_success() {
            return Err(ProviderError::HttpStatus {
                status: response.status,
                body: response.body,
            });
        }

        let body: Value = serde_json::from_str(&response.body)
            .map_err(|e| ProviderError::InvalidJson(e.to_string()))?;

        Ok(wire.extract_reply(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::transport::{HttpRequest, HttpResponse};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records requests and replays one canned result.
    struct Canned {
        result: Result<HttpResponse, ProviderError>,
        seen: Rc<RefCell<Vec<HttpRequest>>>,
    }

    impl Transport for Canned {
        fn post_json(&self, req: &HttpRequest, _t: Duration) -> Result<HttpResponse, ProviderError> {
            self.seen.borrow_mut().push(req.clone());
            self.result.clone()
        }
    }

    fn adapter(result: Result<HttpResponse, ProviderError>) -> (RemoteAdapter, Rc<RefCell<Vec<HttpRequest>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let transport = Canned {
            result,
            seen: Rc::clone(&seen),
        };
        let adapter = RemoteAdapter::new(
            ProviderRegistry::builtin(),
            Box::new(transport),
            RemoteSettings::default(),
        );
        (adapter, seen)
    }

    fn ok(body: &str) -> Result<HttpResponse, ProviderError> {
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    #[test]
    fn missing_key_never_touches_network() {
        let (adapter, seen) = adapter(ok("{}"));
        let placeholder = Secret::new("your-openai-key-here");
        for key in [None, Some(&placeholder)] {
            let err = adapter
                .call("openai", &RemoteCall { message: "hi", api_key: key, model: None, dataset: None })
                .unwrap_err();
            assert_eq!(err, ProviderError::MissingApiKey("openai".into()));
        }
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn local_is_not_remote() {
        let (adapter, _) = adapter(ok("{}"));
        let key = Secret::new("k");
        let err = adapter
            .call("local", &RemoteCall { message: "hi", api_key: Some(&key), model: None, dataset: None })
            .unwrap_err();
        assert_eq!(err, ProviderError::NotRemote("local".into()));
    }

    #[test]
    fn non_2xx_becomes_http_status() {
        let (adapter, _) = adapter(Ok(HttpResponse {
            status: 401,
            body: "invalid key".into(),
        }));
        let key = Secret::new("sk-real");
        let err = adapter
            .call("deepseek", &RemoteCall { message: "hi", api_key: Some(&key), model: None, dataset: None })
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::HttpStatus {
                status: 401,
                body: "invalid key".into()
            }
        );
    }

    #[test]
    fn non_json_success_is_invalid_json() {
        let (adapter, _) = adapter(ok("<html>oops</html>"));
        let key = Secret::new("sk-real");
        let err = adapter
            .call("openai", &RemoteCall { message: "hi", api_key: Some(&key), model: None, dataset: None })
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidJson(_)));
    }

    #[test]
    fn model_override_and_reply_extraction() {
        let (adapter, seen) = adapter(ok(r#"{"content":[{"text":"Hi there"}]}"#));
        let key = Secret::new("sk-ant-real");
        let reply = adapter
            .call(
                "anthropic",
                &RemoteCall { message: "hi", api_key: Some(&key), model: Some("claude-3-sonnet"), dataset: None },
            )
            .unwrap();
        assert_eq!(reply, "Hi there");
        let body: Value = serde_json::from_str(&seen.borrow()[0].body).unwrap();
        assert_eq!(body["model"], "claude-3-sonnet");
    }
}
