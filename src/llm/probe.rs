//! Connection checks for remote providers.

use serde::Serialize;

use super::adapter::{RemoteAdapter, RemoteCall};
use super::error::ProviderError;
use super::secret::Secret;

pub const HELLO_PROMPT: &str = "Hello, please respond with: Connection successful";

/// Outcome of one connection attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub success: bool,
    pub reply: Option<String>,
    pub error: Option<String>,
}

/// Whether a reply to [`HELLO_PROMPT`] counts as a working connection.
pub fn reply_confirms_connection(reply: &str) -> bool {
    reply.contains("successful") || reply.contains("Connection") || reply.chars().count() > 5
}

/// Send the hello prompt to a registered provider.
///
/// Unknown ids are returned as errors; every other failure is folded into
/// an unsuccessful report.
pub fn test_connection(
    adapter: &RemoteAdapter,
    provider_id: &str,
    api_key: Option<&Secret>,
    model: Option<&str>,
) -> Result<ConnectionReport, ProviderError> {
    let provider = adapter.registry().lookup(provider_id)?;
    let model = model
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(&provider.default_model)
        .to_string();
    let call = RemoteCall {
        message: HELLO_PROMPT,
        api_key,
        model: Some(model.as_str()),
        dataset: None,
    };
    Ok(report(
        &provider.id,
        &provider.endpoint,
        &model,
        adapter.call_provider(provider, &call),
    ))
}

/// A DeepSeek endpoint/model combination worth trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointVariant {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub model: &'static str,
}

pub const DEEPSEEK_VARIANTS: &[EndpointVariant] = &[
    EndpointVariant {
        name: "DeepSeek Official API",
        endpoint: "https://api.deepseek.com/chat/completions",
        model: "deepseek-chat",
    },
    EndpointVariant {
        name: "DeepSeek V1 API",
        endpoint: "https://api.deepseek.com/v1/chat/completions",
        model: "deepseek-chat",
    },
    EndpointVariant {
        name: "DeepSeek Coder API",
        endpoint: "https://api.deepseek.com/chat/completions",
        model: "deepseek-coder",
    },
    EndpointVariant {
        name: "DeepSeek Beta API",
        endpoint: "https://api.deepseek.com/beta/chat/completions",
        model: "deepseek-chat",
    },
];

/// Try each DeepSeek variant in order until one answers.
///
/// Returns every attempt made; the last entry is the working one when any
/// variant succeeded.
pub fn probe_deepseek(
    adapter: &RemoteAdapter,
    api_key: Option<&Secret>,
) -> Result<Vec<ConnectionReport>, ProviderError> {
    let base = adapter.registry().lookup("deepseek")?;
    let mut attempts = Vec::new();

    for variant in DEEPSEEK_VARIANTS {
        let mut provider = base.clone();
        provider.endpoint = variant.endpoint.to_string();
        provider.default_model = variant.model.to_string();

        let call = RemoteCall {
            message: HELLO_PROMPT,
            api_key,
            model: None,
            dataset: None,
        };
        let result = adapter.call_provider(&provider, &call);
        // A missing key fails identically for every variant.
        let stop = matches!(result, Err(ProviderError::MissingApiKey(_)));

        let attempt = report(variant.name, variant.endpoint, variant.model, result);
        let success = attempt.success;
        attempts.push(attempt);
        if success || stop {
            break;
        }
    }

    Ok(attempts)
}

fn report(
    provider: &str,
    endpoint: &str,
    model: &str,
    result: Result<String, ProviderError>,
) -> ConnectionReport {
    let (success, reply, error) = match result {
        Ok(reply) => (reply_confirms_connection(&reply), Some(reply), None),
        Err(e) => (false, None, Some(e.to_string())),
    };
    ConnectionReport {
        provider: provider.to_string(),
        endpoint: endpoint.to_string(),
        model: model.to_string(),
        success,
        reply,
        error,
    }
}
