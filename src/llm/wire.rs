//! Provider wire formats.
//!
//! Each hosted API speaks one of three dialects. A [`ChatWire`] knows how to
//! build the HTTP request for its dialect and where the reply text lives in
//! the response. Registry rows pick a wire; nothing switches on provider id.

use serde_json::{Value, json};
use url::form_urlencoded;

use super::ChatMessage;
use super::transport::HttpRequest;

/// Reply text used when the response has no usable content.
pub const NO_RESPONSE: &str = "No response";

/// Everything a wire needs to build one request.
#[derive(Debug, Clone)]
pub struct ChatCall<'a> {
    pub endpoint: &'a str,
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub api_key: &'a str,
    pub max_tokens: u32,
    pub temperature: f64,
    pub referer: &'a str,
    pub app_title: &'a str,
}

pub trait ChatWire: Send + Sync {
    /// Dialect name, for listings and logs.
    fn name(&self) -> &'static str;

    fn build_request(&self, call: &ChatCall<'_>) -> HttpRequest;

    /// Reply text, or [`NO_RESPONSE`] when the path is missing or empty.
    fn extract_reply(&self, body: &Value) -> String;
}

fn text_at(body: &Value, pointer: &str) -> String {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| NO_RESPONSE.to_string())
}

// ---------------------------------------------------------------------------
// OpenAI-style chat completions (OpenAI, OpenRouter, DeepSeek)
// ---------------------------------------------------------------------------

/// `POST {endpoint}` with a bearer token and a `messages` array.
#[derive(Debug, Clone, Default)]
pub struct OpenAiChat {
    /// Send `HTTP-Referer` / `X-Title` attribution headers (OpenRouter).
    pub attribution: bool,
    /// Send `"stream": false` explicitly (DeepSeek).
    pub explicit_no_stream: bool,
}

impl ChatWire for OpenAiChat {
    fn name(&self) -> &'static str {
        "openai-chat"
    }

    fn build_request(&self, call: &ChatCall<'_>) -> HttpRequest {
        let mut body = json!({
            "model": call.model,
            "messages": call.messages,
            "max_tokens": call.max_tokens,
            "temperature": call.temperature,
        });
        if self.explicit_no_stream {
            body["stream"] = Value::Bool(false);
        }

        let mut req = HttpRequest::new(call.endpoint, body.to_string())
            .header("Authorization", format!("Bearer {}", call.api_key));
        if self.attribution {
            req = req
                .header("HTTP-Referer", call.referer)
                .header("X-Title", call.app_title);
        }
        req
    }

    fn extract_reply(&self, body: &Value) -> String {
        text_at(body, "/choices/0/message/content")
    }
}

// ---------------------------------------------------------------------------
// Anthropic messages
// ---------------------------------------------------------------------------

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Default)]
pub struct AnthropicMessages;

impl ChatWire for AnthropicMessages {
    fn name(&self) -> &'static str {
        "anthropic-messages"
    }

    fn build_request(&self, call: &ChatCall<'_>) -> HttpRequest {
        let body = json!({
            "model": call.model,
            "max_tokens": call.max_tokens,
            "messages": call.messages,
        });

        HttpRequest::new(call.endpoint, body.to_string())
            .header("x-api-key", call.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    fn extract_reply(&self, body: &Value) -> String {
        text_at(body, "/content/0/text")
    }
}

// ---------------------------------------------------------------------------
// Gemini generateContent
// ---------------------------------------------------------------------------

/// Model goes into the URL template, key into the query string.
#[derive(Debug, Clone, Default)]
pub struct GeminiContents;

impl ChatWire for GeminiContents {
    fn name(&self) -> &'static str {
        "gemini-contents"
    }

    fn build_request(&self, call: &ChatCall<'_>) -> HttpRequest {
        let contents: Vec<Value> = call
            .messages
            .iter()
            .map(|m| json!({ "parts": [{ "text": m.content }] }))
            .collect();
        let body = json!({ "contents": contents });

        let url = call.endpoint.replace("{model}", call.model);
        let sep = if url.contains('?') { '&' } else { '?' };
        let key: String = form_urlencoded::byte_serialize(call.api_key.trim().as_bytes()).collect();
        HttpRequest::new(format!("{url}{sep}key={key}"), body.to_string())
    }

    fn extract_reply(&self, body: &Value) -> String {
        text_at(body, "/candidates/0/content/parts/0/text")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call<'a>(endpoint: &'a str, messages: &'a [ChatMessage]) -> ChatCall<'a> {
        ChatCall {
            endpoint,
            model: "m-1",
            messages,
            api_key: "k-123",
            max_tokens: 1000,
            temperature: 0.7,
            referer: "http://localhost",
            app_title: "Site Tracker Dashboard",
        }
    }

    fn body(req: &HttpRequest) -> Value {
        serde_json::from_str(&req.body).unwrap()
    }

    #[test]
    fn openai_body_and_auth() {
        let msgs = [ChatMessage::user("hi")];
        let req = OpenAiChat::default().build_request(&call("https://x/chat", &msgs));
        assert_eq!(req.header_value("Authorization"), Some("Bearer k-123"));
        assert_eq!(req.header_value("Content-Type"), Some("application/json"));
        assert!(req.header_value("X-Title").is_none());
        let b = body(&req);
        assert_eq!(b["model"], "m-1");
        assert_eq!(b["max_tokens"], 1000);
        assert_eq!(b["messages"][0]["content"], "hi");
        assert!(b.get("stream").is_none());
    }

    #[test]
    fn openrouter_and_deepseek_variants() {
        let msgs = [ChatMessage::user("hi")];
        let wire = OpenAiChat {
            attribution: true,
            explicit_no_stream: true,
        };
        let req = wire.build_request(&call("https://x/chat", &msgs));
        assert_eq!(req.header_value("HTTP-Referer"), Some("http://localhost"));
        assert_eq!(req.header_value("X-Title"), Some("Site Tracker Dashboard"));
        assert_eq!(body(&req)["stream"], false);
    }

    #[test]
    fn anthropic_puts_max_tokens_before_messages() {
        let msgs = [ChatMessage::user("hi")];
        let req = AnthropicMessages.build_request(&call("https://a/v1/messages", &msgs));
        assert_eq!(req.header_value("x-api-key"), Some("k-123"));
        assert_eq!(req.header_value("anthropic-version"), Some("2023-06-01"));
        assert!(req.header_value("Authorization").is_none());
        let keys: Vec<String> = body(&req).as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["model", "max_tokens", "messages"]);
    }

    #[test]
    fn gemini_templates_model_and_key() {
        let msgs = [ChatMessage::user("hi")];
        let req = GeminiContents.build_request(&call(
            "https://g/v1/models/{model}:generateContent",
            &msgs,
        ));
        assert_eq!(req.url, "https://g/v1/models/m-1:generateContent?key=k-123");
        assert!(req.header_value("Authorization").is_none());
        assert_eq!(body(&req)["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn gemini_key_is_trimmed_and_encoded() {
        let msgs = [ChatMessage::user("hi")];
        let mut c = call("https://g/v1/models/{model}:generateContent?alt=json", &msgs);
        c.api_key = " AIza&b#c d\n";
        let req = GeminiContents.build_request(&c);
        assert_eq!(
            req.url,
            "https://g/v1/models/m-1:generateContent?alt=json&key=AIza%26b%23c+d"
        );
        let shown = format!("{:?}", req);
        assert!(shown.contains("alt=json&key=[HIDDEN]"));
        assert!(!shown.contains("AIza"));
    }

    #[test]
    fn missing_or_empty_reply_degrades() {
        let openai = OpenAiChat::default();
        assert_eq!(openai.extract_reply(&json!({"choices": []})), NO_RESPONSE);
        assert_eq!(
            openai.extract_reply(&json!({"choices": [{"message": {"content": ""}}]})),
            NO_RESPONSE
        );
        assert_eq!(AnthropicMessages.extract_reply(&json!({})), NO_RESPONSE);
        assert_eq!(
            GeminiContents.extract_reply(
                &json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}}]})
            ),
            "ok"
        );
    }
}
