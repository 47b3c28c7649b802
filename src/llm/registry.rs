//! Named provider table.
//!
//! The registry is built once at start-up from the built-in rows plus any
//! endpoint/model overrides from config, then only read.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::error::ProviderError;
use super::wire::{AnthropicMessages, ChatWire, GeminiContents, OpenAiChat};

/// Id of the built-in local heuristic analyzer.
pub const LOCAL_PROVIDER: &str = "local";

/// One named backend.
#[derive(Clone)]
pub struct ProviderConfig {
    pub id: String,
    pub display_name: String,
    /// Endpoint URL; may contain a `{model}` placeholder.
    pub endpoint: String,
    pub default_model: String,
    /// `None` for the local analyzer.
    pub wire: Option<Arc<dyn ChatWire>>,
    /// Gets the system instruction and dataset preview prepended.
    pub conversational: bool,
}

impl ProviderConfig {
    fn remote(
        id: &str,
        display_name: &str,
        endpoint: &str,
        default_model: &str,
        wire: Arc<dyn ChatWire>,
        conversational: bool,
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            endpoint: endpoint.to_string(),
            default_model: default_model.to_string(),
            wire: Some(wire),
            conversational,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.wire.is_some()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("endpoint", &self.endpoint)
            .field("default_model", &self.default_model)
            .field("wire", &self.wire.as_ref().map(|w| w.name()))
            .field("conversational", &self.conversational)
            .finish()
    }
}

/// A model offered through OpenRouter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogModel {
    pub id: &'static str,
    pub name: &'static str,
    pub vendor: &'static str,
}

pub const OPENROUTER_MODELS: &[CatalogModel] = &[
    CatalogModel { id: "deepseek/deepseek-chat", name: "DeepSeek Chat", vendor: "DeepSeek" },
    CatalogModel { id: "deepseek/deepseek-coder", name: "DeepSeek Coder", vendor: "DeepSeek" },
    CatalogModel { id: "anthropic/claude-3-haiku", name: "Claude 3 Haiku", vendor: "Anthropic" },
    CatalogModel { id: "anthropic/claude-3-sonnet", name: "Claude 3 Sonnet", vendor: "Anthropic" },
    CatalogModel { id: "openai/gpt-3.5-turbo", name: "GPT-3.5 Turbo", vendor: "OpenAI" },
    CatalogModel { id: "openai/gpt-4o-mini", name: "GPT-4o Mini", vendor: "OpenAI" },
    CatalogModel { id: "google/gemini-pro", name: "Gemini Pro", vendor: "Google" },
    CatalogModel { id: "meta-llama/llama-3.1-8b-instruct", name: "Llama 3.1 8B", vendor: "Meta" },
    CatalogModel { id: "mistralai/mistral-7b-instruct", name: "Mistral 7B", vendor: "Mistral" },
    CatalogModel { id: "microsoft/wizardlm-2-8x22b", name: "WizardLM 2 8x22B", vendor: "Microsoft" },
];

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderRegistry {
    /// Local analyzer plus the five hosted providers.
    pub fn builtin() -> Self {
        let providers = vec![
            ProviderConfig {
                id: LOCAL_PROVIDER.to_string(),
                display_name: "Local Analysis".to_string(),
                endpoint: String::new(),
                default_model: String::new(),
                wire: None,
                conversational: false,
            },
            ProviderConfig::remote(
                "openrouter",
                "OpenRouter",
                "https://openrouter.ai/api/v1/chat/completions",
                "deepseek/deepseek-chat",
                Arc::new(OpenAiChat {
                    attribution: true,
                    explicit_no_stream: false,
                }),
                true,
            ),
            ProviderConfig::remote(
                "deepseek",
                "DeepSeek",
                "https://api.deepseek.com/chat/completions",
                "deepseek-chat",
                Arc::new(OpenAiChat {
                    attribution: false,
                    explicit_no_stream: true,
                }),
                true,
            ),
            ProviderConfig::remote(
                "openai",
                "OpenAI",
                "https://api.openai.com/v1/chat/completions",
                "gpt-3.5-turbo",
                Arc::new(OpenAiChat::default()),
                false,
            ),
            ProviderConfig::remote(
                "anthropic",
                "Anthropic",
                "https://api.anthropic.com/v1/messages",
                "claude-3-haiku-20240307",
                Arc::new(AnthropicMessages),
                false,
            ),
            ProviderConfig::remote(
                "gemini",
                "Google Gemini",
                "https://generativelanguage.googleapis.com/v1/models/{model}:generateContent",
                "gemini-pro",
                Arc::new(GeminiContents),
                false,
            ),
        ];
        Self { providers }
    }

    /// Replace a provider's endpoint and/or default model.
    ///
    /// Blank values keep the built-in. Unknown ids are ignored.
    pub fn with_override(mut self, id: &str, endpoint: Option<&str>, model: Option<&str>) -> Self {
        let id = normalize(id);
        if let Some(p) = self.providers.iter_mut().find(|p| p.id == id && p.is_remote()) {
            if let Some(e) = endpoint.map(str::trim).filter(|e| !e.is_empty()) {
                p.endpoint = e.to_string();
            }
            if let Some(m) = model.map(str::trim).filter(|m| !m.is_empty()) {
                p.default_model = m.to_string();
            }
        }
        self
    }

    /// Register an additional provider, replacing any row with the same id.
    pub fn with_provider(mut self, config: ProviderConfig) -> Self {
        self.providers.retain(|p| p.id != config.id);
        self.providers.push(config);
        self
    }

    /// Resolve an id, trimmed and case-insensitive.
    pub fn lookup(&self, provider_id: &str) -> Result<&ProviderConfig, ProviderError> {
        let id = normalize(provider_id);
        self.providers
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ProviderError::UnknownProvider(provider_id.trim().to_string()))
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    pub fn remote_ids(&self) -> impl Iterator<Item = &str> {
        self.providers
            .iter()
            .filter(|p| p.is_remote())
            .map(|p| p.id.as_str())
    }
}

fn normalize(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_and_trimmed() {
        let reg = ProviderRegistry::builtin();
        assert_eq!(reg.lookup("  OpenRouter ").unwrap().id, "openrouter");
        assert!(!reg.lookup("local").unwrap().is_remote());
    }

    #[test]
    fn unknown_id_is_an_error() {
        let reg = ProviderRegistry::builtin();
        assert_eq!(
            reg.lookup("cohere").unwrap_err(),
            ProviderError::UnknownProvider("cohere".into())
        );
    }

    #[test]
    fn overrides_replace_only_non_blank_values() {
        let reg = ProviderRegistry::builtin().with_override(
            "deepseek",
            Some("https://api.deepseek.com/v1/chat/completions"),
            Some(" "),
        );
        let p = reg.lookup("deepseek").unwrap();
        assert_eq!(p.endpoint, "https://api.deepseek.com/v1/chat/completions");
        assert_eq!(p.default_model, "deepseek-chat");
    }

    #[test]
    fn only_openrouter_and_deepseek_are_conversational() {
        let reg = ProviderRegistry::builtin();
        let conv: Vec<&str> = reg
            .providers()
            .iter()
            .filter(|p| p.conversational)
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(conv, vec!["openrouter", "deepseek"]);
    }

    #[test]
    fn catalogue_has_ten_models() {
        assert_eq!(OPENROUTER_MODELS.len(), 10);
        assert_eq!(OPENROUTER_MODELS[0].id, "deepseek/deepseek-chat");
    }
}
