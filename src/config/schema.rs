/// Configuration schema and defaults for the site tracker assistant.
///
/// Sections: `[general]`, `[remote]`, `[providers.<id>]`, `[analysis]`,
/// `[logging]` and `[server]`. Every field has a built-in default, so a
/// config file only needs the values it changes.
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisSettings;
use crate::llm::secret::mask_key;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Maps to `~/.site-tracker/config.toml` and `./.site-tracker.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteTrackerConfig {
    pub general: GeneralConfig,
    pub remote: RemoteConfig,
    pub providers: ProvidersConfig,
    pub analysis: AnalysisSettings,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

// ---------------------------------------------------------------------------
// [general]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Provider selected at start-up.
    pub provider: String,
    /// Model override for that provider; empty uses the provider default.
    pub model: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// [remote]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub timeout_ms: u64,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Send a dataset summary along with conversational prompts.
    pub include_data_context: bool,
    pub sample_records: usize,
    /// Attribution headers for OpenRouter.
    pub referer: String,
    pub app_title: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_tokens: 1000,
            temperature: 0.7,
            include_data_context: true,
            sample_records: 5,
            referer: "http://localhost".to_string(),
            app_title: "Site Tracker Dashboard".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [providers.<id>]
// ---------------------------------------------------------------------------

/// Per-provider credentials and overrides. Empty strings mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEntry {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openrouter: ProviderEntry,
    pub deepseek: ProviderEntry,
    pub openai: ProviderEntry,
    pub anthropic: ProviderEntry,
    pub gemini: ProviderEntry,
}

impl ProvidersConfig {
    pub const IDS: [&'static str; 5] = ["openrouter", "deepseek", "openai", "anthropic", "gemini"];

    pub fn get(&self, id: &str) -> Option<&ProviderEntry> {
        match id {
            "openrouter" => Some(&self.openrouter),
            "deepseek" => Some(&self.deepseek),
            "openai" => Some(&self.openai),
            "anthropic" => Some(&self.anthropic),
            "gemini" => Some(&self.gemini),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ProviderEntry> {
        match id {
            "openrouter" => Some(&mut self.openrouter),
            "deepseek" => Some(&mut self.deepseek),
            "openai" => Some(&mut self.openai),
            "anthropic" => Some(&mut self.anthropic),
            "gemini" => Some(&mut self.gemini),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether the JSONL query history is written.
    pub enabled: bool,
    /// Path to the query log. `~` is expanded to the home directory.
    pub path: String,
    /// Diagnostic level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.site-tracker/query-log.jsonl".to_string(),
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [server]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8765".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

impl SiteTrackerConfig {
    /// Copy with every API key replaced by its masked form.
    pub fn masked(&self) -> Self {
        let mut out = self.clone();
        for id in ProvidersConfig::IDS {
            if let Some(entry) = out.providers.get_mut(id)
                && !entry.api_key.is_empty()
            {
                entry.api_key = mask_key(&entry.api_key);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl SiteTrackerConfig {
    /// Annotated starting config written by `config init`.
    pub fn default_toml() -> String {
        r#"# Site Tracker AI configuration
#
# Precedence (highest wins):
#   1. Environment variables (SITE_TRACKER_*)
#   2. Project config (.site-tracker.toml in current directory)
#   3. User global config (~/.site-tracker/config.toml)
#   4. Built-in defaults

[general]
provider = "local"    # local | openrouter | deepseek | openai | anthropic | gemini
model = ""            # empty uses the provider's default model

[remote]
timeout_ms = 30000
max_tokens = 1000
temperature = 0.7
include_data_context = true
sample_records = 5
referer = "http://localhost"
app_title = "Site Tracker Dashboard"

# Keys may also come from SITE_TRACKER_<ID>_API_KEY.
[providers.openrouter]
api_key = ""
model = ""
endpoint = ""

[providers.deepseek]
api_key = ""
model = ""
endpoint = ""

[providers.openai]
api_key = ""
model = ""
endpoint = ""

[providers.anthropic]
api_key = ""
model = ""
endpoint = ""

[providers.gemini]
api_key = ""
model = ""
endpoint = ""

[analysis]
z_score_cutoff = 2.0
high_severity_ratio = 0.1
numeric_sample_rows = 10
numeric_field_ratio = 0.7

[logging]
enabled = true
path = "~/.site-tracker/query-log.jsonl"
level = "info"        # error | warn | info | debug | trace

[server]
addr = "127.0.0.1:8765"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = SiteTrackerConfig::default();
        assert_eq!(config.general.provider, "local");
        assert_eq!(config.remote.timeout_ms, 30_000);
        assert_eq!(config.remote.max_tokens, 1000);
        assert_eq!(config.remote.sample_records, 5);
        assert_eq!(config.analysis.z_score_cutoff, 2.0);
        assert!(config.logging.enabled);
        assert_eq!(config.server.addr, "127.0.0.1:8765");
    }

    #[test]
    fn default_toml_matches_defaults() {
        let parsed: SiteTrackerConfig = toml::from_str(&SiteTrackerConfig::default_toml()).unwrap();
        assert_eq!(parsed, SiteTrackerConfig::default());
    }

    #[test]
    fn deserialize_minimal_toml() {
        let config: SiteTrackerConfig = toml::from_str(
            r#"
[providers.deepseek]
api_key = "sk-deep"
"#,
        )
        .unwrap();
        assert_eq!(config.providers.deepseek.api_key, "sk-deep");
        assert_eq!(config.general.provider, "local");
        assert_eq!(config.remote.temperature, 0.7);
    }

    #[test]
    fn masked_hides_keys() {
        let mut config = SiteTrackerConfig::default();
        config.providers.openai.api_key = "sk-abcdefghijklmnopqrstuvwxyz".to_string();
        let shown = toml::to_string_pretty(&config.masked()).unwrap();
        assert!(!shown.contains("sk-abcdefghijklmnopqrstuvwxyz"));
        assert!(shown.contains("sk-abcde"));
        assert!(config.masked().providers.gemini.api_key.is_empty());
    }

    #[test]
    fn provider_lookup_by_id() {
        let config = SiteTrackerConfig::default();
        for id in ProvidersConfig::IDS {
            assert!(config.providers.get(id).is_some());
        }
        assert!(config.providers.get("local").is_none());
    }
}
