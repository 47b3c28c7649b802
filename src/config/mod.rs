/// Configuration system for the site tracker assistant.
///
/// Layered, later layers win at the key level:
///
/// 1. **Built-in defaults**: [`schema::SiteTrackerConfig::default()`]
/// 2. **User global config**: `~/.site-tracker/config.toml`
/// 3. **Project local config**: `.site-tracker.toml` in the working directory
/// 4. **Environment variables**: `SITE_TRACKER_*`
///
/// Malformed files are skipped with a warning rather than failing start-up.
///
/// The second half of this module turns a resolved config into the runtime
/// pieces: provider registry, remote settings, initial selection, query log
/// and a ready [`Dispatcher`].
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use crate::analysis::Analyzer;
use crate::analytics::QueryLog;
use crate::dispatch::{Dispatcher, ProviderSelection};
use crate::llm::{ProviderRegistry, RemoteAdapter, RemoteSettings, Secret, Transport};

pub use schema::SiteTrackerConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Fully resolved configuration from every layer.
pub fn load() -> SiteTrackerConfig {
    let (config, warnings) = load_with_warnings();
    log_warnings(&warnings);
    config
}

/// Like [`load`], but hands back the layer diagnostics instead of logging
/// them, for callers that install the subscriber after reading the config.
pub fn load_with_warnings() -> (SiteTrackerConfig, Vec<String>) {
    load_layers_with_warnings(
        &[global_config_path(), project_config_path()],
        |name| std::env::var(name).ok(),
    )
}

pub fn log_warnings(warnings: &[String]) {
    for w in warnings {
        warn!("{w}");
    }
}

/// Merge the given files over the defaults, then apply variables from `env`.
pub fn load_layers(
    files: &[Option<PathBuf>],
    env: impl Fn(&str) -> Option<String>,
) -> SiteTrackerConfig {
    let (config, warnings) = load_layers_with_warnings(files, env);
    log_warnings(&warnings);
    config
}

/// [`load_layers`] plus one message per skipped file or rejected layer.
pub fn load_layers_with_warnings(
    files: &[Option<PathBuf>],
    env: impl Fn(&str) -> Option<String>,
) -> (SiteTrackerConfig, Vec<String>) {
    let mut warnings = Vec::new();
    let mut merged = toml::Value::Table(toml::map::Map::new());
    for path in files.iter().flatten() {
        match load_toml_file(path) {
            Ok(Some(layer)) => merge_toml(&mut merged, layer),
            Ok(None) => {}
            Err(e) => warnings.push(format!("ignoring malformed config file {}: {e}", path.display())),
        }
    }

    let mut config = match merged.try_into::<SiteTrackerConfig>() {
        Ok(config) => config,
        Err(e) => {
            warnings.push(format!("config layers do not match the schema, using defaults: {e}"));
            SiteTrackerConfig::default()
        }
    };

    apply_env_overrides(&mut config, env);
    (config, warnings)
}

/// Parse one TOML file. A missing file is `Ok(None)`.
fn load_toml_file(path: &Path) -> Result<Option<toml::Value>, toml::de::Error> {
    let Ok(content) = fs::read_to_string(path) else {
        return Ok(None);
    };
    toml::from_str(&content).map(Some)
}

/// Key-level merge: tables merge recursively, anything else is replaced.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".site-tracker").join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".site-tracker.toml"))
}

pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest.trim_start_matches(['/', '\\']))),
        None => Some(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply `SITE_TRACKER_*` overrides (highest precedence layer).
///
/// - `SITE_TRACKER_PROVIDER`: start-up provider id
/// - `SITE_TRACKER_MODEL`: model override
/// - `SITE_TRACKER_TIMEOUT_MS`: remote request timeout
/// - `SITE_TRACKER_LOG`: query history on/off
/// - `SITE_TRACKER_<ID>_API_KEY`: key for one provider, e.g. `SITE_TRACKER_DEEPSEEK_API_KEY`
fn apply_env_overrides(config: &mut SiteTrackerConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(val) = env("SITE_TRACKER_PROVIDER")
        && !val.trim().is_empty()
    {
        config.general.provider = val.trim().to_ascii_lowercase();
    }
    if let Some(val) = env("SITE_TRACKER_MODEL")
        && !val.trim().is_empty()
    {
        config.general.model = val.trim().to_string();
    }
    if let Some(val) = env("SITE_TRACKER_TIMEOUT_MS")
        && let Ok(ms) = val.trim().parse::<u64>()
    {
        config.remote.timeout_ms = ms;
    }
    if let Some(val) = env("SITE_TRACKER_LOG") {
        config.logging.enabled = is_truthy(&val);
    }

    for id in schema::ProvidersConfig::IDS {
        let var = format!("SITE_TRACKER_{}_API_KEY", id.to_ascii_uppercase());
        if let Some(key) = env(&var)
            && !key.trim().is_empty()
            && let Some(entry) = config.providers.get_mut(id)
        {
            entry.api_key = key.trim().to_string();
        }
    }
}

fn is_truthy(val: &str) -> bool {
    matches!(
        val.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the annotated default config to `~/.site-tracker/config.toml`.
///
/// Fails if the file exists unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    init_config_at(&path, force)?;
    Ok(path)
}

pub fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, SiteTrackerConfig::default_toml()).context("failed to write config file")?;
    Ok(())
}

/// Set one dotted key (e.g. `remote.timeout_ms`) in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)
}

/// Set one dotted key in the file at `path`, creating it if needed.
///
/// The key must exist in the schema; the value is parsed as the type the
/// schema gives it.
pub fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let defaults = toml::Value::try_from(SiteTrackerConfig::default())
        .context("failed to serialize default config")?;

    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        toml::Value::Table(toml::map::Map::new())
    };

    set_toml_value(&mut root, &defaults, key, value)?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;
    Ok(())
}

/// Set a value in `root` along a dotted path, typed after the same path in `schema`.
fn set_toml_value(root: &mut toml::Value, schema: &toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    let mut expected = schema;
    for &part in sections {
        expected = expected
            .get(part)
            .filter(|v| v.is_table())
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
        let table = current
            .as_table_mut()
            .with_context(|| format!("expected table above '{part}' in '{key}'"))?;
        current = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    let kind = expected
        .get(*leaf)
        .with_context(|| format!("config key not found: '{key}'"))?;

    let new_value = match kind {
        toml::Value::Boolean(_) => toml::Value::Boolean(is_truthy(raw_value)),
        toml::Value::Integer(_) => {
            let n: i64 = raw_value
                .trim()
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        toml::Value::Float(_) => {
            let f: f64 = raw_value
                .trim()
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        toml::Value::Table(_) => anyhow::bail!("'{key}' is a section, not a value"),
        _ => toml::Value::String(raw_value.to_string()),
    };

    current
        .as_table_mut()
        .with_context(|| format!("expected table at '{}'", sections.join(".")))?
        .insert((*leaf).to_string(), new_value);
    Ok(())
}

/// Overwrite the global config with defaults.
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Effective config as TOML, with API keys masked.
pub fn show_effective_config() -> Result<String> {
    render_config(&load())
}

pub fn render_config(config: &SiteTrackerConfig) -> Result<String> {
    toml::to_string_pretty(&config.masked()).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Runtime wiring
// ---------------------------------------------------------------------------

/// Built-in providers with the configured endpoint and model overrides.
pub fn build_registry(config: &SiteTrackerConfig) -> ProviderRegistry {
    schema::ProvidersConfig::IDS
        .iter()
        .fold(ProviderRegistry::builtin(), |registry, id| {
            match config.providers.get(id) {
                Some(entry) => registry.with_override(id, Some(&entry.endpoint), Some(&entry.model)),
                None => registry,
            }
        })
}

pub fn remote_settings(config: &SiteTrackerConfig) -> RemoteSettings {
    let r = &config.remote;
    RemoteSettings {
        timeout: Duration::from_millis(r.timeout_ms),
        max_tokens: r.max_tokens,
        temperature: r.temperature,
        include_data_context: r.include_data_context,
        sample_records: r.sample_records,
        referer: r.referer.clone(),
        app_title: r.app_title.clone(),
    }
}

/// Start-up selection: the configured provider, its key and model.
pub fn initial_selection(config: &SiteTrackerConfig) -> ProviderSelection {
    let id = config.general.provider.trim().to_ascii_lowercase();
    let entry = config.providers.get(&id);

    let api_key = entry
        .map(|e| e.api_key.trim())
        .filter(|k| !k.is_empty())
        .map(Secret::new);
    let model_id = Some(config.general.model.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    ProviderSelection::remote(id, api_key, model_id)
}

/// Configured key for a provider, if any.
pub fn api_key_for(config: &SiteTrackerConfig, provider_id: &str) -> Option<Secret> {
    config
        .providers
        .get(&provider_id.trim().to_ascii_lowercase())
        .map(|e| e.api_key.trim())
        .filter(|k| !k.is_empty())
        .map(Secret::new)
}

pub fn query_log(config: &SiteTrackerConfig) -> Option<QueryLog> {
    if !config.logging.enabled {
        return None;
    }
    expand_home(&config.logging.path).map(QueryLog::new)
}

/// A dispatcher over `transport`, starting on the configured selection.
///
/// An unknown configured provider is reported and the dispatcher stays local.
pub fn build_dispatcher(config: &SiteTrackerConfig, transport: Box<dyn Transport>) -> Dispatcher {
    let adapter = RemoteAdapter::new(build_registry(config), transport, remote_settings(config));
    let mut dispatcher = Dispatcher::new(adapter, Analyzer::new(config.analysis));
    if let Some(log) = query_log(config) {
        dispatcher = dispatcher.with_query_log(log);
    }

    if let Err(e) = dispatcher.configuration_changed(initial_selection(config)) {
        warn!(error = %e, "configured provider rejected, staying on local analysis");
    }
    dispatcher
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
