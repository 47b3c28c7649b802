//! CLI command implementations.
//!
//! Provides subcommand handlers for:
//! - `ask` / `chat`: questions through the dispatcher
//! - `issues`, `insights`, `geo`: the local analysis views
//! - `providers`, `test-connection`: remote provider inspection
//! - `history`: query log report
//! - `serve`: JSON API server
//! - `config show|init|set|reset`: configuration management

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::analysis::HELP_TEXT;
use crate::analytics::reporter::{self, HistoryStats, TrendEntry};
use crate::analytics::UsageStats;
use crate::config::{self, SiteTrackerConfig};
use crate::dataset::Dataset;
use crate::dispatch::{Dispatcher, ProviderSelection, QueryResult, SourceKind};
use crate::llm::probe::{self, ConnectionReport};
use crate::llm::registry::OPENROUTER_MODELS;
use crate::llm::{RemoteAdapter, Secret, UreqTransport};
use crate::web::{self, AppState};

/// Output format for report commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Load a dataset file, or start empty when none is given.
pub fn load_dataset(path: Option<&Path>) -> Result<Dataset> {
    match path {
        Some(path) => Dataset::load(path),
        None => Ok(Dataset::empty()),
    }
}

fn dispatcher(cfg: &SiteTrackerConfig) -> Dispatcher {
    config::build_dispatcher(cfg, Box::new(UreqTransport))
}

/// Selection for `--provider`/`--model` flags, with the configured key.
fn selection_for(cfg: &SiteTrackerConfig, provider: &str, model: Option<String>) -> ProviderSelection {
    ProviderSelection::remote(provider, config::api_key_for(cfg, provider), model)
}

// ---------------------------------------------------------------------------
// ask
// ---------------------------------------------------------------------------

pub fn run_ask(
    cfg: &SiteTrackerConfig,
    dataset: &Dataset,
    query: &str,
    provider: Option<&str>,
    model: Option<String>,
) -> Result<()> {
    let mut d = dispatcher(cfg);
    if provider.is_some() || model.is_some() {
        let provider = provider.unwrap_or(&d.selection().provider_id).to_string();
        d.configuration_changed(selection_for(cfg, &provider, model))?;
    }

    let result = d.handle_query(query, dataset)?;
    print_answer(&result);
    Ok(())
}

fn print_answer(result: &QueryResult) {
    println!("{}", result.text);
    println!();
    let origin = match (result.source, &result.fallback_reason) {
        (SourceKind::Remote, _) => format!("answered by {}", result.provider_id).green(),
        (SourceKind::Local, Some(reason)) => {
            format!("{} unavailable ({reason}), answered locally", result.provider_id).yellow()
        }
        (SourceKind::Local, None) => "answered locally".normal(),
    };
    println!("  {} {}", "·".dimmed(), origin.dimmed());
}

// ---------------------------------------------------------------------------
// chat
// ---------------------------------------------------------------------------

/// One line of chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Query(String),
    Stats,
    Provider(String),
    /// `None` clears the override.
    Model(Option<String>),
    Key(String),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_chat_command(line: &str) -> ChatCommand {
    let line = line.trim();
    if line.is_empty() {
        return ChatCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ChatCommand::Query(line.to_string());
    };

    let (cmd, arg) = match rest.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (rest, ""),
    };
    match (cmd.to_ascii_lowercase().as_str(), arg) {
        ("stats", _) => ChatCommand::Stats,
        ("help", _) => ChatCommand::Help,
        ("quit" | "exit", _) => ChatCommand::Quit,
        ("provider", id) if !id.is_empty() => ChatCommand::Provider(id.to_string()),
        ("model", "") => ChatCommand::Model(None),
        ("model", m) => ChatCommand::Model(Some(m.to_string())),
        ("key", k) if !k.is_empty() => ChatCommand::Key(k.to_string()),
        _ => ChatCommand::Unknown(line.to_string()),
    }
}

/// Interactive loop over stdin until `/quit` or EOF.
pub fn run_chat(cfg: &SiteTrackerConfig, dataset: &Dataset) -> Result<()> {
    let mut d = dispatcher(cfg);

    println!("{}", "Site Tracker AI Assistant".bold().cyan());
    println!(
        "  {} records loaded, provider: {}. Type {} for commands.",
        dataset.len(),
        d.selection().provider_id.bold(),
        "/help".bold()
    );
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", ">".cyan().bold());
        io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read from stdin")?;

        match parse_chat_command(&line) {
            ChatCommand::Empty => {}
            ChatCommand::Quit => break,
            ChatCommand::Help => {
                println!("{HELP_TEXT}\n");
                println!(
                    "{}",
                    "Commands: /stats  /provider <id>  /model [id]  /key <api-key>  /help  /quit".dimmed()
                );
            }
            ChatCommand::Stats => print_usage(&d.usage_stats()),
            ChatCommand::Provider(id) => {
                let model = d.selection().model_id.clone();
                report_selection(&mut d, selection_for(cfg, &id, model));
            }
            ChatCommand::Model(model) => {
                let selection = ProviderSelection {
                    model_id: model,
                    ..d.selection().clone()
                };
                report_selection(&mut d, selection);
            }
            ChatCommand::Key(key) => {
                let selection = ProviderSelection {
                    api_key: Some(Secret::new(key)),
                    ..d.selection().clone()
                };
                report_selection(&mut d, selection);
            }
            ChatCommand::Unknown(line) => {
                println!("{} unknown command {}", "✗".red(), line.bold());
            }
            ChatCommand::Query(query) => match d.handle_query(&query, dataset) {
                Ok(result) => print_answer(&result),
                Err(e) => println!("{} {e}", "✗".red().bold()),
            },
        }
        println!();
    }

    Ok(())
}

fn report_selection(d: &mut Dispatcher, selection: ProviderSelection) {
    match d.configuration_changed(selection) {
        Ok(()) => {
            let s = d.selection();
            let key = s
                .api_key
                .as_ref()
                .filter(|k| k.is_usable())
                .map_or_else(|| "no key".to_string(), Secret::masked);
            println!(
                "{} provider {} model {} ({key})",
                "✓".green().bold(),
                s.provider_id.bold(),
                s.model_id.as_deref().unwrap_or("default"),
            );
        }
        Err(e) => println!("{} {e}", "✗".red().bold()),
    }
}

fn print_usage(stats: &UsageStats) {
    println!("{}", "Session Usage".bold().cyan());
    println!("  {} {}", "Total queries:".bold(), stats.total_queries);
    println!(
        "  {} {} local / {} remote",
        "Answered:     ".bold(),
        stats.local_count,
        stats.remote_count
    );
    println!(
        "  {} {} min ({:.2} queries/min)",
        "Uptime:       ".bold(),
        stats.uptime_minutes,
        stats.average_queries_per_minute
    );
    for (category, count) in &stats.query_type_counts {
        println!("    {:<14} {}", category.as_str(), count);
    }
}

// ---------------------------------------------------------------------------
// issues | insights | geo
// ---------------------------------------------------------------------------

pub fn run_issues(cfg: &SiteTrackerConfig, dataset: &Dataset, format: OutputFormat) -> Result<()> {
    let report = dispatcher(cfg).analyzer().find_issues(dataset);
    match format {
        OutputFormat::Table => println!("{}", report.render()),
        _ => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

pub fn run_insights(cfg: &SiteTrackerConfig, dataset: &Dataset, format: OutputFormat) -> Result<()> {
    let insights = dispatcher(cfg).analyzer().insights(dataset);
    match format {
        OutputFormat::Table => println!("{}", insights.render()),
        _ => println!("{}", serde_json::to_string_pretty(&insights)?),
    }
    Ok(())
}

pub fn run_geo(cfg: &SiteTrackerConfig, dataset: &Dataset, format: OutputFormat) -> Result<()> {
    let report = dispatcher(cfg).analyzer().geo_report(dataset);
    match format {
        OutputFormat::Table => println!("{}", report.render()),
        _ => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// providers | test-connection
// ---------------------------------------------------------------------------

pub fn run_providers(cfg: &SiteTrackerConfig) -> Result<()> {
    let registry = config::build_registry(cfg);

    println!("{}", "Providers".bold().cyan());
    println!("{}", "=".repeat(72));
    println!("  {:<12} {:<18} {:<28} Key", "Id", "Name", "Default model");
    println!("  {}", "-".repeat(70));
    for p in registry.providers() {
        let key = if !p.is_remote() {
            "n/a".dimmed()
        } else if config::api_key_for(cfg, &p.id).is_some_and(|k| k.is_usable()) {
            "configured".green()
        } else {
            "missing".yellow()
        };
        println!(
            "  {:<12} {:<18} {:<28} {}",
            p.id,
            truncate(&p.display_name, 18),
            truncate(&p.default_model, 28),
            key
        );
    }

    println!();
    println!("{}", "OpenRouter models".bold().cyan());
    for m in OPENROUTER_MODELS {
        println!("  {:<36} {} ({})", m.id, m.name, m.vendor.dimmed());
    }
    Ok(())
}

pub fn run_test_connection(
    cfg: &SiteTrackerConfig,
    provider: &str,
    key: Option<String>,
    model: Option<&str>,
    probe_deepseek: bool,
) -> Result<()> {
    let adapter = RemoteAdapter::new(
        config::build_registry(cfg),
        Box::new(UreqTransport),
        config::remote_settings(cfg),
    );
    let key = key.map(Secret::new).or_else(|| config::api_key_for(cfg, provider));

    let reports = if probe_deepseek {
        probe::probe_deepseek(&adapter, key.as_ref())?
    } else {
        vec![probe::test_connection(&adapter, provider, key.as_ref(), model)?]
    };

    for report in &reports {
        print_connection_report(report);
    }
    Ok(())
}

fn print_connection_report(report: &ConnectionReport) {
    let status = if report.success {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!(
        "  {} {:<10} {} {}",
        status,
        report.provider,
        report.model.bold(),
        report.endpoint.dimmed()
    );
    if let Some(reply) = &report.reply {
        println!("      {}", truncate(reply.trim(), 100));
    }
    if let Some(error) = &report.error {
        println!("      {}", error.yellow());
    }
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

pub fn run_history(cfg: &SiteTrackerConfig, format: OutputFormat, days: Option<u32>, daily: bool) -> Result<()> {
    let Some(log) = config::query_log(cfg) else {
        println!("{}", "Query logging is disabled ([logging].enabled = false).".yellow());
        return Ok(());
    };

    if daily {
        let trends = reporter::compute_trends(&log, days.unwrap_or(7));
        if trends.is_empty() {
            println!("{}", "No queries in that window.".yellow());
            return Ok(());
        }
        return match format {
            OutputFormat::Json => print_json(&trends),
            OutputFormat::Csv => {
                print_trends_csv(&trends);
                Ok(())
            }
            OutputFormat::Table => {
                print_trends_table(&trends);
                Ok(())
            }
        };
    }

    let stats = reporter::compute_stats(&log, days);
    if stats.total_queries == 0 {
        println!("{}", "No data yet. Ask a few questions to see history.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Csv => print_history_csv(&stats),
        OutputFormat::Table => print_history_table(&stats),
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_history_table(stats: &HistoryStats) {
    println!("{}", "Query History".bold().cyan());
    println!("{}", "=".repeat(60));
    println!();
    println!("  {} {}", "Total queries:".bold(), stats.total_queries);
    println!(
        "  {} {} ({:.0}%)  Remote: {} ({:.0}%)",
        "Local:        ".bold(),
        stats.local,
        stats.pct(stats.local),
        stats.remote,
        stats.pct(stats.remote)
    );
    println!(
        "  {} {} ({:.0}%)",
        "Fallbacks:    ".bold(),
        stats.fallbacks,
        stats.pct(stats.fallbacks)
    );
    println!();

    println!("{}", "By Provider".bold().cyan());
    println!(
        "  {:<12} {:>6} {:>7} {:>9} {:>10} Top failure",
        "Provider", "Count", "Remote", "Fallback", "Avg ms"
    );
    println!("  {}", "-".repeat(58));
    for (i, p) in stats.provider_stats.iter().enumerate() {
        let line = format!(
            "  {:<12} {:>6} {:>7} {:>9} {:>10} {}",
            truncate(&p.provider, 12),
            p.count,
            p.remote,
            p.fallbacks,
            p.avg_latency_ms,
            p.top_fallback_reason.as_deref().unwrap_or("-"),
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
    println!();

    println!("{}", "By Category".bold().cyan());
    for c in &stats.category_stats {
        println!("  {:<14} {:>6}", c.category.as_str(), c.count);
    }
}

fn print_history_csv(stats: &HistoryStats) {
    println!("provider,count,remote,fallbacks,avg_latency_ms,top_fallback_reason");
    for p in &stats.provider_stats {
        println!(
            "{},{},{},{},{},{}",
            p.provider,
            p.count,
            p.remote,
            p.fallbacks,
            p.avg_latency_ms,
            p.top_fallback_reason.as_deref().unwrap_or(""),
        );
    }
}

fn print_trends_table(trends: &[TrendEntry]) {
    println!("{}", "Daily Queries".bold().cyan());
    println!("  {:<12} {:>8} {:>8} {:>10}", "Date", "Queries", "Remote", "Fallbacks");
    println!("  {}", "-".repeat(42));
    for t in trends {
        println!("  {:<12} {:>8} {:>8} {:>10}", t.date, t.queries, t.remote, t.fallbacks);
    }
}

fn print_trends_csv(trends: &[TrendEntry]) {
    println!("date,queries,remote,fallbacks");
    for t in trends {
        println!("{},{},{},{}", t.date, t.queries, t.remote, t.fallbacks);
    }
}

// ---------------------------------------------------------------------------
// serve
// ---------------------------------------------------------------------------

pub fn run_serve(cfg: &SiteTrackerConfig, dataset: Dataset, addr: Option<&str>) -> Result<()> {
    let addr = addr.unwrap_or(&cfg.server.addr).to_string();
    println!("Site Tracker API running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    let state = AppState::new(dispatcher(cfg), dataset, cfg.clone());
    web::serve(&addr, state)
}

// ---------------------------------------------------------------------------
// config show | init | set | reset
// ---------------------------------------------------------------------------

pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file().is_some_and(|p| p.exists());
    let project_exists = config::project_config_file().is_some_and(|p| p.exists());
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.site-tracker/config.toml");
    print_source(project_exists, ".site-tracker.toml");
    println!("  {} {}", "·".dimmed(), "SITE_TRACKER_* environment variables".dimmed());
    Ok(())
}

fn print_source(exists: bool, name: &str) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    println!("  {}", "Add API keys under [providers.<id>] to enable remote answers.".dimmed());
    Ok(())
}

pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    let shown = if key.ends_with("api_key") {
        Secret::new(value).masked()
    } else {
        value.to_string()
    };
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), shown);
    Ok(())
}

pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!("{} Config reset to defaults at {}", "✓".green().bold(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Truncate to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_commands_parse() {
        assert_eq!(parse_chat_command("  "), ChatCommand::Empty);
        assert_eq!(parse_chat_command("/stats"), ChatCommand::Stats);
        assert_eq!(parse_chat_command("/QUIT"), ChatCommand::Quit);
        assert_eq!(parse_chat_command("/provider deepseek"), ChatCommand::Provider("deepseek".into()));
        assert_eq!(parse_chat_command("/model"), ChatCommand::Model(None));
        assert_eq!(
            parse_chat_command("/model  openai/gpt-4o-mini "),
            ChatCommand::Model(Some("openai/gpt-4o-mini".into()))
        );
        assert_eq!(parse_chat_command("/key sk-123"), ChatCommand::Key("sk-123".into()));
        assert_eq!(parse_chat_command("/provider"), ChatCommand::Unknown("/provider".into()));
        assert_eq!(
            parse_chat_command("where are the sites?"),
            ChatCommand::Query("where are the sites?".into())
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("ab", 2), "ab");
        assert_eq!(truncate("Región Dos", 4), "Reg…");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_str_opt(Some("unknown")), OutputFormat::Table);
    }

    #[test]
    fn missing_dataset_path_is_empty() {
        assert!(load_dataset(None).unwrap().is_empty());
        assert!(load_dataset(Some(Path::new("/nonexistent/sites.json"))).is_err());
    }
}
