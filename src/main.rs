use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use site_tracker_ai::cli::{self, OutputFormat};
use site_tracker_ai::config::{self, SiteTrackerConfig};

#[derive(Debug, Parser)]
#[command(name = "site-tracker-ai")]
#[command(about = "AI query assistant for the site tracker dashboard")]
struct App {
    /// Site dataset: a JSON array of records or a sheet `{"values": [...]}` export
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ask one question and print the answer
    Ask {
        /// The question
        #[arg(trailing_var_arg = true, required = true)]
        query: Vec<String>,
        /// Provider to use instead of the configured one
        #[arg(long)]
        provider: Option<String>,
        /// Model override for the provider
        #[arg(long)]
        model: Option<String>,
    },
    /// Interactive chat (/stats, /provider, /model, /key, /help, /quit)
    Chat,
    /// Look for data quality issues in the dataset
    Issues {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Automated insights: quality score, coverage, trends
    Insights {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Geographic coverage analysis and suggested site placements
    Geo {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// List providers, default models and key status
    Providers,
    /// Send a hello prompt to a provider
    TestConnection {
        /// Provider id
        #[arg(default_value = "deepseek")]
        provider: String,
        /// API key to test instead of the configured one
        #[arg(long)]
        key: Option<String>,
        /// Model override
        #[arg(long)]
        model: Option<String>,
        /// Try each known DeepSeek endpoint variant in turn
        #[arg(long)]
        probe_deepseek: bool,
    },
    /// Summarize the query log
    History {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
        /// Only include the last N days of data
        #[arg(long)]
        days: Option<u32>,
        /// Per-day breakdown instead of totals
        #[arg(long)]
        daily: bool,
    },
    /// Run the JSON API server
    Serve {
        /// Listen address (default from [server].addr)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration (keys masked)
    Show,
    /// Write a default config to ~/.site-tracker/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set one dotted key, e.g. `remote.timeout_ms 20000`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn init_tracing(cfg: &SiteTrackerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let app = App::parse();
    // The log level lives in the config, so layer diagnostics wait for the subscriber.
    let (cfg, warnings) = config::load_with_warnings();
    init_tracing(&cfg);
    config::log_warnings(&warnings);

    let dataset = || cli::load_dataset(app.data.as_deref());

    match app.command {
        Commands::Ask {
            ref query,
            ref provider,
            ref model,
        } => cli::run_ask(&cfg, &dataset()?, &query.join(" "), provider.as_deref(), model.clone()),
        Commands::Chat => cli::run_chat(&cfg, &dataset()?),
        Commands::Issues { ref format } => {
            cli::run_issues(&cfg, &dataset()?, OutputFormat::from_str_opt(Some(format)))
        }
        Commands::Insights { ref format } => {
            cli::run_insights(&cfg, &dataset()?, OutputFormat::from_str_opt(Some(format)))
        }
        Commands::Geo { ref format } => {
            cli::run_geo(&cfg, &dataset()?, OutputFormat::from_str_opt(Some(format)))
        }
        Commands::Providers => cli::run_providers(&cfg),
        Commands::TestConnection {
            ref provider,
            ref key,
            ref model,
            probe_deepseek,
        } => cli::run_test_connection(&cfg, provider, key.clone(), model.as_deref(), probe_deepseek),
        Commands::History {
            ref format,
            days,
            daily,
        } => cli::run_history(&cfg, OutputFormat::from_str_opt(Some(format)), days, daily),
        Commands::Serve { ref addr } => cli::run_serve(&cfg, dataset()?, addr.as_deref()),
        Commands::Config { ref action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(*force),
            ConfigAction::Set { key, value } => cli::run_config_set(key, value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
