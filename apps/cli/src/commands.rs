//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::info;
use url::Url;

use personlink_core::{
    ChainOutcome, ChainStop, ConnectionTraversal, DbInsertListener, TraversalListener,
};
use personlink_crawler::{HttpFetcher, ScanOptions};
use personlink_shared::{
    AppConfig, ParagraphLink, PersonConnection, PersonDetails, PersonLinkError, TraversalConfig,
    init_config, load_config,
};
use personlink_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// personlink — follow biography links from one person to the next.
#[derive(Parser)]
#[command(
    name = "personlink",
    version,
    about = "Find the people a biography page links to, with the sentences that connect them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Find the first person linked from a biography page.
    Run {
        /// Biography URL to start from (defaults to `defaults.start_url`).
        url: Option<String>,

        /// Follow found connections for this many hops.
        #[arg(long)]
        hops: Option<u32>,

        /// Database file (defaults to `storage.db_path`).
        #[arg(long, env = "PERSONLINK_DB")]
        db: Option<String>,

        /// Disable the progress bar.
        #[arg(long)]
        no_progress: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a stored person and its recorded connections.
    Show {
        /// Biography URL of the person.
        url: String,

        /// Database file (defaults to `storage.db_path`).
        #[arg(long, env = "PERSONLINK_DB")]
        db: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so `--json`
/// output stays clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "personlink=info",
        1 => "personlink=debug",
        _ => "personlink=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            url,
            hops,
            db,
            no_progress,
            json,
        } => cmd_run(url.as_deref(), hops, db.as_deref(), no_progress, json).await,
        Command::Show { url, db } => cmd_show(&url, db.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    url: Option<&str>,
    hops: Option<u32>,
    db: Option<&str>,
    no_progress: bool,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    let mut traversal_config = TraversalConfig::from(&config);
    if let Some(hops) = hops {
        if hops == 0 {
            return Err(eyre!("--hops must be at least 1"));
        }
        traversal_config.max_hops = hops;
    }

    let start_url = url.unwrap_or(config.defaults.start_url.as_str());
    let start = Url::parse(start_url).map_err(|e| eyre!("invalid URL '{start_url}': {e}"))?;
    let base_url = Url::parse(&traversal_config.base_url)
        .map_err(|e| eyre!("invalid site.base_url '{}': {e}", traversal_config.base_url))?;

    let storage = Storage::open(&resolve_db_path(&config, db)?).await?;
    let options =
        ScanOptions::new(base_url).with_exclude_patterns(&traversal_config.exclude_patterns);
    let mut traversal = ConnectionTraversal::new(HttpFetcher::new(&traversal_config)?, options);
    traversal.add_listener(Arc::new(DbInsertListener::new(Arc::new(storage))));

    let progress = (!no_progress && !json).then(|| Arc::new(CliProgress::new()));
    if let Some(progress) = &progress {
        traversal.add_listener(progress.clone());
    }

    info!(url = %start, hops = traversal_config.max_hops, "starting traversal");
    let result = traversal
        .follow_chain(&start, traversal_config.max_hops)
        .await;
    if let Some(progress) = &progress {
        progress.finish();
    }
    let chain = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chain_json(&chain))?);
    } else {
        print_chain(&chain);
    }

    for failure in chain.hops.iter().flat_map(|hop| &hop.listener_failures) {
        eprintln!("warning: {}", PersonLinkError::from(failure.clone()));
    }

    Ok(())
}

async fn cmd_show(url: &str, db: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let storage = Storage::open(&resolve_db_path(&config, db)?).await?;

    let Some(person) = storage.get_person(url).await? else {
        return Err(eyre!("no stored person for '{url}'"));
    };

    println!();
    println!("  {}", describe(&person));
    println!("  {}", person.url);

    let connections = storage.connections_from(url).await?;
    if connections.is_empty() {
        println!();
        println!("  No recorded connections.");
    }
    for connection in connections {
        println!();
        println!("  -> {}", describe(&connection.to));
        println!("     {}", connection.to.url);
        println!("     \"{}\"", connection.context);
        println!("     recorded {}", connection.created_at);
    }
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn resolve_db_path(config: &AppConfig, db: Option<&str>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(config.db_path()?),
    }
}

/// `Name (born X, died Y)`.
fn describe(person: &PersonDetails) -> String {
    match &person.death_date {
        Some(died) => format!("{} (born {}, died {died})", person.name, person.birth_date),
        None => format!("{} (born {})", person.name, person.birth_date),
    }
}

fn print_chain(chain: &ChainOutcome) {
    println!();
    for hop in &chain.hops {
        println!("  {}", describe(&hop.source));
        match &hop.connection {
            Some(connection) => {
                println!("    -> {}", describe(&connection.connection_person));
                println!("       \"{}\"", connection.context);
            }
            None => println!("    (no linked person among {} links)", hop.candidates),
        }
        println!(
            "    probed {}/{} links in {:.1}s",
            hop.probed,
            hop.candidates,
            hop.elapsed.as_secs_f64()
        );
        println!();
    }

    match &chain.stop {
        ChainStop::MaxHops | ChainStop::Exhausted => {}
        ChainStop::Revisit { url } => println!("  Stopped: {url} was already visited."),
        ChainStop::Failed { url, message } => println!("  Stopped at {url}: {message}"),
    }
}

fn chain_json(chain: &ChainOutcome) -> serde_json::Value {
    let hops: Vec<_> = chain
        .hops
        .iter()
        .map(|hop| {
            json!({
                "person": hop.source,
                "connection": hop.connection,
                "candidates": hop.candidates,
                "probed": hop.probed,
            })
        })
        .collect();

    let stop = match &chain.stop {
        ChainStop::MaxHops => json!({ "reason": "max-hops" }),
        ChainStop::Exhausted => json!({ "reason": "exhausted" }),
        ChainStop::Revisit { url } => json!({ "reason": "revisit", "url": url }),
        ChainStop::Failed { url, message } => {
            json!({ "reason": "failed", "url": url, "message": message })
        }
    };

    json!({ "hops": hops, "stop": stop })
}

// ---------------------------------------------------------------------------
// CLI progress listener
// ---------------------------------------------------------------------------

/// Progress bar driven by traversal events: sized from the candidate count,
/// ticked once per probed candidate.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )
        .map(|style| {
            style
                .progress_chars("=> ")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        })
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message("Fetching source page");
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[async_trait]
impl TraversalListener for CliProgress {
    fn name(&self) -> &str {
        "progress"
    }

    async fn on_candidate_count(&self, source_url: &str, count: usize) -> personlink_shared::Result<()> {
        self.bar.set_length(count as u64);
        self.bar.set_position(0);
        self.bar.set_message(format!("Probing links from {source_url}"));
        Ok(())
    }

    async fn on_candidate_probed(
        &self,
        candidate: &ParagraphLink,
        _resolved: bool,
    ) -> personlink_shared::Result<()> {
        self.bar.inc(1);
        self.bar.set_message(candidate.text.clone());
        Ok(())
    }

    async fn on_connection_found(
        &self,
        _person: &PersonDetails,
        connection: &PersonConnection,
    ) -> personlink_shared::Result<()> {
        self.bar
            .set_message(format!("Found {}", connection.connection_person.name));
        Ok(())
    }
}
