//! Scoopi CLI
//!
//! Crawl a documentation site into local Markdown files, and manage the
//! persisted user settings the crawl starts from.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use scoopi::{
    config::SettingsStore,
    error::Result,
    models::{SettingsLayer, parse_list},
    pipeline::{CancellationToken, Crawler},
    services::{HttpLauncher, RendererLauncher},
    storage::LocalStorage,
};

/// Scoopi - documentation site to Markdown scooper
#[derive(Parser, Debug)]
#[command(
    name = "scoopi",
    version,
    about = "Scoop documentation websites into local Markdown files"
)]
struct Cli {
    /// Path to the settings file (default: ~/.scoopi/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a documentation site starting from URL
    Crawl(CrawlArgs),

    /// Show or change persisted settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Seed URL; only pages on its hostname are followed
    url: String,

    /// Maximum link depth from the seed (0-10)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Comma-separated URL patterns to include (`*` matches anything)
    #[arg(long)]
    include: Option<String>,

    /// Comma-separated URL patterns to exclude (`*` matches anything)
    #[arg(long)]
    exclude: Option<String>,

    /// Delay between requests in milliseconds
    #[arg(long)]
    delay: Option<u64>,

    /// Page load timeout in milliseconds
    #[arg(long)]
    timeout: Option<u64>,

    /// User agent sent with every request
    #[arg(long)]
    user_agent: Option<String>,

    /// Show the browser window while crawling
    #[arg(long)]
    headed: bool,

    /// Fetch pages over plain HTTP instead of a headless browser
    #[arg(long)]
    http: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl CrawlArgs {
    /// Invocation-time settings layer.
    fn overrides(&self) -> SettingsLayer {
        SettingsLayer {
            max_depth: self.depth,
            delay_ms: self.delay,
            timeout_ms: self.timeout,
            output_dir: self.output.clone(),
            headless: self.headed.then_some(false),
            user_agent: self.user_agent.clone(),
            include_patterns: self.include.as_deref().map(parse_list),
            exclude_patterns: self.exclude.as_deref().map(parse_list),
            verbose: self.verbose.then_some(true),
            ..SettingsLayer::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show every setting and where its value comes from
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective value of one setting
    Get { key: String },

    /// Persist a setting (lists are comma-separated)
    Set { key: String, value: String },

    /// Remove all customizations
    Reset,

    /// Print the settings file location
    Path,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => SettingsStore::at(path),
        None => match SettingsStore::open_default() {
            Ok(store) => store,
            Err(e) => {
                init_logging(false);
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let verbose = match &cli.command {
        Command::Crawl(args) => {
            args.verbose || store.load().is_ok_and(|layer| layer.verbose == Some(true))
        }
        Command::Config { .. } => false,
    };
    init_logging(verbose);

    match run(cli.command, &store).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            if verbose {
                log::error!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, store: &SettingsStore) -> Result<()> {
    match command {
        Command::Crawl(args) => run_crawl(store, args).await,
        Command::Config { action } => run_config(store, action),
    }
}

async fn run_crawl(store: &SettingsStore, args: CrawlArgs) -> Result<()> {
    let settings = store.effective(&args.overrides())?;
    let config = settings.crawl_config();

    let launcher = select_launcher(args.http);
    let storage = Arc::new(LocalStorage::new(config.output_dir.clone()));
    let crawler = Crawler::new(config, launcher, storage)?;

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupt received, stopping after the current page...");
                cancel.cancel();
            }
        })
    };

    let outcome = crawler.crawl(&args.url, &cancel).await;
    watcher.abort();
    let outcome = outcome?;

    if outcome.is_interrupted() {
        log::warn!(
            "Crawl interrupted: {} page(s) saved to {}",
            outcome.pages_written,
            crawler.config().output_dir.display()
        );
    } else {
        log::info!(
            "Crawl complete: {} page(s) saved to {}",
            outcome.pages_written,
            crawler.config().output_dir.display()
        );
    }
    if outcome.pages_failed > 0 {
        log::warn!("{} page(s) could not be processed", outcome.pages_failed);
    }

    Ok(())
}

#[cfg(feature = "browser")]
fn select_launcher(http: bool) -> Arc<dyn RendererLauncher> {
    if http {
        Arc::new(HttpLauncher)
    } else {
        Arc::new(scoopi::services::BrowserLauncher)
    }
}

#[cfg(not(feature = "browser"))]
fn select_launcher(http: bool) -> Arc<dyn RendererLauncher> {
    if !http {
        log::debug!("Built without the browser feature, using the HTTP renderer");
    }
    Arc::new(HttpLauncher)
}

fn run_config(store: &SettingsStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { json } => show_config(store, json)?,

        ConfigAction::Get { key } => {
            let setting = store.get(&key)?;
            let marker = if setting.customized { "custom" } else { "default" };
            println!("{} = {} ({})", setting.key, setting.value, marker);
        }

        ConfigAction::Set { key, value } => {
            let stored = store.set(&key, &value)?;
            println!("Set {key} = {stored}");
        }

        ConfigAction::Reset => {
            if store.reset()? {
                println!("Configuration reset to defaults.");
            } else {
                println!("No configuration file found. Nothing to reset.");
            }
        }

        ConfigAction::Path => println!("{}", store.path().display()),
    }
    Ok(())
}

fn show_config(store: &SettingsStore, json: bool) -> Result<()> {
    let entries = store.entries()?;

    if json {
        let mut settings = serde_json::Map::new();
        for (category, values) in &entries {
            for setting in values {
                settings.insert(
                    setting.key.clone(),
                    serde_json::json!({
                        "category": category,
                        "value": setting.value,
                        "customized": setting.customized,
                    }),
                );
            }
        }
        let doc = serde_json::json!({
            "path": store.path(),
            "exists": store.exists(),
            "settings": settings,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Config file: {}", store.path().display());
    println!(
        "Status: {}",
        if store.exists() {
            "exists"
        } else {
            "not found (using defaults)"
        }
    );
    println!();

    let mut customized = 0;
    for (category, values) in &entries {
        println!("{}:", category.to_uppercase());
        for setting in values {
            let marker = if setting.customized {
                customized += 1;
                "(custom)"
            } else {
                "(default)"
            };
            println!("  {:<18} = {} {}", setting.key, setting.value, marker);
        }
        println!();
    }

    if customized > 0 {
        println!("{customized} custom setting(s) set");
    } else {
        println!("All settings are using default values.");
    }
    Ok(())
}
