//! PageCrunch main entry point
//!
//! This is the command-line interface for the PageCrunch crawl-state core.

use chrono::Utc;
use clap::Parser;
use pagecrunch::config::{load_config_with_hash, Config};
use pagecrunch::crawler::{FetchedPage, PageProcessor, Precheck};
use pagecrunch::robots::RobotsRules;
use pagecrunch::storage::open_store;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// PageCrunch: crawl-state tracking and content conversion
///
/// PageCrunch decides which URLs need refetching, detects content changes
/// between crawls, extracts the main content of fetched pages and converts
/// it to markdown.
#[derive(Parser, Debug)]
#[command(name = "pagecrunch")]
#[command(version)]
#[command(about = "Crawl-state tracking and content conversion", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings
    #[arg(long, conflicts_with_all = ["stats", "duplicates", "page"])]
    dry_run: bool,

    /// Show statistics from the tracking database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "duplicates", "page"])]
    stats: bool,

    /// List groups of URLs with identical content and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "page"])]
    duplicates: bool,

    /// Process a saved page fetched from this URL
    #[arg(long, value_name = "URL", requires = "html")]
    page: Option<String>,

    /// HTML file holding the saved page body
    #[arg(long, value_name = "FILE", requires = "page")]
    html: Option<PathBuf>,

    /// robots.txt file for the page's domain
    #[arg(long, value_name = "FILE", requires = "page")]
    robots: Option<PathBuf>,

    /// HTTP status the page was fetched with
    #[arg(long, default_value_t = 200, requires = "page")]
    status: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.duplicates {
        handle_duplicates(&config)?;
    } else if let (Some(url), Some(html)) = (cli.page.as_deref(), cli.html.as_deref()) {
        handle_page(config, url, html, cli.robots.as_deref(), cli.status).await?;
    } else {
        println!("Nothing to do. Pass --dry-run, --stats, --duplicates or --page.");
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagecrunch=info,warn"),
            1 => EnvFilter::new("pagecrunch=debug,info"),
            2 => EnvFilter::new("pagecrunch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so that emitted JSON on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows effective settings
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let policy = config.refresh.policy()?;
    let scope = config.crawl.scope()?;

    println!("=== PageCrunch Dry Run ===\n");

    println!("Crawl:");
    println!("  Start URL: {}", config.crawl.start_url);
    println!("  Domain: {}", scope.domain());
    println!("  Ignore subdomains: {}", config.crawl.ignore_subdomains);
    if let Some(prefix) = &config.crawl.path_prefix {
        println!("  Path prefix: {}", prefix);
    }
    println!("  User agent: {}", config.crawl.user_agent);
    println!("  Max concurrent pages: {}", config.crawl.max_concurrent_pages);

    println!("\nRefresh:");
    println!("  Mode: {}", policy.mode);
    println!("  Days: {}", policy.days);
    println!("  Output cache: {}", policy.output_cache);

    println!("\nContent:");
    println!("  Mode: {:?}", config.content.mode);
    println!("  Markdown: {}", config.markdown.enabled);

    println!("\nPrime directive:");
    println!("  Enabled: {}", config.prime_directive.enabled);
    println!("  Honor nofollow: {}", config.prime_directive.honor_nofollow);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use pagecrunch::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.storage.database_path);

    let store = open_store(
        Path::new(&config.storage.database_path),
        config.storage.max_connections,
    )?;
    let stats = load_statistics(&store)?;

    print_statistics(&stats);

    Ok(())
}

/// Handles the --duplicates mode: lists URLs sharing identical content
fn handle_duplicates(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use pagecrunch::output::print_duplicates;
    use pagecrunch::storage::TrackingStore;

    let store = open_store(
        Path::new(&config.storage.database_path),
        config.storage.max_connections,
    )?;
    let groups = store.duplicate_groups()?;

    print_duplicates(&groups);

    Ok(())
}

/// Handles the --page mode: runs one saved page through the pipeline
async fn handle_page(
    config: Config,
    url: &str,
    html_path: &Path,
    robots_path: Option<&Path>,
    status: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(
        Path::new(&config.storage.database_path),
        config.storage.max_connections,
    )?;
    let processor = Arc::new(PageProcessor::new(&config, Arc::new(store))?);

    let now = Utc::now();
    let decision = match processor.precheck(url, now)? {
        Precheck::Decided(decision) => decision,
        Precheck::Skipped(emission) => {
            println!("{}", serde_json::to_string(&emission)?);
            return Ok(());
        }
    };

    let emission = if decision.is_fetch() {
        let html = fs::read_to_string(html_path)?;
        let robots = match robots_path {
            Some(path) => Some(RobotsRules::from_content(&fs::read_to_string(path)?)),
            None => None,
        };
        let page = FetchedPage::new(url, status, &html);

        // Parsing and the store write are blocking work
        let worker = Arc::clone(&processor);
        let emission = tokio::task::spawn_blocking(move || {
            worker.process(&page, robots.as_ref(), now)
        })
        .await??;
        Some(emission)
    } else {
        tracing::info!("Not refetching {} ({:?})", url, decision);
        processor.cached_emission(url, decision)?
    };

    match emission {
        Some(emission) => println!("{}", serde_json::to_string(&emission)?),
        None => tracing::info!("Nothing emitted for {}", url),
    }

    Ok(())
}
