//! Rubric-Harvest main entry point
//!
//! This is the command-line interface for the resumable catalog harvester.

use anyhow::Context;
use clap::Parser;
use rubric_harvest::config::{load_config_with_hash, Config};
use rubric_harvest::crawler::{build_driver, import_codes, run_harvest};
use rubric_harvest::session::ProxyPool;
use rubric_harvest::storage::open_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Rubric-Harvest: a resumable catalog harvester
///
/// Rubric-Harvest walks the categorized listings of a rate-limited online
/// catalog through rotating proxy identities, storing every page of records
/// as it goes so an interrupted crawl resumes exactly where it stopped.
#[derive(Parser, Debug)]
#[command(name = "rubric-harvest")]
#[command(version)]
#[command(about = "A resumable catalog harvester", long_about = None)]
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

    /// Validate config and show it without touching the catalog
    #[arg(long, conflicts_with_all = ["stats", "import_codes", "resolve", "prepare"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "import_codes", "resolve", "prepare"])]
    stats: bool,

    /// Import a JSON map of entity names to identifier lists and exit
    #[arg(long, value_name = "FILE")]
    import_codes: Option<PathBuf>,

    /// Look up the catalog link of every unresolved identifier and exit
    #[arg(long)]
    resolve: bool,

    /// Count the categories of every resolved entity and exit
    #[arg(long)]
    prepare: bool,

    /// Number of crawl passes to run (0 runs until stopped)
    #[arg(long, value_name = "N")]
    passes: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }
    if cli.stats {
        return handle_stats(&config);
    }

    // The pre-crawl stages may be chained in one invocation
    let staged = cli.import_codes.is_some() || cli.resolve || cli.prepare;
    if let Some(path) = &cli.import_codes {
        handle_import(&config, path)?;
    }
    if cli.resolve || cli.prepare {
        handle_lookup(config.clone(), &config_hash, cli.resolve, cli.prepare).await?;
    }
    if staged {
        return Ok(());
    }

    handle_crawl(config, &config_hash, cli.passes).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("rubric_harvest=info,warn"),
            1 => EnvFilter::new("rubric_harvest=debug,info"),
            2 => EnvFilter::new("rubric_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Rubric-Harvest Dry Run ===\n");

    println!("Catalog:");
    println!("  Base URL: {}", config.catalog.base_url);
    println!("  Page size: {}", config.catalog.page_size);
    println!("  Wait timeout: {}ms", config.catalog.wait_timeout_ms);
    println!(
        "  Courtesy delay: {}ms (+ up to {}ms jitter)",
        config.catalog.courtesy_delay_ms, config.catalog.courtesy_jitter_ms
    );
    println!("  User agent: {}", config.catalog.user_agent);

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Rotate on transient: {}", config.retry.rotate_on_transient);
    println!("  Retry delay: {}ms", config.retry.retry_delay_ms);

    let pool = ProxyPool::from_config(&config.proxy);
    println!("\nProxy identities ({}):", pool.ceiling());
    println!("  First: {}", pool.current());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nDriver:");
    println!("  Cooldown: {}s", config.driver.cooldown_secs);
    if config.driver.max_passes == 0 {
        println!("  Passes: until stopped");
    } else {
        println!("  Passes: {}", config.driver.max_passes);
    }

    if config.interest.categories.is_empty() {
        println!("\nCategories of interest: all");
    } else {
        println!(
            "\nCategories of interest ({}): {}",
            config.interest.categories.len(),
            config.interest.categories.join(", ")
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use rubric_harvest::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles --import-codes: loads names and identifiers into the database
fn handle_import(config: &Config, path: &Path) -> anyhow::Result<()> {
    let mut storage = open_storage(Path::new(&config.storage.database_path))?;
    let imported = import_codes(&mut storage, path)
        .with_context(|| format!("importing identifiers from {}", path.display()))?;
    println!("✓ Imported {} names", imported);
    Ok(())
}

/// Handles --resolve and --prepare
async fn handle_lookup(
    config: Config,
    config_hash: &str,
    resolve: bool,
    prepare: bool,
) -> anyhow::Result<()> {
    let mut driver = build_driver(config, config_hash)?;

    if resolve {
        let report = driver.resolve_links().await.context("link resolution")?;
        println!(
            "✓ Resolution: {} names, {} already resolved, {} resolved, {} not found",
            report.names, report.already_resolved, report.resolved, report.not_found
        );
    }

    if prepare {
        let report = driver
            .prepare_categories()
            .await
            .context("category census")?;
        println!(
            "✓ Census: {} entities prepared, {} skipped, {} aborted, {} categories kept",
            report.prepared, report.skipped, report.aborted, report.categories_kept
        );
    }

    Ok(())
}

/// Handles the main crawl loop
async fn handle_crawl(config: Config, config_hash: &str, passes: Option<u32>) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} with page size {}",
        config.catalog.base_url,
        config.catalog.page_size
    );

    match run_harvest(config, config_hash, passes).await {
        Ok(()) => {
            tracing::info!("Harvest stopped cleanly");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
