//! WikiVault main entry point
//!
//! Command-line interface for the MediaWiki fleet tracker.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wikivault::archive::{format_bytes, ArchiveClient, ArchiveMatcher};
use wikivault::config::{load_config_with_hash, Config};
use wikivault::mediawiki::MediaWikiClient;
use wikivault::scheduler::{ArchiveScheduler, CollectionScheduler};
use wikivault::storage::{shared, Repository, SharedRepository, SqliteRepository};
use wikivault::{CollectOutcome, Collector};

/// WikiVault: a MediaWiki fleet tracker
///
/// WikiVault tracks externally hosted MediaWiki sites: it detects their
/// API endpoints, collects siteinfo statistics on a schedule and
/// cross-references archive.org for public backups.
#[derive(Parser, Debug)]
#[command(name = "wikivault")]
#[command(version)]
#[command(about = "A MediaWiki fleet tracker", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run both schedulers until interrupted
    Run,

    /// Register a new site to track
    Add {
        /// Base URL of the wiki, e.g. https://wiki.example.org
        url: String,
    },

    /// Collect statistics for one site right now
    Collect {
        /// Site id
        id: i64,
    },

    /// Check archive.org backups for one site right now
    CheckArchives {
        /// Site id
        id: i64,
    },

    /// List tracked sites with their latest statistics
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let repo = shared(SqliteRepository::new(Path::new(
        &config.storage.database_path,
    ))?);

    match cli.command {
        Command::Run => handle_run(config, repo).await?,
        Command::Add { url } => handle_add(repo, &url).await?,
        Command::Collect { id } => handle_collect(&config, repo, id).await?,
        Command::CheckArchives { id } => handle_check_archives(&config, repo, id).await?,
        Command::List => handle_list(repo).await?,
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
            0 => EnvFilter::new("wikivault=info,warn"),
            1 => EnvFilter::new("wikivault=debug,info"),
            2 => EnvFilter::new("wikivault=trace,debug"),
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

/// Runs both schedulers until Ctrl-C
async fn handle_run(
    config: Config,
    repo: SharedRepository<SqliteRepository>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mediawiki = Arc::new(MediaWikiClient::new(&config.http)?);
    let collector = Arc::new(Collector::new(repo.clone(), mediawiki));

    let archive_client = Arc::new(ArchiveClient::new(&config.http, &config.archive.endpoint)?);
    let matcher = Arc::new(ArchiveMatcher::new(repo.clone(), archive_client));

    let collection =
        CollectionScheduler::new(repo.clone(), collector, config.collection.clone());
    let archive = ArchiveScheduler::new(repo, matcher, config.archive.clone());

    collection.start();
    archive.start();

    tracing::info!("running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    collection.stop().await;
    archive.stop().await;

    Ok(())
}

/// Registers a new site
async fn handle_add(
    repo: SharedRepository<SqliteRepository>,
    url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    // Reject junk before it lands in the database
    url::Url::parse(url)?;

    let site = {
        let mut repo = repo.lock().await;
        repo.create_site(url)?
    };

    println!("Added site {} ({})", site.id, site.url);
    println!("Statistics will be collected on the next scheduler cycle,");
    println!("or run `wikivault collect {}` to collect now.", site.id);
    Ok(())
}

/// Collects statistics for one site immediately
async fn handle_collect(
    config: &Config,
    repo: SharedRepository<SqliteRepository>,
    id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mediawiki = Arc::new(MediaWikiClient::new(&config.http)?);
    let collector = Collector::new(repo.clone(), mediawiki);

    match collector.collect_one(id).await? {
        CollectOutcome::Collected => {
            let repo = repo.lock().await;
            let site = repo.get_site(id)?;
            println!(
                "Collected {} ({})",
                site.sitename.as_deref().unwrap_or("?"),
                site.url
            );
            if let Some(snapshot) = repo.latest_snapshot(id)? {
                println!(
                    "  pages={} articles={} edits={} users={}",
                    snapshot.pages, snapshot.articles, snapshot.edits, snapshot.users
                );
            }
        }
        CollectOutcome::RemovedAsDuplicate => {
            println!("Site {id} duplicated an older registration and was removed");
        }
    }

    Ok(())
}

/// Checks archive.org for one site immediately
async fn handle_check_archives(
    config: &Config,
    repo: SharedRepository<SqliteRepository>,
    id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let archive_client = Arc::new(ArchiveClient::new(&config.http, &config.archive.endpoint)?);
    let matcher = ArchiveMatcher::new(repo.clone(), archive_client);

    match matcher.collect_archives(id).await {
        Ok(report) => {
            println!(
                "Archive check done: found={} imported={} updated={}",
                report.found, report.imported, report.updated
            );

            let repo = repo.lock().await;
            for record in repo.archive_records_for_site(id)? {
                let size = record
                    .item_size
                    .map(format_bytes)
                    .unwrap_or_else(|| "?".to_string());
                let dump_date = record
                    .dump_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!("  {} ({}, {})", record.ia_identifier, dump_date, size);
            }
        }
        Err(e) => {
            matcher.record_archive_error(id, &e.to_string()).await?;
            return Err(e.into());
        }
    }

    Ok(())
}

/// Lists tracked sites with their latest snapshot
async fn handle_list(
    repo: SharedRepository<SqliteRepository>,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = repo.lock().await;
    let sites = repo.list_sites(u32::MAX)?;

    if sites.is_empty() {
        println!("No sites tracked yet. Add one with `wikivault add <url>`.");
        return Ok(());
    }

    for site in sites {
        let status = site.status.to_db_string();
        let name = site.sitename.as_deref().unwrap_or("-");
        println!("[{}] {} {} ({})", site.id, status, site.url, name);

        if let Some(snapshot) = repo.latest_snapshot(site.id)? {
            println!(
                "      pages={} articles={} edits={} users={} active={}",
                snapshot.pages,
                snapshot.articles,
                snapshot.edits,
                snapshot.users,
                snapshot.active_users
            );
        }
        if site.has_archive {
            println!(
                "      archives: {} item(s) on archive.org",
                repo.count_archive_records(site.id)?
            );
        }
        if let Some(error) = &site.last_error {
            println!("      last error: {error}");
        }
    }

    Ok(())
}
