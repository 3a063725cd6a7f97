//! Command-line front end for the quote store.
//!
//! # Responsibility
//! - Map user commands onto store and reconciler operations.
//! - Turn every outcome into one user-visible line and an exit code.
//!
//! # Invariants
//! - No store or sync failure aborts the process with a panic.
//! - An unusable database degrades to session-only storage with a warning.

use clap::{Parser, Subcommand};
use log::{info, warn};
use quotekeeper_core::{
    categories, core_version, init_logging, init_stderr_logging, CategoryFilter, CycleOutcome,
    HttpQuoteSource, MemoryKvRepository, QuoteKeeperConfig, QuoteStore, Reconciler,
    SqliteKvRepository, ALL_CATEGORIES,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "quotekeeper", version, about = "Keep, filter and sync a list of quotes")]
struct Cli {
    /// SQLite file holding durable records (overrides QUOTEKEEPER_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Remote endpoint used by `sync` and `watch` (overrides QUOTEKEEPER_REMOTE_URL).
    #[arg(long, global = true)]
    remote_url: Option<String>,

    /// Log at the configured level to stderr instead of warnings only.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show a random quote, using the remembered filter unless one is given.
    Show {
        #[arg(long)]
        category: Option<String>,
    },
    /// Add a quote.
    Add { text: String, category: String },
    /// List known categories.
    Categories,
    /// Remember a category filter (`all` clears it) and show a quote.
    Filter { category: String },
    /// Import quotes from a .json file.
    Import { file: PathBuf },
    /// Export all quotes to a timestamped .json file.
    Export {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Fetch remote quotes once and merge them.
    Sync,
    /// Sync now and then on the configured interval until Ctrl+C.
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match QuoteKeeperConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(db) = cli.db.clone() {
        config.db_path = db;
    }
    if let Some(url) = cli.remote_url.clone() {
        config.remote_url = url;
    }

    if let Err(err) = start_logging(&config, cli.verbose) {
        eprintln!("logging disabled: {err}");
    }

    info!(
        "event=cli_start module=cli status=ok version={} db_path={}",
        core_version(),
        config.db_path.display()
    );
    let store = open_store(&config);
    run(cli.command, &store, &config).await
}

fn start_logging(config: &QuoteKeeperConfig, verbose: bool) -> Result<(), String> {
    match &config.log_dir {
        Some(dir) => init_logging(&config.log_level, &dir.to_string_lossy()),
        None if verbose => init_stderr_logging(&config.log_level),
        None => init_stderr_logging("warn"),
    }
}

fn open_store(config: &QuoteKeeperConfig) -> QuoteStore {
    match SqliteKvRepository::open(&config.db_path) {
        Ok(durable) => QuoteStore::open(durable, MemoryKvRepository::new()),
        Err(err) => {
            warn!(
                "event=store_open module=cli status=fallback path={} error={}",
                config.db_path.display(),
                err
            );
            eprintln!("Storage unavailable ({err}); changes will not be saved.");
            QuoteStore::open(MemoryKvRepository::new(), MemoryKvRepository::new())
        }
    }
}

async fn run(command: Command, store: &QuoteStore, config: &QuoteKeeperConfig) -> ExitCode {
    match command {
        Command::Show { category } => {
            let filter = match category {
                Some(category) => CategoryFilter::parse(&category),
                None => store.last_filter().unwrap_or_default(),
            };
            show(store, &filter)
        }
        Command::Add { text, category } => match store.add(&text, &category) {
            Ok(outcome) => {
                println!("Quote added successfully!");
                warn_if_unsaved(outcome.persist.failure());
                ExitCode::SUCCESS
            }
            Err(err) => {
                println!("Please fill out both fields: {err}.");
                ExitCode::FAILURE
            }
        },
        Command::Categories => {
            println!("{ALL_CATEGORIES}");
            for category in categories(&store.quotes()) {
                println!("{category}");
            }
            ExitCode::SUCCESS
        }
        Command::Filter { category } => {
            let filter = CategoryFilter::parse(&category);
            warn_if_unsaved(store.remember_filter(&filter).failure());
            show(store, &filter)
        }
        Command::Import { file } => match store.import_file(&file) {
            Ok(report) => {
                println!("{}", report.summary());
                ExitCode::SUCCESS
            }
            Err(err) => {
                println!("Import failed: {err}");
                ExitCode::FAILURE
            }
        },
        Command::Export { dir } => match store.export_to_dir(&dir) {
            Ok(path) => {
                println!("Exported {} quote(s) to {}", store.len(), path.display());
                ExitCode::SUCCESS
            }
            Err(err) => {
                println!("Export failed: {err}");
                ExitCode::FAILURE
            }
        },
        Command::Sync => {
            let reconciler = build_reconciler(store, config);
            let report = reconciler.sync_now().await;
            println!("{}", report.summary());
            match report.outcome {
                CycleOutcome::FetchFailed(_) => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            }
        }
        Command::Watch => watch(Arc::new(build_reconciler(store, config)), config).await,
    }
}

fn show(store: &QuoteStore, filter: &CategoryFilter) -> ExitCode {
    match store.show_random(filter, &mut rand::thread_rng()) {
        Some(quote) => {
            println!("\"{}\"", quote.text);
            match &quote.author {
                Some(author) => println!("  - {author} ({})", quote.category),
                None => println!("  - {}", quote.category),
            }
        }
        None => println!("No quotes available for this category."),
    }
    ExitCode::SUCCESS
}

fn build_reconciler(store: &QuoteStore, config: &QuoteKeeperConfig) -> Reconciler {
    let source = HttpQuoteSource::new(config.remote_url.clone()).with_limit(config.remote_limit);
    info!(
        "event=reconciler_build module=cli status=ok endpoint={} limit={}",
        source.endpoint(),
        config.remote_limit
    );
    Reconciler::new(store.clone(), Arc::new(source), config.fetch_timeout)
}

async fn watch(reconciler: Arc<Reconciler>, config: &QuoteKeeperConfig) -> ExitCode {
    println!("{}", reconciler.sync_now().await.summary());

    let cancel = CancellationToken::new();
    let scheduler = reconciler.spawn_periodic(config.sync_interval, cancel.clone());
    println!(
        "Syncing every {}s; press Ctrl+C to stop.",
        config.sync_interval.as_secs()
    );

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=signal_wait module=cli status=error error={err}");
    }
    info!("event=watch_stop module=cli status=ok");
    cancel.cancel();
    if let Err(err) = scheduler.await {
        warn!("event=watch_stop module=cli status=error error={err}");
    }
    println!("Stopped; {} quote(s) in store.", reconciler.store().len());
    ExitCode::SUCCESS
}

fn warn_if_unsaved(failure: Option<&str>) {
    if let Some(reason) = failure {
        println!("Warning: {reason}. The change is kept for this session only.");
    }
}
