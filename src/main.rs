//! Activity-Collector main entry point
//!
//! This is the command-line host for the collector: it persists each target's state in
//! SQLite, schedules invocations by the delay each one returns, and writes framed
//! records to stdout as JSON lines.

use activity_collector::collector::{initialize, poll_once, ReportsClient};
use activity_collector::config::{load_config_with_hash, Config, SchedulerSettings};
use activity_collector::credentials::StaticCredentials;
use activity_collector::output::{write_json_lines, RecordFramer};
use activity_collector::state::CollectionState;
use activity_collector::storage::{load_or_initialize, open_storage, StateStore};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Activity-Collector: an incremental, quota-aware activity log poller
///
/// Polls a paginated activity API in bounded time windows per target, catching up
/// when behind and backing off until the daily quota resets.
#[derive(Parser, Debug)]
#[command(name = "activity-collector")]
#[command(version = "1.0.0")]
#[command(about = "An incremental, quota-aware activity log poller", long_about = None)]
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

    /// Discard stored state and start every target from the configured start time
    #[arg(long)]
    fresh: bool,

    /// Run a single invocation per target and exit
    #[arg(long, conflicts_with_all = ["dry_run", "show_state"])]
    once: bool,

    /// Validate config and show the initial windows without fetching
    #[arg(long, conflicts_with_all = ["show_state", "fresh"])]
    dry_run: bool,

    /// Print the stored collection states and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    show_state: bool,
}

/// A target waiting for its next invocation
struct Scheduled {
    due: DateTime<Utc>,
    state: CollectionState,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

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
    } else if cli.show_state {
        handle_show_state(&config)?;
    } else {
        handle_collect(config, cli.fresh, cli.once).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("activity_collector=info,warn"),
            1 => EnvFilter::new("activity_collector=debug,info"),
            2 => EnvFilter::new("activity_collector=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the first windows
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let settings = SchedulerSettings::from_config(config)?;
    let states = initialize(&config.collector, Utc::now())?;

    println!("=== Activity-Collector Dry Run ===\n");

    println!("Scheduling:");
    println!("  Poll interval: {}s", settings.poll_interval_secs);
    println!("  Fast retry: {}s", settings.fast_retry_secs);
    println!("  Page budget: {}", settings.page_budget);
    println!(
        "  Catch-up: >{}h -> {}h windows, >{}h -> {}h windows",
        settings.catch_up.day_threshold_hours,
        settings.catch_up.day_window_hours,
        settings.catch_up.hour_threshold_hours,
        settings.catch_up.hour_window_hours
    );

    println!("\nQuota:");
    println!("  Resets at midnight {}", settings.quota_timezone);
    println!("  Reset buffer: {}s", settings.quota_reset_buffer_secs);
    println!("  Cooldown: {}s", settings.quota_cooldown_secs);
    println!("  Error reason: {}", config.quota.error_reason);

    println!("\nUpstream:");
    println!("  Base URL: {}", config.upstream.base_url);
    println!("  Max results per page: {}", config.upstream.max_results);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nTargets ({}):", states.len());
    for state in &states {
        println!(
            "  - {}: {} -> {}",
            state.target,
            state.since.to_rfc3339(),
            state.until.to_rfc3339()
        );
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --show-state mode: prints stored states as JSON
fn handle_show_state(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_storage(Path::new(&config.storage.database_path))?;
    let mut states: Vec<CollectionState> = store.load_all_states()?.into_values().collect();
    states.sort_by(|a, b| a.target.cmp(&b.target));

    println!("{}", serde_json::to_string_pretty(&states)?);

    Ok(())
}

/// Handles the main collection loop
async fn handle_collect(
    config: Config,
    fresh: bool,
    once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = SchedulerSettings::from_config(&config)?;
    let credentials = Arc::new(StaticCredentials::load(&config.credentials)?);
    tracing::info!("Loaded credentials with scopes: {}", credentials.scopes().join(", "));

    let client = ReportsClient::new(&config.upstream, &config.quota, credentials)?;
    let framer = RecordFramer::from_config(&config.record);

    let mut store = open_storage(Path::new(&config.storage.database_path))?;
    if fresh {
        tracing::info!("Starting fresh (discarding stored state)");
        store.clear()?;
    }

    let now = Utc::now();
    let mut queue: Vec<Scheduled> = load_or_initialize(&mut store, &config.collector, now)?
        .into_iter()
        .map(|state| Scheduled {
            due: if once { now } else { state.resume_at(now) },
            state,
        })
        .collect();

    tracing::info!("Collecting {} targets", queue.len());

    let stdout = std::io::stdout();

    loop {
        let Some(next_idx) = queue
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| s.due)
            .map(|(i, _)| i)
        else {
            break;
        };

        if !once {
            let wait = (queue[next_idx].due - Utc::now())
                .to_std()
                .unwrap_or_default();

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted, stopping collection");
                    break;
                }
            }
        }

        let scheduled = &mut queue[next_idx];
        let now = Utc::now();

        match poll_once(&client, &framer, &scheduled.state, now, &settings).await {
            Ok(invocation) => {
                let written = write_json_lines(&mut stdout.lock(), &invocation.records)?;
                store.save_state(&invocation.state)?;

                tracing::info!(
                    "Target {}: {} records, next poll in {}s",
                    invocation.state.target,
                    written,
                    invocation.delay_secs
                );

                scheduled.due = Utc::now() + Duration::seconds(invocation.delay_secs);
                scheduled.state = invocation.state;
            }
            Err(e) => {
                tracing::error!("Invocation failed for target {}: {}", scheduled.state.target, e);
                scheduled.due = Utc::now() + Duration::seconds(settings.poll_interval_secs);
            }
        }

        if once {
            queue.swap_remove(next_idx);
        }
    }

    tracing::info!("Collection stopped");

    Ok(())
}
