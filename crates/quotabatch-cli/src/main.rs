//! Thin CLI driver for the quotabatch batch processor.
//!
//! Owns everything spec.md §1 explicitly excludes from the core: argument
//! parsing, `.env`/environment credential loading, and the command surface
//! (`create-tables`, `prepare`, `run`, `retry-failed`) from spec.md §6. All
//! of it reduces to building a [`Settings`] and handing it to
//! [`quotabatch_processor::Processor`]; presentation (progress bars, emoji
//! icons) stays out of scope, so `run` prints the same structured fields
//! the core emits as events, one line per item, with no decoration.

mod error;
mod settings;

use clap::{Parser, Subcommand};
use error::CliError;
use quotabatch_processor::{Processor, ProcessorConfig};
use quotabatch_quota::Coordinator;
use quotabatch_strategy::{CreateEntityStrategy, JobStrategy, UpdateEntityStrategy};
use settings::{Settings, StrategyKind};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "quotabatch", about = "Durable, quota-paced batch job processor", version)]
struct Cli {
    /// API key, used as the HTTP Basic username. Falls back to
    /// `FRESHSERVICE_API_KEY`.
    #[arg(long, env = "FRESHSERVICE_API_KEY")]
    api_key: Option<String>,

    /// Service domain (e.g. `example.freshservice.com`). Falls back to
    /// `FRESHSERVICE_API_DOMAIN`.
    #[arg(long, env = "FRESHSERVICE_API_DOMAIN")]
    domain: Option<String>,

    /// Path to the SQLite job store file.
    #[arg(long, default_value = "jobs.sqlite")]
    db: PathBuf,

    /// Which reference job strategy to drive.
    #[arg(long, value_enum, default_value_t = StrategyKind::CreateTicket)]
    strategy: StrategyKind,

    /// Buffer below the server quota at which the coordinator starts
    /// probing instead of pacing normally.
    #[arg(long, default_value_t = 10)]
    headroom: u32,

    /// 429 retries attempted before an item is recorded as failed.
    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    /// Fallback wait, in seconds, for a 429 with no usable `Retry-After`.
    #[arg(long, default_value_t = 5)]
    retry_after_default: u64,

    /// `RUST_LOG`-style filter. Defaults to `info` when unset and
    /// `RUST_LOG` is also unset.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Idempotently create the job store's schema.
    CreateTables,
    /// Run the strategy's offline classification pass.
    Prepare,
    /// Execute the batch: spawn the worker pool and process ready rows.
    Run {
        /// Caps the total number of rows attempted across the pool.
        #[arg(long)]
        limit: Option<u64>,
        /// Worker pool size.
        #[arg(long, default_value_t = 10)]
        workers: usize,
    },
    /// Reset failed rows so the next `run` re-picks them.
    RetryFailed,
}

fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let settings = Settings {
        api_key: cli.api_key.ok_or(CliError::MissingSetting("api-key / FRESHSERVICE_API_KEY"))?,
        domain: cli.domain.ok_or(CliError::MissingSetting("domain / FRESHSERVICE_API_DOMAIN"))?,
        db_path: cli.db,
        headroom: cli.headroom,
        max_retries: cli.max_retries,
        retry_after_default_secs: cli.retry_after_default,
        strategy: cli.strategy,
    };

    let strategy: Arc<dyn JobStrategy> = match settings.strategy {
        StrategyKind::CreateTicket => Arc::new(CreateEntityStrategy::tickets()),
        StrategyKind::UpdateTicketCategory => Arc::new(UpdateEntityStrategy::ticket_categories()),
    };

    match cli.command {
        Command::CreateTables => {
            let processor = build_processor(&settings, Arc::clone(&strategy), Processor::builder().build());
            processor.create_tables()?;
            tracing::info!(db = %settings.db_path.display(), "created job store schema");
        }
        Command::Prepare => {
            let processor = build_processor(&settings, Arc::clone(&strategy), Processor::builder().build());
            let summary = processor.prepare()?;
            tracing::info!(
                total = summary.total,
                ready = summary.ready,
                skipped = summary.skipped,
                unmapped = summary.unmapped,
                "prepare pass complete"
            );
            println!(
                "prepared {} rows: {} ready, {} skipped, {} unmapped",
                summary.total, summary.ready, summary.skipped, summary.unmapped
            );
        }
        Command::Run { limit, workers } => {
            let config = Processor::builder()
                .worker_count(workers)
                .limit(limit)
                .on_progress(|event| {
                    println!(
                        "id={} status={:?} succeeded={} failed={} elapsed={:.1}s quota={}/{} rpm={:.1}",
                        event.id,
                        event.status,
                        event.succeeded,
                        event.failed,
                        event.elapsed_seconds,
                        event.quota_remaining,
                        event.quota_total,
                        event.requests_per_minute
                    );
                })
                .on_summary(|event| {
                    println!(
                        "done: total={} succeeded={} failed={} elapsed={:.1}s rpm={:.1}",
                        event.total, event.succeeded, event.failed, event.elapsed_seconds, event.requests_per_minute
                    );
                })
                .build();
            let processor = build_processor(&settings, strategy, config);
            processor.run();
        }
        Command::RetryFailed => {
            let processor = build_processor(&settings, strategy, Processor::builder().build());
            let count = processor.retry_failed()?;
            tracing::info!(count, "reset failed rows for retry");
            println!("reset {count} failed rows");
        }
    }

    Ok(())
}

fn build_processor(settings: &Settings, strategy: Arc<dyn JobStrategy>, config: ProcessorConfig) -> Processor {
    let coordinator = Arc::new(Coordinator::new(Coordinator::builder().headroom(settings.headroom).build()));
    let client_config = quotabatch_http::ClientConfigBuilder::new(settings.base_url(), settings.api_key.clone())
        .max_retries(settings.max_retries)
        .default_retry_after_secs(settings.retry_after_default_secs)
        .build();

    Processor::new(settings.db_path.clone(), strategy, coordinator, client_config, config)
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
