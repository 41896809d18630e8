//! Generic batch processor: a fixed-size worker pool driving a
//! [`quotabatch_strategy::JobStrategy`] against the durable store and the
//! quota-paced HTTP client.
//!
//! Grounded on `base_batch_processor.py::BaseBatchProcessor.run` /
//! `_worker_loop`: each worker owns one store connection for its whole
//! lifetime and loops claim → call → record until the store runs dry or the
//! shared `limit` ticket pool is exhausted. Unlike the Python original's
//! inheritance-based `BaseBatchProcessor` subclassed per job kind, the
//! `Processor` here holds one `Arc<dyn JobStrategy>` and never needs to know
//! which concrete strategy it's driving.

pub mod config;
pub mod counters;
pub mod error;
pub mod events;

use chrono::Utc;
use quotabatch_core::EventListeners;
use quotabatch_http::Client;
use quotabatch_quota::Coordinator;
use quotabatch_store::Store;
use quotabatch_strategy::{ApiRequest, JobStrategy};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub use config::{ProcessorConfig, ProcessorConfigBuilder};
pub use counters::{CounterSnapshot, Counters};
pub use error::ProcessorError;
pub use events::{ProgressEvent, SummaryEvent};

/// Final outcome of a [`Processor::run`], the data behind the summary event.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunReport {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub elapsed_seconds: f64,
}

/// Drives one [`JobStrategy`] through a worker pool.
///
/// Owns the database path (each worker opens its own [`Store`] connection
/// from it, per the workspace's one-connection-per-worker discipline), the
/// shared [`Coordinator`], and an HTTP [`Client`] builder — the client
/// itself is cheap to construct and reqwest's blocking client is safe to
/// share, but each worker gets its own handle to keep ownership simple and
/// mirror the store's per-worker pattern.
pub struct Processor {
    db_path: PathBuf,
    strategy: Arc<dyn JobStrategy>,
    coordinator: Arc<Coordinator>,
    client_config: quotabatch_http::ClientConfig,
    config: ProcessorConfig,
}

impl Processor {
    pub fn new(
        db_path: impl Into<PathBuf>,
        strategy: Arc<dyn JobStrategy>,
        coordinator: Arc<Coordinator>,
        client_config: quotabatch_http::ClientConfig,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            strategy,
            coordinator,
            client_config,
            config,
        }
    }

    /// Returns a builder for [`ProcessorConfig`].
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }

    /// Idempotently creates the strategy's job table (and any auxiliary
    /// lookup tables it declares).
    pub fn create_tables(&self) -> Result<(), ProcessorError> {
        let store = Store::open(&self.db_path)?;
        store.execute_ddl(self.strategy.create_tables_ddl())?;
        Ok(())
    }

    /// Runs the strategy's offline classification pass (a no-op for
    /// strategies with nothing to classify, e.g. [`quotabatch_strategy::CreateEntityStrategy`]).
    pub fn prepare(&self) -> Result<quotabatch_strategy::PrepareSummary, ProcessorError> {
        let store = Store::open(&self.db_path)?;
        Ok(self.strategy.prepare(&store)?)
    }

    /// Resets the strategy's retryable rows and returns how many were reset.
    pub fn retry_failed(&self) -> Result<u64, ProcessorError> {
        let store = Store::open(&self.db_path)?;
        Ok(self.strategy.retry_failed(&store)?)
    }

    /// Spawns `worker_count` threads, each claiming one row at a time until
    /// the store is exhausted or the configured `limit` ticket pool runs
    /// out, and returns the aggregated [`RunReport`] once every worker has
    /// returned.
    ///
    /// A worker that hits a [`ProcessorError`] (store corruption, a
    /// strategy bug) logs it and exits; per spec this does not abort its
    /// peers, so the reported `attempted` total may be lower than the
    /// configured `limit` if every worker died early.
    pub fn run(&self) -> RunReport {
        let start = Instant::now();
        let counters = Arc::new(Counters::new(self.config.limit));

        let handles: Vec<_> = (0..self.config.worker_count.max(1))
            .map(|worker_index| {
                let db_path = self.db_path.clone();
                let strategy = Arc::clone(&self.strategy);
                let coordinator = Arc::clone(&self.coordinator);
                let client_config = self.client_config.clone();
                let counters = Arc::clone(&counters);
                let progress_listeners = self.config.progress_listeners.clone();
                let source = self.config.name.clone();

                std::thread::Builder::new()
                    .name(format!("{source}-worker-{worker_index}"))
                    .spawn(move || {
                        worker_loop(
                            &db_path,
                            strategy.as_ref(),
                            &coordinator,
                            client_config,
                            &counters,
                            &progress_listeners,
                            &source,
                            start,
                        )
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        for handle in handles {
            if let Err(panic_payload) = handle.join() {
                let message = panic_payload
                    .downcast_ref::<&'static str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "worker thread panicked".to_string());
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %message, "a worker thread panicked; continuing with the rest of the pool");
                #[cfg(not(feature = "tracing"))]
                let _ = message;
            }
        }

        let snapshot = counters.snapshot();
        let elapsed_seconds = start.elapsed().as_secs_f64();
        let report = RunReport {
            attempted: snapshot.attempted,
            succeeded: snapshot.succeeded,
            failed: snapshot.failed,
            elapsed_seconds,
        };

        self.config.summary_listeners.emit(&SummaryEvent {
            source: self.config.name.clone(),
            timestamp: Instant::now(),
            total: report.attempted,
            succeeded: report.succeeded,
            failed: report.failed,
            elapsed_seconds,
            requests_per_minute: requests_per_minute(report.attempted, elapsed_seconds),
        });

        report
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    db_path: &std::path::Path,
    strategy: &dyn JobStrategy,
    coordinator: &Arc<Coordinator>,
    client_config: quotabatch_http::ClientConfig,
    counters: &Arc<Counters>,
    progress_listeners: &EventListeners<ProgressEvent>,
    source: &str,
    start: Instant,
) {
    let store = match Store::open(db_path) {
        Ok(store) => store,
        Err(error) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(%error, "worker failed to open its store connection, exiting");
            #[cfg(not(feature = "tracing"))]
            let _ = error;
            return;
        }
    };

    let client = match Client::new(client_config, Arc::clone(coordinator)) {
        Ok(client) => client,
        Err(error) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(%error, "worker failed to build its HTTP client, exiting");
            #[cfg(not(feature = "tracing"))]
            let _ = error;
            return;
        }
    };

    loop {
        if !counters.reserve_ticket() {
            break;
        }

        let now = Utc::now().to_rfc3339();
        let item = match store.claim_next(
            strategy.table_name(),
            strategy.ready_predicate(),
            strategy.claim_order(),
            &now,
        ) {
            Ok(Some(item)) => item,
            Ok(None) => {
                // The ticket was never spent on a claimed row; refund it so
                // a dry-store exit doesn't inflate the reported `attempted`
                // total (spec.md §4.5: counters track outcomes, not claim
                // attempts).
                counters.release_ticket();
                break;
            }
            Err(error) => {
                counters.release_ticket();
                #[cfg(feature = "tracing")]
                tracing::warn!(%error, "claim_next failed, worker exiting");
                #[cfg(not(feature = "tracing"))]
                let _ = error;
                break;
            }
        };

        let id = item.id;
        let outcome = process_one(strategy, &store, &client, &item);

        let status = match &outcome {
            Ok(status) => {
                counters.record_success();
                Some(*status)
            }
            Err(status) => {
                counters.record_failure();
                *status
            }
        };

        let quota = coordinator.snapshot();
        let counter_snapshot = counters.snapshot();
        let elapsed_seconds = start.elapsed().as_secs_f64();

        progress_listeners.emit(&ProgressEvent {
            source: source.to_string(),
            timestamp: Instant::now(),
            id,
            status,
            succeeded: counter_snapshot.succeeded,
            failed: counter_snapshot.failed,
            elapsed_seconds,
            quota_total: quota.limit_total,
            quota_remaining: quota.limit_remaining,
            requests_per_minute: requests_per_minute(
                counter_snapshot.succeeded + counter_snapshot.failed,
                elapsed_seconds,
            ),
        });
    }
}

/// Builds the request, calls the HTTP client, and has the strategy
/// interpret the outcome. Returns `Ok(status)` on success, `Err(status)` on
/// any failure (status is `None` for a transport error or a strategy
/// validation error that never reached the network).
fn process_one(
    strategy: &dyn JobStrategy,
    store: &Store,
    client: &Client,
    item: &quotabatch_store::JobItem,
) -> Result<u16, Option<u16>> {
    let request = strategy.build_request(item).map_err(|error| {
        let _ = strategy.interpret_failure(store, item, None, &error.to_string());
        None
    })?;

    let result = match &request {
        ApiRequest::Get { path } => client.get(path),
        ApiRequest::Post { path, body } => client.post(path, body),
        ApiRequest::Put { path, body } => client.put(path, body),
    };

    match result {
        Ok(response) => {
            let status = response.status;
            if let Err(error) = strategy.interpret_success(store, item, status, &response.body) {
                let _ = strategy.interpret_failure(store, item, Some(status), &error.to_string());
                return Err(Some(status));
            }
            Ok(status)
        }
        Err(error) => {
            let (status, message) = extract_failure(&error);
            let _ = strategy.interpret_failure(store, item, status, &message);
            Err(status)
        }
    }
}

/// Extracts a status and a human-readable message from a client error,
/// preferring the response's JSON body (per spec.md §4.5 step 5: "prefer
/// response JSON body").
fn extract_failure(error: &quotabatch_http::ClientError) -> (Option<u16>, String) {
    match error {
        quotabatch_http::ClientError::Http { status, body } => {
            let message = serde_json::from_str::<Value>(body)
                .map(|json| json.to_string())
                .unwrap_or_else(|_| body.clone());
            (Some(*status), message)
        }
        quotabatch_http::ClientError::RateLimitExhausted { .. } => (Some(429), error.to_string()),
        quotabatch_http::ClientError::Transport(_) => (None, error.to_string()),
    }
}

fn requests_per_minute(count: u64, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds > 0.0 {
        (count as f64 / elapsed_seconds) * 60.0
    } else {
        0.0
    }
}
