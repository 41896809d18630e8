use quotabatch_core::BatchEvent;
use std::time::Instant;

/// Emitted once per completed item, carrying the fields spec.md §4.5 pins
/// as the stable progress contract. Rendering an icon, a progress bar, or
/// any other presentation is explicitly left to a layer outside this
/// crate.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub source: String,
    pub timestamp: Instant,
    pub id: i64,
    pub status: Option<u16>,
    pub succeeded: u64,
    pub failed: u64,
    pub elapsed_seconds: f64,
    pub quota_total: u32,
    pub quota_remaining: u32,
    pub requests_per_minute: f64,
}

impl BatchEvent for ProgressEvent {
    fn event_type(&self) -> &'static str {
        "item_completed"
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn source(&self) -> &str {
        &self.source
    }
}

/// Emitted once, after every worker has returned.
#[derive(Debug, Clone)]
pub struct SummaryEvent {
    pub source: String,
    pub timestamp: Instant,
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub elapsed_seconds: f64,
    pub requests_per_minute: f64,
}

impl BatchEvent for SummaryEvent {
    fn event_type(&self) -> &'static str {
        "run_completed"
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn source(&self) -> &str {
        &self.source
    }
}
