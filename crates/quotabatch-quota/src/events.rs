use quotabatch_core::BatchEvent;
use std::time::{Duration, Instant};

/// Observability events emitted by the [`crate::Coordinator`].
#[derive(Debug, Clone)]
pub enum QuotaEvent {
    /// A caller was admitted to issue a request, after waiting `wait_duration`.
    AdmissionGranted {
        source: String,
        timestamp: Instant,
        wait_duration: Duration,
    },
    /// The coordinator is near exhaustion and designated this caller as the
    /// single probe, to be admitted after `backoff`.
    ProbeScheduled {
        source: String,
        timestamp: Instant,
        backoff: Duration,
    },
    /// A `Retry-After` response engaged a global pause for `duration`.
    GlobalPauseEngaged {
        source: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// A response refreshed the quota upward, from `previous` to `current`.
    QuotaRefreshed {
        source: String,
        timestamp: Instant,
        previous: u32,
        current: u32,
    },
}

impl BatchEvent for QuotaEvent {
    fn event_type(&self) -> &'static str {
        match self {
            QuotaEvent::AdmissionGranted { .. } => "admission_granted",
            QuotaEvent::ProbeScheduled { .. } => "probe_scheduled",
            QuotaEvent::GlobalPauseEngaged { .. } => "global_pause_engaged",
            QuotaEvent::QuotaRefreshed { .. } => "quota_refreshed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            QuotaEvent::AdmissionGranted { timestamp, .. }
            | QuotaEvent::ProbeScheduled { timestamp, .. }
            | QuotaEvent::GlobalPauseEngaged { timestamp, .. }
            | QuotaEvent::QuotaRefreshed { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            QuotaEvent::AdmissionGranted { source, .. }
            | QuotaEvent::ProbeScheduled { source, .. }
            | QuotaEvent::GlobalPauseEngaged { source, .. }
            | QuotaEvent::QuotaRefreshed { source, .. } => source,
        }
    }
}
