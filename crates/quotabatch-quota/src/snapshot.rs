use std::time::{Duration, Instant};

/// In-memory state guarded by the [`crate::Coordinator`]'s mutex.
///
/// Never persisted: it is rebuilt from scratch (and from the server's first
/// response) every time the process starts.
#[derive(Debug, Clone)]
pub struct QuotaSnapshot {
    /// Requests allowed in the server's rolling window.
    pub limit_total: u32,
    /// Requests believed still available in the current window.
    pub limit_remaining: u32,
    /// Calls admitted but not yet answered.
    pub in_flight: u32,
    /// When the most recent admission was granted.
    pub last_admission: Instant,
    /// If set, no admission may proceed before this instant (a `Retry-After`
    /// triggered global pause). `None` means no pause is in effect.
    pub pause_until: Option<Instant>,
    /// Current probe backoff, `1.0..=60.0` seconds.
    pub probe_backoff: Duration,
    /// Whether a worker has already been designated as the near-exhaustion probe.
    pub probe_scheduled: bool,
}

impl QuotaSnapshot {
    pub fn new(limit_total: u32) -> Self {
        Self {
            limit_total,
            limit_remaining: limit_total,
            in_flight: 0,
            last_admission: Instant::now() - Duration::from_secs(3600),
            pause_until: None,
            probe_backoff: Duration::from_secs(1),
            probe_scheduled: false,
        }
    }

    /// `limit_remaining - in_flight`, saturating at zero: the quota not yet
    /// consumed or already promised to an in-flight call.
    pub fn effective_remaining(&self) -> i64 {
        self.limit_remaining as i64 - self.in_flight as i64
    }
}
