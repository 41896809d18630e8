use crate::config::CoordinatorConfig;
use crate::events::QuotaEvent;
use crate::headers::ResponseHeaders;
use crate::snapshot::QuotaSnapshot;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Serializes worker admission against a server-advertised request budget.
///
/// One `Coordinator` is created per process and shared (via `Arc`) across
/// every worker. All state lives behind a single [`Mutex`] guarded by one
/// [`Condvar`]; no suspension point holds the mutex except the condvar wait
/// itself, per the workspace's locking discipline.
pub struct Coordinator {
    state: Mutex<QuotaSnapshot>,
    condvar: Condvar,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Creates a new coordinator from the given configuration.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            state: Mutex::new(QuotaSnapshot::new(config.limit_total)),
            condvar: Condvar::new(),
            config,
        }
    }

    /// Returns a builder for [`CoordinatorConfig`].
    pub fn builder() -> crate::config::CoordinatorConfigBuilder {
        crate::config::CoordinatorConfigBuilder::new()
    }

    /// A read-only copy of the current quota state, for progress reporting.
    pub fn snapshot(&self) -> QuotaSnapshot {
        self.lock().clone()
    }

    /// Blocks the calling thread until it is safe to issue one request.
    ///
    /// On return, `in_flight` has been incremented and `last_admission` has
    /// been updated; the caller owns one admitted slot and must eventually
    /// call [`Coordinator::record_response`] to release it.
    pub fn await_admission(&self) {
        let call_start = Instant::now();
        let mut guard = self.lock();

        loop {
            let now = Instant::now();

            if let Some(pause_until) = guard.pause_until {
                if now < pause_until {
                    guard = self.wait_timeout(guard, pause_until - now);
                    continue;
                }
                guard.pause_until = None;
            }

            let base_interval = self.base_interval(guard.limit_total);
            let effective_remaining = guard.effective_remaining();
            let headroom = self.headroom();

            if effective_remaining > headroom {
                guard.probe_backoff = base_interval.max(Duration::from_secs_f64(1.0));

                let braking_threshold = headroom * 3;
                let multiplier = if effective_remaining > braking_threshold {
                    1.0
                } else {
                    braking_threshold as f64 / (effective_remaining.max(1) as f64)
                };
                let required_interval = base_interval.mul_f64(multiplier);
                let since_last = now.saturating_duration_since(guard.last_admission);

                if since_last < required_interval {
                    guard = self.wait_timeout(guard, required_interval - since_last);
                    continue;
                }

                guard.in_flight += 1;
                guard.last_admission = now;

                self.emit(
                    &guard,
                    QuotaEvent::AdmissionGranted {
                        source: self.config.name.clone(),
                        timestamp: now,
                        wait_duration: call_start.elapsed(),
                    },
                );
                return;
            }

            // Near-exhaustion regime: serialize everyone behind a single probe.
            if guard.in_flight > 0 || guard.probe_scheduled {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    coordinator = %self.config.name,
                    effective_remaining,
                    headroom,
                    "quota near exhaustion, waiting for the scheduled probe"
                );
                guard = self.wait_indefinite(guard);
                continue;
            }

            guard.probe_scheduled = true;
            let probe_wait = guard.probe_backoff;

            self.emit(
                &guard,
                QuotaEvent::ProbeScheduled {
                    source: self.config.name.clone(),
                    timestamp: now,
                    backoff: probe_wait,
                },
            );

            guard = self.wait_timeout(guard, probe_wait);
            // Finally-equivalent: always clear before taking any branch below,
            // so a future panic inside this block can't leave the coordinator
            // believing a probe is perpetually in flight.
            guard.probe_scheduled = false;

            if guard.effective_remaining() <= self.headroom() {
                guard.probe_backoff = (guard.probe_backoff * 2).min(Duration::from_secs_f64(60.0));
                guard.in_flight += 1;
                guard.last_admission = Instant::now();

                self.emit(
                    &guard,
                    QuotaEvent::AdmissionGranted {
                        source: self.config.name.clone(),
                        timestamp: Instant::now(),
                        wait_duration: call_start.elapsed(),
                    },
                );
                return;
            }
        }
    }

    /// Ingests the headers of a completed response: releases the admitted
    /// slot, applies any `Retry-After` global pause, and updates the quota.
    pub fn record_response(&self, headers: &ResponseHeaders) {
        let mut guard = self.lock();

        guard.in_flight = guard.in_flight.saturating_sub(1);

        if let Some(seconds) = headers.retry_after_secs {
            guard.pause_until = Some(Instant::now() + Duration::from_secs(seconds));
            guard.limit_remaining = 0;

            #[cfg(feature = "tracing")]
            tracing::info!(
                coordinator = %self.config.name,
                seconds,
                "server sent Retry-After, pausing all admission"
            );

            self.emit(
                &guard,
                QuotaEvent::GlobalPauseEngaged {
                    source: self.config.name.clone(),
                    timestamp: Instant::now(),
                    duration: Duration::from_secs(seconds),
                },
            );
            self.condvar.notify_all();
            return;
        }

        let previous = guard.limit_remaining;
        if let Some(remaining) = headers.ratelimit_remaining {
            guard.limit_remaining = remaining;
        }
        if let Some(total) = headers.ratelimit_total {
            guard.limit_total = total;
        }

        let effective_remaining = guard.effective_remaining();

        if guard.limit_remaining > previous {
            self.emit(
                &guard,
                QuotaEvent::QuotaRefreshed {
                    source: self.config.name.clone(),
                    timestamp: Instant::now(),
                    previous,
                    current: guard.limit_remaining,
                },
            );
            self.condvar.notify_all();
        } else if effective_remaining > self.headroom() {
            self.condvar.notify_all();
        } else {
            self.condvar.notify_one();
        }
    }

    fn base_interval(&self, limit_total: u32) -> Duration {
        Duration::from_secs_f64(60.0 / limit_total.max(1) as f64)
    }

    fn headroom(&self) -> i64 {
        self.config.headroom as i64
    }

    fn lock(&self) -> MutexGuard<'_, QuotaSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wait_timeout<'a>(
        &'a self,
        guard: MutexGuard<'a, QuotaSnapshot>,
        timeout: Duration,
    ) -> MutexGuard<'a, QuotaSnapshot> {
        match self.condvar.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    fn wait_indefinite<'a>(&'a self, guard: MutexGuard<'a, QuotaSnapshot>) -> MutexGuard<'a, QuotaSnapshot> {
        match self.condvar.wait(guard) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn emit(&self, guard: &MutexGuard<'_, QuotaSnapshot>, event: QuotaEvent) {
        let _ = guard;
        self.config.event_listeners.emit(&event);
    }
}
