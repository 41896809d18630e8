use std::sync::Mutex;

/// Shared run totals, guarded by a single mutex per the workspace's locking
/// discipline (Coordinator mutex, if taken at all, is always acquired
/// before this one — the two are never held at once in this crate).
pub struct Counters {
    inner: Mutex<Inner>,
}

struct Inner {
    /// Tickets issued by `reserve_ticket`, gating the `limit` cap. This is
    /// a reservation count, not a report of work done: a ticket issued to a
    /// worker that then finds the store dry is refunded, so it never shows
    /// up in `succeeded`/`failed` or the reported `attempted` total.
    reserved: u64,
    succeeded: u64,
    failed: u64,
    limit: Option<u64>,
}

/// A point-in-time read of the counters, for progress/summary events.
///
/// `attempted` is `succeeded + failed`, matching the original's
/// `_print_final_stats` (`total = success_count + failure_count`), not the
/// raw ticket-reservation count.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterSnapshot {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl Counters {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            inner: Mutex::new(Inner { reserved: 0, succeeded: 0, failed: 0, limit }),
        }
    }

    /// Atomically reserves one ticket if the configured `limit` (if any)
    /// hasn't been reached. Returns `false` once the cap is hit, the
    /// worker's sole stop signal besides the store running dry.
    pub fn reserve_ticket(&self) -> bool {
        let mut inner = self.lock();
        if let Some(limit) = inner.limit {
            if inner.reserved >= limit {
                return false;
            }
        }
        inner.reserved += 1;
        true
    }

    /// Refunds a ticket reserved by `reserve_ticket` that was never spent on
    /// a claimed row (the store had nothing ready), so it doesn't inflate
    /// the reported `attempted` total or block another worker's claim.
    pub fn release_ticket(&self) {
        let mut inner = self.lock();
        inner.reserved = inner.reserved.saturating_sub(1);
    }

    pub fn record_success(&self) {
        self.lock().succeeded += 1;
    }

    pub fn record_failure(&self) {
        self.lock().failed += 1;
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let inner = self.lock();
        CounterSnapshot {
            attempted: inner.succeeded + inner.failed,
            succeeded: inner.succeeded,
            failed: inner.failed,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
