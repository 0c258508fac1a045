use metrics_util::AtomicBucket;
use pdatastructs::tdigest::{TDigest, K1};
use stampede_core::{AggregateSnapshot, FailureReason, LatencySummary, RequestOutcome};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Thread-safe accumulator shared by every virtual user.
///
/// The record path is lock-free: per-reason atomic counters plus an
/// [`AtomicBucket`] holding latencies until they are folded into a bounded
/// t-digest. Only the fold/snapshot path takes the digest mutex, so no VU
/// ever blocks on another VU's write and memory stays bounded regardless of
/// request volume.
#[derive(Clone)]
pub struct Aggregator {
    shared: Arc<Shared>,
}

struct Shared {
    success: AtomicU64,
    timeouts: AtomicU64,
    check_failures: AtomicU64,
    transport_errors: AtomicU64,
    slots_abandoned: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
    sealed: AtomicBool,
    pending: AtomicBucket<Duration>,
    digest: Mutex<LatencyDigest>,
    started: Instant,
    finished: OnceLock<Duration>,
}

struct LatencyDigest {
    digest: TDigest<K1>,
    count: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                success: AtomicU64::new(0),
                timeouts: AtomicU64::new(0),
                check_failures: AtomicU64::new(0),
                transport_errors: AtomicU64::new(0),
                slots_abandoned: AtomicU64::new(0),
                min_nanos: AtomicU64::new(u64::MAX),
                max_nanos: AtomicU64::new(0),
                sealed: AtomicBool::new(false),
                pending: AtomicBucket::new(),
                digest: Mutex::new(LatencyDigest {
                    digest: default_tdigest(),
                    count: 0,
                }),
                started: Instant::now(),
                finished: OnceLock::new(),
            }),
        }
    }

    /// Fold one outcome in. No-op once the aggregator is sealed, so outcomes
    /// from abandoned in-flight requests are discarded rather than recorded.
    pub fn record(&self, outcome: &RequestOutcome) {
        if self.shared.sealed.load(Ordering::Acquire) {
            return;
        }

        let nanos = outcome.latency.as_nanos() as u64;
        self.shared.pending.push(outcome.latency);
        self.shared.min_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.shared.max_nanos.fetch_max(nanos, Ordering::Relaxed);

        match &outcome.failure {
            None => self.shared.success.fetch_add(1, Ordering::Relaxed),
            Some(FailureReason::Timeout) => self.shared.timeouts.fetch_add(1, Ordering::Relaxed),
            Some(FailureReason::CheckFailed(_)) => {
                self.shared.check_failures.fetch_add(1, Ordering::Relaxed)
            }
            Some(FailureReason::TransportError) => {
                self.shared.transport_errors.fetch_add(1, Ordering::Relaxed)
            }
        };

        #[cfg(feature = "metrics")]
        {
            metrics::histogram!("stampede.latency").record(outcome.latency.as_nanos() as f64);
            match &outcome.failure {
                None => metrics::counter!("stampede.success").increment(1),
                Some(reason) => {
                    metrics::counter!("stampede.error", "reason" => reason.label()).increment(1)
                }
            }
        }
    }

    /// A VU slot was disabled by the restart circuit breaker.
    pub fn slot_abandoned(&self) {
        self.shared.slots_abandoned.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        metrics::counter!("stampede.slot_abandoned").increment(1);
    }

    /// Drain pending latencies into the bounded digest. Called periodically
    /// by the scheduler and before every snapshot.
    pub(crate) fn fold(&self) {
        let mut latencies = self
            .shared
            .digest
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.shared.pending.clear_with(|durations| {
            for duration in durations {
                latencies.digest.insert(duration.as_secs_f64());
            }
            latencies.count += durations.len() as u64;
        });
    }

    /// Discard everything recorded from now on. Used when shutdown is forced
    /// past the grace period: outcomes of logically-destroyed VUs must never
    /// reach the counters.
    pub(crate) fn seal(&self) {
        self.shared.sealed.store(true, Ordering::Release);
    }

    /// Freeze the wall-clock duration reported by future snapshots.
    pub(crate) fn finish(&self, wall_clock: Duration) {
        let _ = self.shared.finished.set(wall_clock);
    }

    /// Consistent point-in-time copy. Concurrent `record` calls are neither
    /// lost nor double-counted; the total is derived from the per-reason
    /// counters so the counting invariant holds for every cut.
    ///
    /// With no intervening `record`, repeated snapshots agree on every
    /// statistic. `wall_clock` is the one live field: it keeps advancing
    /// until [`Self::finish`] freezes it at shutdown, after which snapshots
    /// are equal outright.
    pub fn snapshot(&self) -> AggregateSnapshot {
        self.fold();

        let latency = {
            let latencies = self
                .shared
                .digest
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if latencies.count == 0 {
                LatencySummary::default()
            } else {
                LatencySummary {
                    min: Duration::from_nanos(self.shared.min_nanos.load(Ordering::Relaxed)),
                    max: Duration::from_nanos(self.shared.max_nanos.load(Ordering::Relaxed)),
                    p50: quantile(&latencies.digest, 0.5),
                    p90: quantile(&latencies.digest, 0.9),
                    p99: quantile(&latencies.digest, 0.99),
                }
            }
        };

        AggregateSnapshot {
            successes: self.shared.success.load(Ordering::Relaxed),
            timeouts: self.shared.timeouts.load(Ordering::Relaxed),
            check_failures: self.shared.check_failures.load(Ordering::Relaxed),
            transport_errors: self.shared.transport_errors.load(Ordering::Relaxed),
            slots_abandoned: self.shared.slots_abandoned.load(Ordering::Relaxed),
            latency,
            wall_clock: self
                .shared
                .finished
                .get()
                .copied()
                .unwrap_or_else(|| self.shared.started.elapsed()),
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn quantile(digest: &TDigest<K1>, q: f64) -> Duration {
    Duration::from_secs_f64(digest.quantile(q))
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampede_core::FailureReason;

    fn ok(millis: u64) -> RequestOutcome {
        RequestOutcome::success(Duration::from_millis(millis))
    }

    #[test]
    fn counters_track_reasons() {
        let aggregator = Aggregator::new();
        aggregator.record(&ok(5));
        aggregator.record(&RequestOutcome::failure(
            Duration::from_millis(10),
            FailureReason::Timeout,
        ));
        aggregator.record(&RequestOutcome::failure(
            Duration::from_millis(1),
            FailureReason::CheckFailed("status_code"),
        ));
        aggregator.record(&RequestOutcome::failure(
            Duration::from_millis(1),
            FailureReason::TransportError,
        ));

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.successes, 1);
        assert_eq!(snapshot.timeouts, 1);
        assert_eq!(snapshot.check_failures, 1);
        assert_eq!(snapshot.transport_errors, 1);
        assert_eq!(snapshot.total(), 4);
    }

    #[test]
    fn latency_summary_spans_extremes() {
        let aggregator = Aggregator::new();
        for millis in [2, 4, 6, 8, 100] {
            aggregator.record(&ok(millis));
        }

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.latency.min, Duration::from_millis(2));
        assert_eq!(snapshot.latency.max, Duration::from_millis(100));
        assert!(snapshot.latency.p50 >= snapshot.latency.min);
        assert!(snapshot.latency.p99 <= snapshot.latency.max + Duration::from_millis(1));
    }

    #[test]
    fn empty_snapshot_is_all_zeros() {
        let snapshot = Aggregator::new().snapshot();
        assert_eq!(snapshot.total(), 0);
        assert_eq!(snapshot.latency, LatencySummary::default());
    }

    #[test]
    fn snapshot_is_idempotent_without_records() {
        let aggregator = Aggregator::new();
        for millis in [1, 2, 3] {
            aggregator.record(&ok(millis));
        }
        aggregator.finish(Duration::from_secs(1));

        assert_eq!(aggregator.snapshot(), aggregator.snapshot());
    }

    #[test]
    fn live_snapshots_agree_on_statistics() {
        let aggregator = Aggregator::new();
        for millis in [1, 2, 3] {
            aggregator.record(&ok(millis));
        }

        // Not finished yet: only the wall clock may differ between cuts.
        let mut first = aggregator.snapshot();
        let mut second = aggregator.snapshot();
        first.wall_clock = Duration::ZERO;
        second.wall_clock = Duration::ZERO;
        assert_eq!(first, second);
    }

    #[test]
    fn sealed_aggregator_discards_outcomes() {
        let aggregator = Aggregator::new();
        aggregator.record(&ok(1));
        aggregator.seal();
        aggregator.record(&ok(1));

        assert_eq!(aggregator.snapshot().total(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_are_never_lost() {
        const WRITERS: usize = 8;
        const PER_WRITER: usize = 1_000;

        let aggregator = Aggregator::new();
        let mut handles = vec![];
        for _ in 0..WRITERS {
            let aggregator = aggregator.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..PER_WRITER {
                    if i % 10 == 0 {
                        aggregator.record(&RequestOutcome::failure(
                            Duration::from_millis(1),
                            FailureReason::Timeout,
                        ));
                    } else {
                        aggregator.record(&ok(1));
                    }
                }
            }));
        }
        // Interleave snapshots with the writers; every cut must be
        // consistent and totals can only grow.
        let mut last_total = 0;
        for _ in 0..50 {
            let snapshot = aggregator.snapshot();
            assert!(snapshot.total() >= last_total);
            last_total = snapshot.total();
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.total(), (WRITERS * PER_WRITER) as u64);
        assert_eq!(snapshot.timeouts, (WRITERS * PER_WRITER / 10) as u64);
    }
}
