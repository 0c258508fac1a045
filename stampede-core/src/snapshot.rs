use std::fmt;
use std::time::Duration;

/// Latency distribution summary derived from the aggregator's streaming
/// digest. All zeros until at least one outcome has been recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub min: Duration,
    pub max: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
}

/// Point-in-time copy of the accumulated run statistics.
///
/// Read-only once produced; the live aggregator keeps mutating its own state
/// independently. The total is derived from the per-reason counters so that
/// `total == successes + failures` holds for every snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSnapshot {
    pub successes: u64,
    pub timeouts: u64,
    pub check_failures: u64,
    pub transport_errors: u64,
    pub slots_abandoned: u64,
    pub latency: LatencySummary,
    pub wall_clock: Duration,
}

impl AggregateSnapshot {
    pub fn failures(&self) -> u64 {
        self.timeouts + self.check_failures + self.transport_errors
    }

    pub fn total(&self) -> u64 {
        self.successes + self.failures()
    }

    pub fn error_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.
        } else {
            self.failures() as f64 / total as f64
        }
    }
}

impl fmt::Display for AggregateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sub-millisecond wall-clock noise is not worth printing.
        let wall_clock = Duration::from_millis(self.wall_clock.as_millis() as u64);
        write!(
            f,
            "{} iterations in {} ({} ok, {} timeout, {} check_failed, {} transport_error; \
             latency p50 {:?} p90 {:?} p99 {:?}; {} slots abandoned)",
            self.total(),
            humantime::format_duration(wall_clock),
            self.successes,
            self.timeouts,
            self.check_failures,
            self.transport_errors,
            self.latency.p50,
            self.latency.p90,
            self.latency.p99,
            self.slots_abandoned,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> AggregateSnapshot {
        AggregateSnapshot {
            successes: 90,
            timeouts: 4,
            check_failures: 5,
            transport_errors: 1,
            slots_abandoned: 0,
            latency: LatencySummary::default(),
            wall_clock: Duration::from_secs(20),
        }
    }

    #[test]
    fn total_is_derived() {
        let snapshot = snapshot();
        assert_eq!(snapshot.failures(), 10);
        assert_eq!(snapshot.total(), 100);
        assert!((snapshot.error_rate() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_error_rate_is_zero() {
        let snapshot = AggregateSnapshot {
            successes: 0,
            timeouts: 0,
            check_failures: 0,
            transport_errors: 0,
            slots_abandoned: 0,
            latency: LatencySummary::default(),
            wall_clock: Duration::ZERO,
        };
        assert_eq!(snapshot.error_rate(), 0.);
    }

    #[test]
    fn display_is_reporter_friendly() {
        let rendered = snapshot().to_string();
        assert!(rendered.contains("100 iterations in 20s"));
        assert!(rendered.contains("90 ok"));
    }
}
