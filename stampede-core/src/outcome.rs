use std::fmt;
use std::time::Duration;

/// Response data handed back by the HTTP collaborator. The engine only ever
/// looks at the status code and body text; connection handling stays inside
/// the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseData {
    pub status: u16,
    pub body: String,
}

/// Why a single iteration failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The request exceeded the configured per-request timeout.
    Timeout,
    /// Connection refused, reset, or any other transport-level error.
    TransportError,
    /// A response arrived but the named check predicate rejected it.
    CheckFailed(&'static str),
}

impl FailureReason {
    /// Stable label for metrics and counters.
    pub fn label(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::TransportError => "transport_error",
            FailureReason::CheckFailed(_) => "check_failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::CheckFailed(name) => write!(f, "check_failed({name})"),
            other => f.write_str(other.label()),
        }
    }
}

/// The result of one executor iteration. Exactly one of success or a single
/// failure reason; folded into the aggregator and never retained as a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub latency: Duration,
    pub failure: Option<FailureReason>,
}

impl RequestOutcome {
    pub fn success(latency: Duration) -> Self {
        Self {
            latency,
            failure: None,
        }
    }

    pub fn failure(latency: Duration, reason: FailureReason) -> Self {
        Self {
            latency,
            failure: Some(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}
