use crate::ResponseData;
use std::time::Duration;

/// A pass/fail assertion evaluated against a completed response.
///
/// Checks are a closed set of predicate variants rather than arbitrary
/// closures so that evaluation stays a pure function over the response data
/// and outcomes can be labelled with a stable reason name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// Response status code must equal the given code.
    StatusCode(u16),
    /// Response body must contain the given substring.
    BodyContains(String),
    /// The iteration latency must not exceed the given bound.
    MaxLatency(Duration),
}

impl Check {
    /// Name reported as the failure reason when the predicate rejects.
    pub fn name(&self) -> &'static str {
        match self {
            Check::StatusCode(_) => "status_code",
            Check::BodyContains(_) => "body_contains",
            Check::MaxLatency(_) => "max_latency",
        }
    }

    pub fn evaluate(&self, response: &ResponseData, latency: Duration) -> bool {
        match self {
            Check::StatusCode(code) => response.status == *code,
            Check::BodyContains(needle) => response.body.contains(needle.as_str()),
            Check::MaxLatency(bound) => latency <= *bound,
        }
    }
}
