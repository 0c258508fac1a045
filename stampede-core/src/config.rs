use crate::{
    Check, ConfigError, DEFAULT_GRACE_PERIOD, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RESTART_LIMIT,
    DEFAULT_RESTART_WINDOW,
};
use std::time::Duration;

/// Immutable description of a single load run.
///
/// Built once by the caller (the CLI/config layer is out of scope here) and
/// shared read-only by the scheduler and every virtual user.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub endpoint: String,
    pub vus: usize,
    pub duration: Duration,
    pub ramp_up: Option<Duration>,
    pub request_timeout: Duration,
    pub checks: Vec<Check>,
    pub grace_period: Duration,
    pub restart_limit: u32,
    pub restart_window: Duration,
}

impl RunConfig {
    pub fn new(endpoint: impl Into<String>, vus: usize, duration: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            vus,
            duration,
            ramp_up: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            checks: vec![],
            grace_period: DEFAULT_GRACE_PERIOD,
            restart_limit: DEFAULT_RESTART_LIMIT,
            restart_window: DEFAULT_RESTART_WINDOW,
        }
    }

    /// Start virtual users at a linear rate over `ramp_up` instead of all at
    /// once, to avoid a connection-storm against the target.
    pub fn ramp_up(mut self, ramp_up: Duration) -> Self {
        self.ramp_up = Some(ramp_up);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Add a check evaluated against every response. Checks run in insertion
    /// order; the first failing check names the failure reason.
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// How long shutdown waits for in-flight requests before abandoning them.
    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Consecutive VU restarts within [`Self::restart_window`] that trip the
    /// slot circuit breaker.
    pub fn restart_limit(mut self, restart_limit: u32) -> Self {
        self.restart_limit = restart_limit;
        self
    }

    pub fn restart_window(mut self, restart_window: Duration) -> Self {
        self.restart_window = restart_window;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vus == 0 {
            return Err(ConfigError::ZeroVus);
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if let Some(ramp_up) = self.ramp_up {
            if ramp_up > self.duration {
                return Err(ConfigError::RampUpTooLong);
            }
        }
        Ok(())
    }
}
