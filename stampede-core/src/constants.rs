use std::time::Duration;

/// Per-request timeout applied when the config does not override it.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the scheduler waits for in-flight requests after the run
/// duration elapses before abandoning the remaining virtual users.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Consecutive restarts that trip the slot circuit breaker.
pub const DEFAULT_RESTART_LIMIT: u32 = 3;

/// Window in which restarts count as consecutive.
pub const DEFAULT_RESTART_WINDOW: Duration = Duration::from_secs(1);
