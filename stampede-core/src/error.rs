use thiserror::Error;

/// Configuration problems caught before a run starts. These are the only
/// errors that prevent a run from producing a snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("virtual user count must be at least 1")]
    ZeroVus,

    #[error("run duration must be greater than zero")]
    ZeroDuration,

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("ramp-up cannot be longer than the run duration")]
    RampUpTooLong,
}
