use crate::client::{ClientError, HttpClient};
use stampede_core::{Check, FailureReason, RequestOutcome, ResponseData, RunConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// The executor itself is broken, not the target. Propagated out of the VU
/// loop so the scheduler can restart the slot.
#[derive(Debug, Error)]
pub(crate) enum ExecutorError {
    #[error("http client failed: {0}")]
    Client(String),
}

/// Single-iteration unit of work: one request, one outcome.
///
/// Stateless per call; every per-iteration failure is turned into data here
/// and never unwinds past the VU loop boundary.
pub(crate) struct Executor<C> {
    client: C,
    config: Arc<RunConfig>,
}

impl<C: HttpClient> Executor<C> {
    pub fn new(client: C, config: Arc<RunConfig>) -> Self {
        Self { client, config }
    }

    pub async fn execute(&self) -> Result<RequestOutcome, ExecutorError> {
        let start = Instant::now();
        let result = tokio::time::timeout(
            self.config.request_timeout,
            self.client.perform(&self.config.endpoint),
        )
        .await;
        let latency = start.elapsed();

        match result {
            Err(_) => Ok(RequestOutcome::failure(latency, FailureReason::Timeout)),
            Ok(Err(ClientError::Transport(_))) => Ok(RequestOutcome::failure(
                latency,
                FailureReason::TransportError,
            )),
            Ok(Err(ClientError::Fatal(msg))) => Err(ExecutorError::Client(msg)),
            Ok(Ok(response)) => {
                if let Some(check) = failed_check(&self.config.checks, &response, latency) {
                    Ok(RequestOutcome::failure(
                        latency,
                        FailureReason::CheckFailed(check.name()),
                    ))
                } else {
                    Ok(RequestOutcome::success(latency))
                }
            }
        }
    }
}

fn failed_check<'a>(
    checks: &'a [Check],
    response: &ResponseData,
    latency: Duration,
) -> Option<&'a Check> {
    checks
        .iter()
        .find(|check| !check.evaluate(response, latency))
}
