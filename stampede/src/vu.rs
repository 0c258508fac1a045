use crate::aggregator::Aggregator;
use crate::client::HttpClient;
use crate::executor::{Executor, ExecutorError};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use stampede_core::RunConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Upper bound on the randomized startup delay, in milliseconds.
const START_JITTER_MS: u64 = 10;

/// One simulated client: a stable slot identity, a private jitter seed, and
/// an executor driven in a tight loop until the stop flag is observed.
///
/// Owned exclusively by its own task. Cancellation is polled at iteration
/// boundaries only; an in-flight request always runs to completion or to
/// its own timeout.
pub(crate) struct VirtualUser<C> {
    id: usize,
    rng: SmallRng,
    executor: Executor<C>,
    aggregator: Aggregator,
    stop: Arc<AtomicBool>,
    iterations: u64,
}

impl<C: HttpClient> VirtualUser<C> {
    pub fn new(
        id: usize,
        seed: u64,
        client: C,
        config: Arc<RunConfig>,
        aggregator: Aggregator,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            rng: SmallRng::seed_from_u64(seed),
            executor: Executor::new(client, config),
            aggregator,
            stop,
            iterations: 0,
        }
    }

    pub async fn run(mut self) -> Result<(), ExecutorError> {
        // De-synchronize VUs spawned on the same ramp tick.
        let jitter = self.rng.gen_range(0..=START_JITTER_MS);
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        while !self.stop.load(Ordering::Acquire) {
            let outcome = self.executor.execute().await?;
            self.iterations += 1;
            trace!(vu = self.id, iteration = self.iterations, success = outcome.is_success(), "iteration complete");
            self.aggregator.record(&outcome);
        }

        debug!(vu = self.id, iterations = self.iterations, "stop observed; exiting");
        Ok(())
    }
}
