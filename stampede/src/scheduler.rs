//! Run lifecycle: ramp-up, steady state, and cooperative shutdown.
use crate::aggregator::Aggregator;
use crate::client::{ClientError, HttpClient, ReqwestClient};
use crate::vu::VirtualUser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use stampede_core::{AggregateSnapshot, ConfigError, RunConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Cadence at which the supervisor re-evaluates the ramp target and the
/// wall-clock budget, and folds pending latencies.
const SUPERVISOR_TICK: Duration = Duration::from_millis(25);

/// Upper bound on the jittered pause before a crashed slot respawns.
const RESTART_BACKOFF_MS: u64 = 20;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid run configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("http client construction failed: {0}")]
    Client(#[from] ClientError),

    #[error("run supervisor failed: {0}")]
    Supervisor(String),
}

/// Handle to a run in progress.
pub struct RunHandle {
    aggregator: Aggregator,
    active: Arc<AtomicUsize>,
    supervisor: JoinHandle<AggregateSnapshot>,
}

impl RunHandle {
    /// Live consistent snapshot of the statistics so far.
    pub fn snapshot(&self) -> AggregateSnapshot {
        self.aggregator.snapshot()
    }

    /// Number of virtual users currently active. Non-decreasing during
    /// ramp-up; shrinks only when slots are abandoned or the run stops.
    pub fn active_vus(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Block until shutdown completes and return the final snapshot.
    pub async fn wait(self) -> Result<AggregateSnapshot, RunError> {
        self.supervisor
            .await
            .map_err(|err| RunError::Supervisor(err.to_string()))
    }
}

/// Validate the config and begin the run. The factory is invoked once per
/// virtual user (and again for every slot restart) so each VU owns its own
/// client; clients that share a connection pool can simply clone themselves.
///
/// Must be called within a tokio runtime.
pub fn start<C, F>(config: RunConfig, client_factory: F) -> Result<RunHandle, RunError>
where
    C: HttpClient + Send + Sync + 'static,
    F: Fn(usize) -> C + Send + Sync + 'static,
{
    config.validate()?;

    let aggregator = Aggregator::new();
    let active = Arc::new(AtomicUsize::new(0));
    let supervisor = tokio::spawn(supervise(
        Arc::new(config),
        Arc::new(client_factory),
        aggregator.clone(),
        active.clone(),
    ));

    Ok(RunHandle {
        aggregator,
        active,
        supervisor,
    })
}

/// [`start`] with the default reqwest-backed client shared across VUs.
pub fn start_http(config: RunConfig) -> Result<RunHandle, RunError> {
    let client = ReqwestClient::new()?;
    start(config, move |_| client.clone())
}

#[instrument(name = "run", skip_all, fields(vus = config.vus, endpoint = %config.endpoint))]
async fn supervise<C, F>(
    config: Arc<RunConfig>,
    factory: Arc<F>,
    aggregator: Aggregator,
    active: Arc<AtomicUsize>,
) -> AggregateSnapshot
where
    C: HttpClient + Send + Sync + 'static,
    F: Fn(usize) -> C + Send + Sync + 'static,
{
    info!(
        "starting run: {} VUs for {} against {}",
        config.vus,
        humantime::format_duration(config.duration),
        config.endpoint
    );

    let start = Instant::now();
    let stop = Arc::new(AtomicBool::new(false));
    let mut slots: Vec<JoinHandle<()>> = Vec::with_capacity(config.vus);

    let mut interval = tokio::time::interval(SUPERVISOR_TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let elapsed = start.elapsed();
        if elapsed >= config.duration {
            break;
        }

        let target = ramp_target(config.vus, elapsed, config.ramp_up);
        while slots.len() < target {
            let id = slots.len();
            trace!(slot = id, "starting virtual user");
            active.fetch_add(1, Ordering::Relaxed);
            let handle = tokio::spawn(run_slot(
                id,
                config.clone(),
                factory.clone(),
                aggregator.clone(),
                stop.clone(),
                active.clone(),
            ));
            slots.push(handle);
        }

        // Keep the latency digest bounded while the run is hot.
        aggregator.fold();
    }

    stop.store(true, Ordering::Release);
    debug!(slots = slots.len(), "duration reached; stop broadcast");

    // Cooperative shutdown: every loop gets until the grace deadline to
    // finish its in-flight request and acknowledge the stop flag.
    let deadline = tokio::time::Instant::now() + config.grace_period;
    let mut abandoned = 0usize;
    for handle in &mut slots {
        if tokio::time::timeout_at(deadline, &mut *handle).await.is_err() {
            abandoned += 1;
        }
    }
    if abandoned > 0 {
        warn!(
            abandoned,
            "shutdown grace period exceeded; abandoning in-flight virtual users"
        );
        // Seal first so a late outcome from a logically-destroyed VU can
        // never reach the counters.
        aggregator.seal();
        for handle in &slots {
            handle.abort();
        }
    }

    let elapsed = start.elapsed();
    aggregator.finish(elapsed);
    info!(
        "run complete in {}",
        humantime::format_duration(Duration::from_millis(elapsed.as_millis() as u64))
    );

    aggregator.snapshot()
}

/// One VU slot: respawns a fresh virtual user after a crash, until the stop
/// flag is set or the circuit breaker trips.
async fn run_slot<C, F>(
    id: usize,
    config: Arc<RunConfig>,
    factory: Arc<F>,
    aggregator: Aggregator,
    stop: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
) where
    C: HttpClient + Send + Sync + 'static,
    F: Fn(usize) -> C + Send + Sync + 'static,
{
    let mut rng = SmallRng::seed_from_u64(id as u64);
    let mut restarts: u32 = 0;
    let mut window = Instant::now();

    loop {
        let vu = VirtualUser::new(
            id,
            rng.gen(),
            (*factory)(id),
            config.clone(),
            aggregator.clone(),
            stop.clone(),
        );

        // The inner spawn isolates panics in client or check code: they
        // surface as a JoinError here instead of taking down the slot.
        match tokio::spawn(vu.run()).await {
            Ok(Ok(())) => break,
            Ok(Err(err)) => warn!(slot = id, %err, "virtual user crashed"),
            Err(err) if err.is_panic() => warn!(slot = id, "virtual user panicked"),
            Err(_) => break,
        }

        if stop.load(Ordering::Acquire) {
            break;
        }

        if window.elapsed() > config.restart_window {
            restarts = 0;
            window = Instant::now();
        }
        restarts += 1;
        if restarts >= config.restart_limit {
            warn!(
                slot = id,
                restarts, "restart budget exceeded; abandoning slot for the remainder of the run"
            );
            aggregator.slot_abandoned();
            break;
        }

        // Stagger the fresh VU so crash loops don't hammer in lockstep.
        let backoff = rng.gen_range(1..=RESTART_BACKOFF_MS);
        tokio::time::sleep(Duration::from_millis(backoff)).await;
    }

    active.fetch_sub(1, Ordering::Relaxed);
}

/// How many VUs should be active `elapsed` into the run: a linear ramp to
/// the full population, or everything at once when no ramp is configured.
fn ramp_target(vus: usize, elapsed: Duration, ramp_up: Option<Duration>) -> usize {
    match ramp_up {
        Some(ramp) if elapsed < ramp => {
            let fraction = elapsed.as_secs_f64() / ramp.as_secs_f64();
            ((vus as f64 * fraction).ceil() as usize).min(vus)
        }
        _ => vus,
    }
}
