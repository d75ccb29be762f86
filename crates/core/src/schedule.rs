use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Repeating period of `base` plus a uniform draw from `[0, jitter]`, redrawn every cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    pub base: Duration,
    pub jitter: Duration,
}

impl Cadence {
    pub const fn from_millis(base_ms: u64, jitter_ms: u64) -> Self {
        Self { base: Duration::from_millis(base_ms), jitter: Duration::from_millis(jitter_ms) }
    }

    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.base;
        }
        self.base + Duration::from_millis(rng.gen_range(0..=jitter_ms))
    }
}

#[async_trait]
pub trait PeriodicTask: Send + 'static {
    fn name(&self) -> &'static str;

    async fn run_once(&mut self);
}

/// Handle to a task started by [`spawn_periodic`]. Dropping it stops the loop
/// at its next wait.
#[derive(Debug)]
pub struct TaskHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Cancels the pending timer. A run already in progress completes first.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn join(self) {
        let _ = self.join.await;
    }

    pub async fn stop_and_join(self) {
        self.stop();
        self.join().await;
    }
}

/// Runs `task` forever: wait, run, redraw the delay, repeat.
///
/// The first wait is `initial_delay` when given, otherwise one drawn period.
pub fn spawn_periodic<T: PeriodicTask>(
    mut task: T,
    initial_delay: Option<Duration>,
    cadence: Cadence,
    mut rng: StdRng,
) -> TaskHandle {
    let (shutdown, mut stopped) = watch::channel(false);
    let join = tokio::spawn(async move {
        let mut delay = initial_delay.unwrap_or_else(|| cadence.next_delay(&mut rng));
        loop {
            tokio::select! {
                biased;
                _ = stopped.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            task.run_once().await;
            if *stopped.borrow() {
                break;
            }
            delay = cadence.next_delay(&mut rng);
        }
        debug!(event_name = "schedule.task.exit", task = task.name(), "periodic task exited");
    });
    TaskHandle { shutdown, join }
}

/// Independent random stream per task. A fixed seed makes every stream reproducible.
pub fn task_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => {
            StdRng::seed_from_u64(seed.wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
        }
        None => StdRng::from_entropy(),
    }
}
