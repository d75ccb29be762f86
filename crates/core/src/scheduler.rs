use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::pricing::PricingEngine;
use crate::schedule::{spawn_periodic, task_rng, Cadence, PeriodicTask, TaskHandle};

pub const DEFAULT_WARMUP: Duration = Duration::from_millis(3_000);
pub const DEFAULT_CADENCE: Cadence = Cadence::from_millis(8_000, 7_000);

const SCHEDULER_RNG_STREAM: u64 = 0x5EED_0001;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Stopped,
    Running,
}

struct OptimizationPass {
    engine: Arc<PricingEngine>,
}

#[async_trait]
impl PeriodicTask for OptimizationPass {
    fn name(&self) -> &'static str {
        "optimization"
    }

    async fn run_once(&mut self) {
        if let Err(error) = self.engine.optimize_catalog().await {
            warn!(
                event_name = "pricing.pass.failed",
                error = %error,
                "optimization pass could not list products"
            );
        }
    }
}

struct RunningLoop {
    task: TaskHandle,
    /// Set once `stop` has signalled the loop; it stays tracked until any
    /// in-flight pass has returned.
    stopping: bool,
}

/// Drives a full-catalog optimization pass on a jittered timer.
pub struct OptimizationScheduler {
    engine: Arc<PricingEngine>,
    warmup: Duration,
    cadence: Cadence,
    seed: Option<u64>,
    current: Mutex<Option<RunningLoop>>,
}

impl OptimizationScheduler {
    pub fn new(engine: Arc<PricingEngine>) -> Self {
        Self {
            engine,
            warmup: DEFAULT_WARMUP,
            cadence: DEFAULT_CADENCE,
            seed: None,
            current: Mutex::new(None),
        }
    }

    pub fn with_timing(mut self, warmup: Duration, cadence: Cadence) -> Self {
        self.warmup = warmup;
        self.cadence = cadence;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn state(&self) -> SchedulerState {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some(running) if !running.stopping && !running.task.is_finished() => {
                SchedulerState::Running
            }
            _ => SchedulerState::Stopped,
        }
    }

    /// Schedules the first pass after the warm-up. Returns `false` when
    /// already running, or when a pass from a previous run is still in
    /// flight. Must be called inside a tokio runtime.
    pub fn start(&self) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = current.as_ref().filter(|running| !running.task.is_finished()) {
            if running.stopping {
                warn!(
                    event_name = "pricing.scheduler.start_deferred",
                    "previous optimization pass still running; start refused"
                );
            }
            return false;
        }

        *current = Some(RunningLoop {
            task: spawn_periodic(
                OptimizationPass { engine: Arc::clone(&self.engine) },
                Some(self.warmup),
                self.cadence,
                task_rng(self.seed, SCHEDULER_RNG_STREAM),
            ),
            stopping: false,
        });
        info!(
            event_name = "pricing.scheduler.started",
            warmup_ms = self.warmup.as_millis() as u64,
            base_interval_ms = self.cadence.base.as_millis() as u64,
            jitter_ms = self.cadence.jitter.as_millis() as u64,
            "optimization scheduler started"
        );
        true
    }

    /// Cancels the pending timer without waiting. An in-flight pass finishes
    /// on its own. Returns `false` when nothing was running.
    pub fn stop(&self) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.as_mut() {
            Some(running) if !running.stopping && !running.task.is_finished() => {
                running.task.stop();
                running.stopping = true;
                info!(event_name = "pricing.scheduler.stopped", "optimization scheduler stopped");
                true
            }
            Some(running) if running.task.is_finished() => {
                *current = None;
                false
            }
            _ => false,
        }
    }

    /// Like [`stop`](Self::stop) but waits for an in-flight pass to finish.
    pub async fn stop_and_wait(&self) -> bool {
        let Some(running) = self.current.lock().unwrap_or_else(PoisonError::into_inner).take()
        else {
            return false;
        };
        let was_running = !running.stopping && !running.task.is_finished();
        running.task.stop_and_join().await;
        if was_running {
            info!(event_name = "pricing.scheduler.stopped", "optimization scheduler stopped");
        }
        was_running
    }
}
