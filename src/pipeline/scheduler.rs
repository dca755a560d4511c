// src/pipeline/scheduler.rs

//! The discovery loop.
//!
//! A single background task runs a cycle, waits the configured interval in
//! `PROGRESS_STEPS` observable steps, and repeats until stopped. Stopping is
//! cooperative: a running cycle always finishes, and the wait ends as soon as
//! the cancellation token fires.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;
use crate::models::WatchConfig;
use crate::pipeline::cycle::{CycleRunner, NotificationDedup};
use crate::services::EventSink;

/// Number of progress updates emitted during one inter-cycle wait.
pub const PROGRESS_STEPS: u32 = 100;

/// Watch list shared with whoever edits it while the loop runs.
///
/// The loop clones it at the start of every cycle, so edits apply from the
/// next cycle on.
pub type SharedConfig = Arc<RwLock<WatchConfig>>;

/// Wrap a watch list for use with [`Scheduler::start`].
pub fn share(config: WatchConfig) -> SharedConfig {
    Arc::new(RwLock::new(config))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    StopRequested,
}

/// Owns the run state and the cancellation token of the discovery loop.
pub struct Scheduler {
    runner: Arc<CycleRunner>,
    state: Arc<Mutex<RunState>>,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(runner: CycleRunner) -> Self {
        Self {
            runner: Arc::new(runner),
            state: Arc::new(Mutex::new(RunState::Idle)),
            cancel: None,
            handle: None,
        }
    }

    pub fn state(&self) -> RunState {
        *lock_state(&self.state)
    }

    /// Validate the watch list and spawn the loop on the current tokio runtime.
    ///
    /// Fails with `AlreadyRunning` until a previous loop has fully stopped.
    pub fn start(&mut self, config: SharedConfig) -> Result<(), SchedulerError> {
        let mut state = lock_state(&self.state);
        if *state != RunState::Idle {
            return Err(SchedulerError::AlreadyRunning);
        }

        snapshot(&config)
            .validate_for_run()
            .map_err(SchedulerError::InvalidConfig)?;

        let token = CancellationToken::new();
        *state = RunState::Running;
        drop(state);

        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.runner),
            config,
            token.clone(),
            Arc::clone(&self.state),
        ));

        self.cancel = Some(token);
        self.handle = Some(handle);
        log::info!("Discovery loop started");
        Ok(())
    }

    /// Request the loop to stop. No-op unless it is running.
    pub fn stop(&mut self) {
        let mut state = lock_state(&self.state);
        if *state != RunState::Running {
            return;
        }
        *state = RunState::StopRequested;
        if let Some(token) = &self.cancel {
            token.cancel();
        }
        self.runner.sink().info("Stopping search...");
    }

    /// Wait until the loop task has exited.
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                log::error!("Discovery loop task failed: {}", e);
                *lock_state(&self.state) = RunState::Idle;
            }
        }
        self.cancel = None;
    }

    /// `stop` followed by `join`.
    pub async fn shutdown(&mut self) {
        self.stop();
        self.join().await;
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(token) = &self.cancel {
            token.cancel();
        }
    }
}

fn lock_state(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn snapshot(config: &SharedConfig) -> WatchConfig {
    match config.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

async fn run_loop(
    runner: Arc<CycleRunner>,
    config: SharedConfig,
    token: CancellationToken,
    state: Arc<Mutex<RunState>>,
) {
    let mut notifications = NotificationDedup::new();

    while !token.is_cancelled() {
        let current = snapshot(&config);
        runner.run_cycle(&current, &mut notifications).await;

        let interval = Duration::from_secs(current.interval_secs.max(1));
        runner.sink().info(&format!(
            "Waiting {} seconds before the next search...",
            interval.as_secs()
        ));
        if !wait_interval(interval, &token, runner.sink()).await {
            break;
        }
    }

    *lock_state(&state) = RunState::Idle;
    runner.sink().info("Search stopped");
}

/// Sleep for `interval` in `PROGRESS_STEPS` steps, reporting progress.
///
/// Returns false if cancelled before the full interval elapsed.
async fn wait_interval(interval: Duration, token: &CancellationToken, sink: &dyn EventSink) -> bool {
    let step = interval / PROGRESS_STEPS;
    sink.on_progress(0.0);

    for i in 1..=PROGRESS_STEPS {
        tokio::select! {
            _ = token.cancelled() => return false,
            _ = tokio::time::sleep(step) => {}
        }
        sink.on_progress(f64::from(i) / f64::from(PROGRESS_STEPS));
    }
    true
}
