use std::{
    sync::{
        atomic::AtomicBool,
        mpsc,
        Arc,
        Mutex,
    },
    time::Duration,
};

use tokio::{
    runtime::Runtime,
    time::MissedTickBehavior,
};
use tracing::{
    debug,
    info,
    warn,
};
use uuid::Uuid;

use super::{
    TaskHandle,
    TaskState,
    TaskUpdate,
};
use crate::{
    analysis::progress::ProgressReporter,
    core::{
        settings::AnalyzerSettings,
        TalosError,
    },
};

/// Polling never claims more than this before the worker has actually finished.
const ESTIMATE_CAP: f32 = 90.0;

/// Runs analysis jobs on the runtime's blocking pool, one monitor per job.
pub struct TaskRunner {
    runtime: Arc<Runtime>,
    poll_interval: Duration,
}

impl TaskRunner {
    pub fn new(settings: &AnalyzerSettings) -> Result<Self, TalosError> {
        let runtime = Arc::new(Runtime::new()?);
        Ok(Self { runtime, poll_interval: settings.poll_interval() })
    }

    /// Starts `job` off the caller's thread and returns immediately.
    ///
    /// Every `poll_interval` the monitor sends a progress estimate of
    /// `min(90, max(elapsed / timeout * 90, worker fraction * 100))`, never lower than
    /// the previous one. A finished job yields `Progress(100)` then `Completed`, or
    /// `Failed`. At the deadline the monitor sends `TimedOut` once, raises the cancel
    /// flag and stops listening: a job that ignores the flag runs on and its result
    /// is dropped.
    pub fn start<T, F>(&self, job: F, timeout: Duration) -> AnalysisTask<T>
    where
        T: Send + 'static,
        F: FnOnce(&ProgressReporter) -> Result<T, TalosError> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel();
        let cancel_token = Arc::new(AtomicBool::new(false));
        let reporter = Arc::new(ProgressReporter::with_cancel_flag(Arc::clone(&cancel_token)));
        let state = Arc::new(Mutex::new(TaskState::Pending));
        let handle = TaskHandle::new(cancel_token, timeout);
        let poll_interval = self.poll_interval;

        let monitor_state = Arc::clone(&state);
        let clock = handle.clone();
        self.runtime.spawn(async move {
            set_state(&monitor_state, TaskState::Running);

            let worker_reporter = Arc::clone(&reporter);
            let mut worker = tokio::task::spawn_blocking(move || job(&worker_reporter));

            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last_percent = 0.0_f32;

            loop {
                tokio::select! {
                    biased;

                    joined = &mut worker => {
                        let update = match joined {
                            Ok(Ok(value)) => {
                                let _ = sender.send(TaskUpdate::Progress(100.0));
                                TaskUpdate::Completed(value)
                            }
                            Ok(Err(e)) => TaskUpdate::Failed(e),
                            Err(join_error) => {
                                TaskUpdate::Failed(TalosError::WorkerPanicked(join_error.to_string()))
                            }
                        };

                        info!(
                            "Task {} {} after {} ms",
                            id,
                            update.task_type(),
                            clock.elapsed().as_millis()
                        );
                        if let Some(terminal) = update.terminal_state() {
                            set_state(&monitor_state, terminal);
                        }
                        let _ = sender.send(update);
                        break;
                    }

                    _ = ticker.tick() => {
                        let elapsed = clock.elapsed();

                        if clock.is_overdue() {
                            clock.cancel();
                            set_state(&monitor_state, TaskState::TimedOut);
                            warn!("Task {} timed out after {:.1}s", id, elapsed.as_secs_f32());
                            let _ = sender.send(TaskUpdate::TimedOut { elapsed });

                            tokio::spawn(async move {
                                if let Ok(Ok(_)) = worker.await {
                                    warn!("Task {} finished after its timeout, result discarded", id);
                                }
                            });
                            break;
                        }

                        let percent = estimate_percent(elapsed, timeout, reporter.fraction());
                        if percent > last_percent {
                            last_percent = percent;
                            debug!("Task {} at {:.1}%", id, percent);
                            let _ = sender.send(TaskUpdate::Progress(percent));
                        }
                    }
                }
            }
        });

        AnalysisTask { id, state, receiver, handle }
    }

    /// Stops the runtime without waiting for jobs still running past their timeout.
    pub fn shutdown(self) {
        if let Ok(runtime) = Arc::try_unwrap(self.runtime) {
            runtime.shutdown_background();
        }
    }
}

fn set_state(state: &Mutex<TaskState>, next: TaskState) {
    if let Ok(mut current) = state.lock() {
        if !current.is_terminal() {
            *current = next;
        }
    }
}

fn estimate_percent(elapsed: Duration, timeout: Duration, worker_fraction: f32) -> f32 {
    let by_time = if timeout.is_zero() {
        ESTIMATE_CAP
    } else {
        elapsed.as_secs_f32() / timeout.as_secs_f32() * ESTIMATE_CAP
    };
    by_time.max(worker_fraction * 100.0).min(ESTIMATE_CAP)
}

/// Consumer side of one running analysis.
pub struct AnalysisTask<T> {
    id: Uuid,
    state: Arc<Mutex<TaskState>>,
    receiver: mpsc::Receiver<TaskUpdate<T>>,
    handle: TaskHandle,
}

impl<T> AnalysisTask<T> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TaskState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Clock and cancel flag; clone it to keep reading them while waiting.
    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    /// Asks the worker to stop at its next checkpoint. It then fails with `Cancelled`.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Updates delivered since the last poll, without blocking.
    pub fn poll(&mut self) -> Vec<TaskUpdate<T>> {
        let mut updates = Vec::new();

        while let Ok(update) = self.receiver.try_recv() {
            updates.push(update);
        }

        updates
    }

    /// Blocks until the task ends, handing each progress percent to `on_progress`.
    /// Returns the terminal update.
    pub fn wait_with_progress(self, mut on_progress: impl FnMut(f32)) -> TaskUpdate<T> {
        for update in self.receiver.iter() {
            match update {
                TaskUpdate::Progress(percent) => on_progress(percent),
                terminal => return terminal,
            }
        }

        TaskUpdate::Failed(TalosError::Custom(format!("task {} ended without a result", self.id)))
    }

    pub fn wait(self) -> TaskUpdate<T> {
        self.wait_with_progress(|_| {})
    }
}
