//! Repeating background jobs with explicit start/stop.
//!
//! A [`ScheduledTask`] runs its job immediately, then once per period, until
//! stopped or dropped. [`ScheduledTask::trigger`] requests an out-of-schedule
//! run and restarts the period from there.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::trace;

pub struct ScheduledTask {
    name: String,
    cancel: CancellationToken,
    refresh: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `job` on the current tokio runtime. `period` must be non-zero.
    pub fn spawn<F, Fut>(name: impl Into<String>, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let cancel = CancellationToken::new();
        let refresh = Arc::new(Notify::new());

        let task_cancel = cancel.clone();
        let task_refresh = refresh.clone();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => break,
                    _ = task_refresh.notified() => interval.reset(),
                    _ = interval.tick() => {}
                }

                trace!(task = %task_name, "running scheduled job");
                tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => break,
                    _ = job() => {}
                }
            }

            trace!(task = %task_name, "scheduled task stopped");
        });

        Self {
            name,
            cancel,
            refresh,
            handle,
        }
    }

    /// Run the job as soon as the current run (if any) finishes.
    pub fn trigger(&self) {
        trace!(task = %self.name, "refresh requested");
        self.refresh.notify_one();
    }

    /// Stop the task. An in-flight job is dropped at its next await point.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
