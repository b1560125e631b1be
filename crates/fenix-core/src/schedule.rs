// ── Scheduled tasks ──
//
// Fixed-period background jobs with explicit start/stop. Stopping cancels
// future ticks only; a tick already running is allowed to finish.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// When the first run happens after [`ScheduledTask::spawn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstRun {
    /// Run right away, then every period.
    Immediately,
    /// Wait one full period before the first run.
    AfterPeriod,
}

/// A named job run every `period` on the Tokio runtime.
///
/// Dropping the handle stops the schedule.
pub struct ScheduledTask {
    name: String,
    period: Duration,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn spawn<F, Fut>(
        name: impl Into<String>,
        period: Duration,
        first_run: FirstRun,
        mut job: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            if first_run == FirstRun::AfterPeriod {
                interval.tick().await; // consume the immediate first tick
            }

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = interval.tick() => {
                        trace!(task = %task_name, "tick");
                        job().await;
                    }
                }
            }
            debug!(task = %task_name, "scheduled task stopped");
        });

        debug!(task = %name, period_secs = period.as_secs(), "scheduled task started");
        Self {
            name,
            period,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Cancel future ticks. Returns immediately.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop and wait for an in-flight tick to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() -> std::future::Ready<()> + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        })
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_every_period() {
        let (count, job) = counter();
        let task =
            ScheduledTask::spawn("poll", Duration::from_secs(60), FirstRun::Immediately, job);

        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(120)).await;
        settle().await;
        assert!(count.load(Ordering::SeqCst) >= 3);
        assert!(task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn after_period_skips_first_tick() {
        let (count, job) = counter();
        let _task = ScheduledTask::spawn(
            "refresh",
            Duration::from_secs(900),
            FirstRun::AfterPeriod,
            job,
        );

        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(900)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_future_ticks() {
        let (count, job) = counter();
        let task =
            ScheduledTask::spawn("poll", Duration::from_secs(10), FirstRun::Immediately, job);
        settle().await;

        task.stop();
        assert!(!task.is_running());
        tokio::time::advance(Duration::from_secs(100)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_in_flight_tick() {
        let finished = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&finished);
        let task = ScheduledTask::spawn(
            "slow",
            Duration::from_secs(60),
            FirstRun::Immediately,
            move || {
                let inner = Arc::clone(&inner);
                async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    inner.fetch_add(1, Ordering::SeqCst);
                }
            },
        );
        settle().await;

        task.shutdown().await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_the_schedule() {
        let (count, job) = counter();
        drop(ScheduledTask::spawn("poll", Duration::from_secs(10), FirstRun::Immediately, job));
        settle().await;
        tokio::time::advance(Duration::from_secs(100)).await;
        settle().await;
        assert!(count.load(Ordering::SeqCst) <= 1);
    }
}
