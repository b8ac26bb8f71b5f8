//! Repeating tick timer.
//!
//! One tokio task drives the tick callback. The callback is synchronous, so a
//! stop request is only observed between ticks and never interrupts one.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

const MIN_PERIOD: Duration = Duration::from_millis(1);

struct RunningTimer {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct Scheduler {
    running: Mutex<Option<RunningTimer>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.is_running())
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start calling `on_tick` every `period`, the first call one period from
    /// now.
    ///
    /// Returns `false` if a timer is already running or no tokio runtime is
    /// available.
    pub fn start<F>(&self, period: Duration, mut on_tick: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        let mut running = self.lock();
        if running
            .as_ref()
            .is_some_and(|timer| !timer.handle.is_finished())
        {
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "cannot start fleet scheduler outside a tokio runtime"
                );
                return false;
            }
        };

        let period = period.max(MIN_PERIOD);
        let (shutdown, mut stopped) = watch::channel(false);
        let handle = runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => on_tick(),
                }
            }
            tracing::debug!("fleet scheduler stopped");
        });

        tracing::info!(
            period_ms = period.as_millis() as u64,
            "fleet scheduler started"
        );
        *running = Some(RunningTimer { shutdown, handle });
        true
    }

    /// Signal the timer task to exit after any in-flight tick.
    ///
    /// Returns `false` if nothing was running.
    pub fn stop(&self) -> bool {
        let Some(timer) = self.lock().take() else {
            return false;
        };
        let was_running = !timer.handle.is_finished();
        let _ = timer.shutdown.send(true);
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|timer| !timer.handle.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<RunningTimer>> {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.lock().take() {
            let _ = timer.shutdown.send(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        (count, move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_and_first_tick_waits_one_period() {
        let scheduler = Scheduler::new();
        let (count, on_tick) = counting();

        assert!(scheduler.start(Duration::from_secs(10), on_tick));
        assert!(!scheduler.start(Duration::from_secs(10), || {}));
        assert!(scheduler.is_running());

        time::sleep(Duration::from_secs(9)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        assert!(scheduler.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticks_and_is_idempotent() {
        let scheduler = Scheduler::new();
        assert!(!scheduler.stop());

        let (count, on_tick) = counting();
        assert!(scheduler.start(Duration::from_secs(1), on_tick));
        time::sleep(Duration::from_millis(2_500)).await;
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert!(!scheduler.is_running());

        let seen = count.load(Ordering::SeqCst);
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop() {
        let scheduler = Scheduler::new();
        assert!(scheduler.start(Duration::from_secs(1), || {}));
        assert!(scheduler.stop());
        tokio::task::yield_now().await;
        assert!(scheduler.start(Duration::from_secs(1), || {}));
        assert!(scheduler.stop());
    }

    #[test]
    fn start_without_runtime_fails() {
        let scheduler = Scheduler::new();
        assert!(!scheduler.start(Duration::from_secs(1), || {}));
        assert!(!scheduler.is_running());
    }
}
