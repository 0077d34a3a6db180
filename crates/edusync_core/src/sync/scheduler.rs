//! Debounced write scheduler.
//!
//! # Responsibility
//! - Hold at most one pending quiet period per aggregate.
//! - Restart the quiet period on every arm.
//! - Track flushes that already left the quiet period.
//!
//! # Invariants
//! - Arming aborts only the pending quiet period, so edits inside one quiet
//!   period coalesce into one flush of the latest state.
//! - A flush that started keeps running through later arms; only `cancel`
//!   aborts it.
//! - Dropping the timer cancels it.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};

#[derive(Debug, Default)]
pub struct DebounceTimer {
    pending: Option<JoinHandle<()>>,
    started: Arc<Mutex<Vec<AbortHandle>>>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `flush` to run once `quiet` elapses without another arm.
    pub fn arm<F>(&mut self, runtime: &Handle, quiet: Duration, flush: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }
        let started = Arc::clone(&self.started);
        let flush_runtime = runtime.clone();
        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(quiet).await;
            // No await past this point: an abort from `arm` cannot split the handoff.
            let handle = flush_runtime.spawn(flush);
            let mut started = started.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            started.retain(|flush| !flush.is_finished());
            started.push(handle.abort_handle());
        }));
    }

    /// Whether a flush left its quiet period and has not finished yet.
    pub fn is_flushing(&self) -> bool {
        self.started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .any(|flush| !flush.is_finished())
    }

    /// Drops the pending quiet period and aborts started flushes. Returns
    /// whether anything was still outstanding.
    pub fn cancel(&mut self) -> bool {
        let mut outstanding = false;
        if let Some(handle) = self.pending.take() {
            outstanding |= !handle.is_finished();
            handle.abort();
        }
        let mut started = self
            .started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for flush in started.drain(..) {
            outstanding |= !flush.is_finished();
            flush.abort();
        }
        outstanding
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::DebounceTimer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn counting_flush(counter: &Arc<AtomicUsize>) -> impl std::future::Future<Output = ()> {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_coalesces_into_one_flush() {
        let runtime = Handle::current();
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = DebounceTimer::new();

        for _ in 0..5 {
            timer.arm(&runtime, Duration::from_millis(1_000), counting_flush(&fired));
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_flush() {
        let runtime = Handle::current();
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = DebounceTimer::new();

        timer.arm(&runtime, Duration::from_millis(500), counting_flush(&fired));
        assert!(timer.cancel());
        assert!(!timer.cancel());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    fn slow_flush(
        counter: &Arc<AtomicUsize>,
        takes: Duration,
    ) -> impl std::future::Future<Output = ()> {
        let counter = Arc::clone(counter);
        async move {
            tokio::time::sleep(takes).await;
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_keeps_a_started_flush_running() {
        let runtime = Handle::current();
        let finished = Arc::new(AtomicUsize::new(0));
        let mut timer = DebounceTimer::new();

        timer.arm(
            &runtime,
            Duration::from_millis(500),
            slow_flush(&finished, Duration::from_secs(2)),
        );
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(timer.is_flushing());

        timer.arm(
            &runtime,
            Duration::from_millis(500),
            slow_flush(&finished, Duration::from_secs(2)),
        );
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(finished.load(Ordering::SeqCst), 2);
        assert!(!timer.is_flushing());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_a_started_flush() {
        let runtime = Handle::current();
        let finished = Arc::new(AtomicUsize::new(0));
        let mut timer = DebounceTimer::new();

        timer.arm(
            &runtime,
            Duration::from_millis(500),
            slow_flush(&finished, Duration::from_secs(2)),
        );
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(timer.cancel());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_cancels_it() {
        let runtime = Handle::current();
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let mut timer = DebounceTimer::new();
            timer.arm(&runtime, Duration::from_millis(500), counting_flush(&fired));
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
