//! Interval-driven polling loops with pause, stop and overlap protection

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

// ─── Handle ──────────────────────────────────────────────────────────

/// Handle to one running loop
pub struct LoopHandle {
    name: String,
    enabled_tx: Arc<watch::Sender<bool>>,
    in_flight: Arc<AtomicBool>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LoopHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled_tx.borrow()
    }

    /// Resume starting cycles
    pub fn enable(&self) {
        let _ = self.enabled_tx.send(true);
        info!("{}: enabled", self.name);
    }

    /// Stop starting cycles without ending the loop
    pub fn disable(&self) {
        let _ = self.enabled_tx.send(false);
        info!("{}: paused", self.name);
    }

    /// True while a cycle is running
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// End the loop. A cycle already running is left to finish on its own.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!("{}: loop task ended abnormally: {}", self.name, e);
        }
    }
}

/// Clears the in-flight flag when a cycle ends, even by panic
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ─── Spawn ───────────────────────────────────────────────────────────

/// Run `cycle` every `period` until stopped.
///
/// Each cycle runs as its own task. A tick that arrives while the previous
/// cycle is still running is skipped.
pub fn spawn_polling_loop<F, Fut>(name: impl Into<String>, period: Duration, cycle: F) -> LoopHandle
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let name = name.into();
    let (enabled_tx, enabled_rx) = watch::channel(true);
    let in_flight = Arc::new(AtomicBool::new(false));
    let cancel = CancellationToken::new();

    let task = tokio::spawn(polling_loop(
        name.clone(),
        period,
        enabled_rx,
        in_flight.clone(),
        cancel.clone(),
        cycle,
    ));

    LoopHandle {
        name,
        enabled_tx: Arc::new(enabled_tx),
        in_flight,
        cancel,
        task,
    }
}

// ─── Loop ────────────────────────────────────────────────────────────

async fn polling_loop<F, Fut>(
    name: String,
    period: Duration,
    mut enabled_rx: watch::Receiver<bool>,
    in_flight: Arc<AtomicBool>,
    cancel: CancellationToken,
    cycle: F,
) where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    info!("{}: loop started ({}ms interval)", name, period.as_millis());

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("{}: cancelled, exiting", name);
                return;
            }
            _ = interval.tick() => {
                if !*enabled_rx.borrow_and_update() {
                    continue;
                }
                if in_flight.swap(true, Ordering::AcqRel) {
                    debug!("{}: previous cycle still running, skipping tick", name);
                    continue;
                }

                let guard = InFlightGuard(in_flight.clone());
                let run = cycle();
                tokio::spawn(async move {
                    let _guard = guard;
                    run.await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_loop(period_ms: u64, work_ms: u64) -> (LoopHandle, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handle = spawn_polling_loop("Test", Duration::from_millis(period_ms), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(work_ms)).await;
            }
        });
        (handle, count)
    }

    #[tokio::test]
    async fn test_cycles_run_until_paused() {
        let (handle, count) = counting_loop(10, 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(count.load(Ordering::SeqCst) > 0);

        handle.disable();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let paused_at = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), paused_at);
        assert!(!handle.is_enabled());

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_overlapping_ticks_skipped() {
        let (handle, count) = counting_loop(10, 250);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(handle.is_busy());
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_ends_loop() {
        let (handle, count) = counting_loop(10, 0);
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.stop().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stopped_at = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), stopped_at);
    }
}
