//! Background reaping of idle velocity state.

use crate::clock::Clock;
use crate::engine::AdmissionPolicy;
use crate::velocity::VelocityStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How often the sweep task wakes, and the minimum spacing between two
/// completed sweeps.
pub const SWEEP_INTERVAL_MS: u64 = 5_000;

/// Periodic background sweep that evicts idle keys to bound store memory.
///
/// Construction only wires dependencies; nothing runs until [`Reaper::start`].
/// The only state carried across a stop/start cycle is the last-sweep
/// timestamp, so the task restarts idempotently. Clones share the same task
/// slot and sweep schedule.
#[derive(Debug, Clone)]
pub struct Reaper {
    store: Arc<VelocityStore>,
    clock: Arc<dyn Clock>,
    last_sweep_millis: Arc<AtomicU64>,
    task: Arc<Mutex<Option<SweepTask>>>,
}

#[derive(Debug)]
struct SweepTask {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl Reaper {
    /// Wire a reaper to the store and clock behind `policy`.
    pub fn new(policy: &AdmissionPolicy) -> Self {
        Self {
            store: policy.store().clone(),
            clock: policy.clock().clone(),
            last_sweep_millis: Arc::new(AtomicU64::new(0)),
            task: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the sweep task. No-op when already running; restarts cleanly
    /// after [`Reaper::stop`]. Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut slot = self.task.lock().expect("reaper task slot poisoned");
        if slot.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let reaper = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    () = tokio::time::sleep(Duration::from_millis(SWEEP_INTERVAL_MS)) => {
                        reaper.sweep_if_due(reaper.clock.now_millis());
                    }
                }
            }
            tracing::debug!(target: "turnstile::reaper", "sweep task stopped");
        });

        *slot = Some(SweepTask { handle, shutdown });
    }

    /// Signal the sweep task and wait for it to exit. No-op when not running.
    ///
    /// The loop observes the signal on its next turn, so the wait is bounded
    /// by at most one in-flight sweep.
    pub async fn stop(&self) {
        let task = self.task.lock().expect("reaper task slot poisoned").take();
        if let Some(task) = task {
            let _ = task.shutdown.send(true);
            let _ = task.handle.await;
        }
    }

    /// Whether the sweep task is currently running.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .expect("reaper task slot poisoned")
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Run one sweep if more than [`SWEEP_INTERVAL_MS`] has elapsed since the
    /// last completed sweep; returns whether a sweep ran.
    ///
    /// The scheduled tick and this elapsed-time check double-guard the sweep,
    /// so a jittered or delayed tick cannot cause back-to-back full sweeps.
    pub fn sweep_if_due(&self, now: u64) -> bool {
        let last = self.last_sweep_millis.load(Ordering::Acquire);
        if now.saturating_sub(last) <= SWEEP_INTERVAL_MS {
            return false;
        }

        let evicted = self.store.evict_idle(now);
        self.last_sweep_millis.store(now, Ordering::Release);
        tracing::debug!(
            target: "turnstile::reaper",
            evicted,
            tracked = self.store.tracked_key_count(),
            "idle sweep complete"
        );
        true
    }
}
