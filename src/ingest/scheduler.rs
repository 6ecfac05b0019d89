// src/ingest/scheduler.rs
//! Fixed-interval poll timer with a single active tick.
//!
//! A timer fire that lands while the previous tick is still running is dropped, not
//! queued. Shutdown stops the timer and waits for the in-flight tick to finish;
//! external calls are never cancelled mid-flight.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::reconciler::{FeedReconciler, TickOutcome};

/// Admits at most one tick at a time.
#[derive(Debug, Clone, Default)]
pub struct TickGuard {
    busy: Arc<AtomicBool>,
}

/// Held for the duration of a tick; releases the guard on drop.
#[derive(Debug)]
pub struct TickPermit {
    busy: Arc<AtomicBool>,
}

impl TickGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<TickPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickPermit {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for TickPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Counters kept alongside the exported metrics, readable in-process.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub started: AtomicU64,
    pub skipped: AtomicU64,
}

pub struct PollScheduler {
    reconciler: Arc<FeedReconciler>,
    interval: Duration,
    guard: TickGuard,
    stats: Arc<SchedulerStats>,
}

impl PollScheduler {
    pub fn new(reconciler: Arc<FeedReconciler>, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
            guard: TickGuard::new(),
            stats: Arc::default(),
        }
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        self.stats.clone()
    }

    /// Tick until `shutdown` flips to `true` (or its sender is dropped).
    /// The first tick fires immediately.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<JoinHandle<()>> = None;

        tracing::info!(interval_secs = self.interval.as_secs(), "poll scheduler started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(permit) = self.guard.try_acquire() else {
                        self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                        counter!("feed_ticks_skipped_total").increment(1);
                        tracing::info!("previous tick still running; skipping");
                        continue;
                    };
                    self.stats.started.fetch_add(1, Ordering::Relaxed);
                    let reconciler = self.reconciler.clone();
                    in_flight = Some(tokio::spawn(async move {
                        let _permit = permit;
                        run_logged(&reconciler).await;
                    }));
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if let Some(h) = in_flight {
            if !h.is_finished() {
                tracing::info!("waiting for in-flight tick");
            }
            if let Err(e) = h.await {
                tracing::error!(error = %e, "tick task panicked");
            }
        }
        tracing::info!("poll scheduler stopped");
    }
}

async fn run_logged(reconciler: &FeedReconciler) {
    match reconciler.run_tick().await {
        Ok(TickOutcome::Processed { reports, cursor }) => {
            let enriched = reports.iter().filter(|r| r.thread_posted).count();
            let flips: usize = reports.iter().map(|r| r.flips.len()).sum();
            tracing::info!(
                target: "ingest",
                items = reports.len(),
                enriched,
                flips,
                cursor = %cursor,
                "tick complete"
            );
        }
        Ok(outcome) => tracing::debug!(target: "ingest", ?outcome, "tick idle"),
        Err(e) => tracing::error!(target: "ingest", error = %e, "tick aborted; cursor not advanced"),
    }
}
