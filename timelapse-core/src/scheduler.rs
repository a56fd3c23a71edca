//! Generation scheduling
//!
//! A [`Scheduler`] owns the capture groups, a [`Generator`] and one
//! [`GenerationGate`]. Every trigger (startup, cron tick, manual) runs a
//! whole pass over all groups while holding the gate, so at most one pass
//! is active at a time.
//!
//! Triggers wait for the gate as async tasks and only move to tokio's
//! blocking pool once they hold it. A queued trigger never occupies a
//! blocking thread, which the stream handlers need for file I/O. Under the
//! `wait` policy at most one trigger waits behind the running pass; later
//! ones fold into it, since the waiting pass globs frames when it starts.

use chrono::{DateTime, Local};
use cron::Schedule;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex, MutexGuard, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{CaptureGroup, OverlapPolicy};
use crate::error::{Result, ResultExt, TimelapseError};
use crate::generate::{GroupReport, Generator};

/// Parse a cron expression with a leading seconds field
pub fn parse_schedule(spec: &str) -> Result<Schedule> {
    Schedule::from_str(spec.trim())
        .map_err(TimelapseError::from)
        .context(format!("Cron expression '{}'", spec))
}

/// First firing of `schedule` after `previous` that is still ahead of `now`
///
/// Firings missed while a tick was late are dropped rather than replayed,
/// and a timer that wakes slightly before `previous` cannot fire it twice.
pub fn following_firing(
    schedule: &Schedule,
    previous: &DateTime<Local>,
    now: &DateTime<Local>,
) -> Option<DateTime<Local>> {
    schedule.after(previous).find(|firing| firing > now)
}

/// Held gate that can move between tasks and threads
pub type GateGuard = OwnedMutexGuard<()>;

/// Mutual exclusion for generation passes
///
/// Cloning shares the gate. Two schedulers built with separate gates do not
/// exclude each other.
#[derive(Debug, Clone, Default)]
pub struct GenerationGate(Arc<Mutex<()>>);

impl GenerationGate {
    /// Create an open gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the current thread until the gate is free and hold it
    ///
    /// Panics when called from inside an async context; use [`acquire`](Self::acquire) there.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.0.blocking_lock()
    }

    /// Hold the gate if it is free right now
    pub fn try_lock(&self) -> Option<MutexGuard<'_, ()>> {
        self.0.try_lock().ok()
    }

    /// Wait for the gate without tying up a thread
    pub async fn acquire(&self) -> GateGuard {
        Arc::clone(&self.0).lock_owned().await
    }

    /// Owned variant of [`try_lock`](Self::try_lock)
    pub fn try_acquire(&self) -> Option<GateGuard> {
        Arc::clone(&self.0).try_lock_owned().ok()
    }

    /// True while a pass holds the gate
    pub fn is_busy(&self) -> bool {
        self.0.try_lock().is_err()
    }
}

/// Outcome of one pass over every capture group
#[derive(Debug, Clone)]
pub struct PassReport {
    /// One report per group, in configuration order
    pub groups: Vec<GroupReport>,
    /// Wall time of the pass, excluding time spent waiting for the gate
    pub elapsed: Duration,
}

impl PassReport {
    /// Videos published in this pass
    pub fn published(&self) -> usize {
        self.groups.iter().map(GroupReport::published).sum()
    }

    /// Frame rates that failed to encode or publish
    pub fn failed(&self) -> usize {
        self.groups.iter().map(GroupReport::failed).sum()
    }

    /// Groups skipped for lack of frames
    pub fn skipped(&self) -> usize {
        self.groups.iter().filter(|g| g.is_skipped()).count()
    }
}

/// Runs generation passes, one at a time
#[derive(Debug)]
pub struct Scheduler {
    groups: Vec<CaptureGroup>,
    generator: Generator,
    gate: GenerationGate,
    overlap: OverlapPolicy,
    /// A trigger is parked on the gate behind the running pass
    waiting: AtomicBool,
    stopped: AtomicBool,
}

impl Scheduler {
    /// Create a scheduler with its own gate
    pub fn new(groups: Vec<CaptureGroup>, generator: Generator) -> Self {
        Self {
            groups,
            generator,
            gate: GenerationGate::new(),
            overlap: OverlapPolicy::default(),
            waiting: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Use a specific gate, e.g. one shared with another component
    pub fn with_gate(mut self, gate: GenerationGate) -> Self {
        self.gate = gate;
        self
    }

    /// Set the overlap policy
    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// The gate guarding passes
    pub fn gate(&self) -> &GenerationGate {
        &self.gate
    }

    /// Refuse every later or still-queued trigger
    ///
    /// A pass that already started runs to completion.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!("Generation stopped, queued triggers will be dropped");
        }
    }

    /// True once [`stop`](Self::stop) was called
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Run one pass on the current thread, honoring the overlap policy
    ///
    /// Blocks the calling thread under `wait`; call it from a plain thread
    /// or the blocking pool. Returns `None` if the pass was skipped.
    pub fn run_pass(&self) -> Option<PassReport> {
        let _guard = match self.overlap {
            OverlapPolicy::Wait => {
                if self.gate.is_busy() {
                    debug!("Generation pass in progress, waiting for it to finish");
                }
                self.gate.lock()
            }
            OverlapPolicy::Skip => match self.gate.try_lock() {
                Some(guard) => guard,
                None => {
                    info!("Generation pass already running, skipping trigger");
                    return None;
                }
            },
        };

        if self.is_stopped() {
            debug!("Scheduler stopped, not running pass");
            return None;
        }

        Some(self.run_locked())
    }

    /// The pass itself; the caller holds the gate
    fn run_locked(&self) -> PassReport {
        let started = Instant::now();
        info!("Generation pass started ({} groups)", self.groups.len());

        let groups: Vec<GroupReport> = self
            .groups
            .iter()
            .map(|group| self.generator.generate(group))
            .collect();

        let report = PassReport {
            groups,
            elapsed: started.elapsed(),
        };

        info!(
            "Generation pass finished in {:.1}s: {} published, {} failed, {} groups without frames",
            report.elapsed.as_secs_f64(),
            report.published(),
            report.failed(),
            report.skipped()
        );
        report
    }

    /// Take the gate for a trigger according to the overlap policy
    async fn acquire_for_trigger(&self) -> Option<GateGuard> {
        if let Some(guard) = self.gate.try_acquire() {
            return Some(guard);
        }

        match self.overlap {
            OverlapPolicy::Skip => {
                info!("Generation pass already running, skipping trigger");
                None
            }
            OverlapPolicy::Wait => {
                if self.waiting.swap(true, Ordering::SeqCst) {
                    info!("A trigger is already waiting for the running pass, merging into it");
                    return None;
                }
                debug!("Generation pass in progress, waiting for it to finish");
                let guard = self.gate.acquire().await;
                self.waiting.store(false, Ordering::SeqCst);
                Some(guard)
            }
        }
    }

    /// Start a pass without waiting for it
    ///
    /// The gate is awaited on the async runtime; only the pass itself runs
    /// on the blocking pool.
    pub fn trigger(self: &Arc<Self>, reason: &'static str) -> JoinHandle<Option<PassReport>> {
        debug!("Generation triggered by {}", reason);
        let scheduler = Arc::clone(self);

        tokio::spawn(async move {
            if scheduler.is_stopped() {
                return None;
            }

            let guard = scheduler.acquire_for_trigger().await?;
            if scheduler.is_stopped() {
                debug!("Scheduler stopped while {} trigger waited, dropping it", reason);
                return None;
            }

            let pass = Arc::clone(&scheduler);
            let handle = tokio::task::spawn_blocking(move || {
                let _guard = guard;
                pass.run_locked()
            });

            match handle.await {
                Ok(report) => Some(report),
                Err(e) => {
                    error!("Generation pass failed to complete: {}", e);
                    None
                }
            }
        })
    }

    /// Trigger a pass on every firing of `schedule` until `shutdown` fires
    ///
    /// Ticks do not wait for the pass they start; overlapping ticks are
    /// resolved by the overlap policy. Shutdown also stops the scheduler.
    pub async fn run_cron(self: Arc<Self>, schedule: Schedule, mut shutdown: broadcast::Receiver<()>) {
        info!("Generation schedule started");

        let mut next = schedule.upcoming(Local).next();

        loop {
            let Some(firing) = next else {
                warn!("Schedule has no future firings, stopping");
                return;
            };
            let wait = (firing - Local::now()).to_std().unwrap_or(Duration::ZERO);
            debug!("Next generation at {} (in {:?})", firing, wait);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.trigger("schedule");
                    next = following_firing(&schedule, &firing, &Local::now());
                }
                _ = shutdown.recv() => {
                    self.stop();
                    info!("Generation schedule stopped");
                    return;
                }
            }
        }
    }
}
