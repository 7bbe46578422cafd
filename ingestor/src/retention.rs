//! Scheduled retention cleanup.
//!
//! A cron schedule decides when runs start; a single-slot guard makes sure at
//! most one run is in flight. A trigger that fires while the previous run is
//! still deleting is skipped, not queued.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::RetentionConfig;
use crate::errors::{Error, Result};
use crate::metrics::{
    RETENTION_DELETED_TOTAL, RETENTION_FAILURES_TOTAL, RETENTION_RUNS_TOTAL,
    RETENTION_RUN_SECONDS, RETENTION_SKIPPED_TOTAL,
};
use crate::store::ReadingStore;

/// Parses a cron expression. Classic five-field expressions get a leading
/// seconds field of `0`.
pub fn parse_schedule(expr: &str) -> Result<Schedule> {
    let expr = expr.trim();
    let normalized = if expr.split_whitespace().count() == 5 {
        format!("0 {}", expr)
    } else {
        expr.to_string()
    };

    Schedule::from_str(&normalized).map_err(|e| Error::Schedule(format!("{}: {}", expr, e)))
}

/// Single-slot run guard.
#[derive(Debug, Clone, Default)]
pub struct RunSlot {
    running: Arc<AtomicBool>,
}

impl RunSlot {
    /// Claims the slot, or returns `None` while another run holds it.
    pub fn try_acquire(&self) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .ok()
            .map(|_| RunGuard {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Releases its [`RunSlot`] when dropped, including on error or panic.
#[derive(Debug)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { deleted: u64 },
    /// A previous run still held the slot.
    Skipped,
    /// Retention is turned off.
    Disabled,
}

pub struct RetentionScheduler {
    store: ReadingStore,
    config: RetentionConfig,
    schedule: Schedule,
    slot: RunSlot,
}

impl RetentionScheduler {
    pub fn new(store: ReadingStore, config: RetentionConfig) -> Result<Self> {
        let schedule = parse_schedule(&config.schedule)?;
        Ok(Self {
            store,
            config,
            schedule,
            slot: RunSlot::default(),
        })
    }

    pub fn slot(&self) -> &RunSlot {
        &self.slot
    }

    /// Rows created before this instant are eligible for deletion.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::days(i64::from(self.config.retention_days))
    }

    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Runs one cleanup pass unless retention is off or a run is in flight.
    pub async fn trigger(&self, now: DateTime<Utc>) -> Result<RunOutcome> {
        if !self.config.enabled || !self.store.retention_enabled() {
            return Ok(RunOutcome::Disabled);
        }
        let Some(_guard) = self.slot.try_acquire() else {
            warn!("Skipping retention run - previous run still in progress");
            RETENTION_SKIPPED_TOTAL.inc();
            return Ok(RunOutcome::Skipped);
        };

        let cutoff = self.cutoff(now);
        info!(
            %cutoff,
            retention_days = self.config.retention_days,
            "Starting retention run"
        );
        let timer = RETENTION_RUN_SECONDS.start_timer();

        match self
            .store
            .cleanup_older_than(cutoff, self.config.batch_size)
            .await
        {
            Ok(deleted) => {
                timer.observe_duration();
                RETENTION_RUNS_TOTAL.inc();
                RETENTION_DELETED_TOTAL.inc_by(deleted as f64);
                info!(deleted, "Retention run complete");
                Ok(RunOutcome::Completed { deleted })
            }
            Err(e) => {
                timer.stop_and_discard();
                RETENTION_FAILURES_TOTAL.inc();
                error!("Retention run failed, will retry at next scheduled time: {}", e);
                Err(e)
            }
        }
    }

    /// Fires [`RetentionScheduler::trigger`] on the cron schedule until
    /// `shutdown` turns true, then waits for an in-flight run to finish.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            schedule = %self.config.schedule,
            batch_size = self.config.batch_size,
            "Starting retention scheduler"
        );
        let mut in_flight: Option<JoinHandle<()>> = None;

        loop {
            let now = Utc::now();
            let Some(next) = self.next_fire(now) else {
                warn!("Retention schedule has no upcoming fire time, stopping scheduler");
                break;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(next_run = %next, "Next retention run scheduled");

            tokio::select! {
                _ = tokio::time::sleep_until(Instant::now() + wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            // Keep the running handle so shutdown waits on the real run
            if in_flight.as_ref().is_some_and(|h| !h.is_finished()) {
                warn!("Skipping retention run - previous run still in progress");
                RETENTION_SKIPPED_TOTAL.inc();
                continue;
            }

            let scheduler = Arc::clone(&self);
            in_flight = Some(tokio::spawn(async move {
                // Errors are logged and counted inside trigger
                let _ = scheduler.trigger(Utc::now()).await;
            }));
        }

        if let Some(handle) = in_flight {
            if !handle.is_finished() {
                info!("Waiting for in-flight retention run");
            }
            let _ = handle.await;
        }
        info!("Retention scheduler stopped");
    }
}
