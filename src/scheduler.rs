//! Sync scheduling
//!
//! A single coordinating task consumes change events from a channel and
//! decides when the sync job runs. The job itself executes on tokio's
//! blocking pool while the coordinator keeps draining events.
//!
//! ```text
//! Immediate:  Idle ⇄ Running              (events while Running are dropped)
//! Debounced:  Idle → Scheduled → Running → Scheduled …
//!             (events re-arm the deadline; every finished run re-arms it
//!              too, so events while Running need no queue)
//! ```

use anyhow::Result;
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, sleep_until};

use crate::watcher::ChangeEvent;

/// Work performed on every scheduled sync
pub trait SyncJob: Send + Sync + 'static {
    fn run(&self) -> Result<()>;
}

impl<F> SyncJob for F
where
    F: Fn() -> Result<()> + Send + Sync + 'static,
{
    fn run(&self) -> Result<()> {
        self()
    }
}

/// When a change event leads to a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Run right away unless a run is already in flight
    Immediate,
    /// Run once no event arrived for the given delay, then periodically
    Debounced(Duration),
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Scheduled(Instant),
    Running,
}

/// Counters reported when the scheduler stops
#[derive(Debug, Default, Clone)]
pub struct SchedulerStats {
    /// Runs started
    pub runs: usize,
    /// Runs that returned an error or panicked
    pub failures: usize,
    /// Events received while a run was in flight
    pub skipped: usize,
    /// Completion time of the last successful run
    pub last_sync: Option<DateTime<Local>>,
}

type InFlight = Option<JoinHandle<Result<()>>>;

pub struct SyncScheduler {
    trigger: Trigger,
    job: Arc<dyn SyncJob>,
    state: State,
    initial_sync: bool,
    stats: SchedulerStats,
}

impl SyncScheduler {
    pub fn new(trigger: Trigger, job: impl SyncJob) -> Self {
        Self {
            trigger,
            job: Arc::new(job),
            state: State::Idle,
            initial_sync: false,
            stats: SchedulerStats::default(),
        }
    }

    /// Trigger once at start-up as if a change had been seen
    pub fn with_initial_sync(mut self, initial_sync: bool) -> Self {
        self.initial_sync = initial_sync;
        self
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    /// Drive the scheduler until the event channel closes.
    ///
    /// A pending deadline is discarded on close, but an in-flight run is
    /// always awaited before returning.
    pub async fn run(mut self, mut events: mpsc::Receiver<ChangeEvent>) -> SchedulerStats {
        let mut inflight: InFlight = None;
        let mut open = true;

        if self.initial_sync {
            inflight = self.on_trigger();
        }

        loop {
            if !open && inflight.is_none() {
                break;
            }

            let deadline = match self.state {
                State::Scheduled(at) => Some(at),
                _ => None,
            };

            tokio::select! {
                event = events.recv(), if open => match event {
                    Some(event) => {
                        tracing::info!(path = %event.path.display(), kind = ?event.kind, "File changed");
                        if let Some(handle) = self.on_trigger() {
                            inflight = Some(handle);
                        }
                    }
                    None => {
                        open = false;
                        if matches!(self.state, State::Scheduled(_)) {
                            tracing::debug!("Discarding pending sync");
                            self.state = State::Idle;
                        }
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    inflight = Some(self.start());
                }
                result = join(&mut inflight), if inflight.is_some() => {
                    inflight = None;
                    self.finish(result);
                }
                else => break,
            }
        }

        self.stats
    }

    /// React to a change (or the start-up kick). Returns a handle if a run started.
    fn on_trigger(&mut self) -> InFlight {
        match (self.trigger, self.state) {
            (Trigger::Immediate, State::Running) => {
                tracing::info!("Sync already in progress, skipping");
                self.stats.skipped += 1;
                None
            }
            (Trigger::Debounced(_), State::Running) => {
                tracing::debug!("Sync in progress, next run is re-armed afterwards");
                self.stats.skipped += 1;
                None
            }
            (Trigger::Immediate, _) => Some(self.start()),
            (Trigger::Debounced(delay), _) => {
                self.schedule(delay);
                None
            }
        }
    }

    fn schedule(&mut self, delay: Duration) {
        self.state = State::Scheduled(Instant::now() + delay);
        tracing::info!(delay_secs = delay.as_secs_f64(), "Sync scheduled");
    }

    fn start(&mut self) -> JoinHandle<Result<()>> {
        self.state = State::Running;
        self.stats.runs += 1;
        tracing::info!("Syncing content");

        let job = Arc::clone(&self.job);
        tokio::task::spawn_blocking(move || job.run())
    }

    fn finish(&mut self, result: Result<Result<()>, JoinError>) {
        self.state = State::Idle;

        match result {
            Ok(Ok(())) => {
                let now = Local::now();
                tracing::info!(at = %now.format("%Y-%m-%d %H:%M:%S"), "Sync completed");
                self.stats.last_sync = Some(now);
            }
            Ok(Err(e)) => {
                let error = format!("{e:#}");
                tracing::error!(%error, "Error during sync");
                self.stats.failures += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, "Sync task aborted");
                self.stats.failures += 1;
            }
        }

        // Periodic fallback: the next run is due one interval after this one
        if let Trigger::Debounced(delay) = self.trigger {
            self.schedule(delay);
        }
    }
}

async fn join(inflight: &mut InFlight) -> Result<Result<()>, JoinError> {
    match inflight {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
