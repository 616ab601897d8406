//! Content directory watcher
//!
//! Bridges `notify` callbacks into a tokio channel of [`ChangeEvent`]s for
//! the scheduler. A change is only forwarded once its path has been quiet for
//! the settle delay, so a save that lands as several writes is seen once and
//! only after the file is complete. Dropping the [`ContentWatcher`] stops the
//! watch and closes the channel.
//!
//! ```text
//! notify callback → std channel → bridge thread → filter → settle → mpsc<ChangeEvent>
//! ```

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::config::Config;

/// Kind of filesystem change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A change below the watched root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Map a notify event kind; access and metadata-only events are ignored
pub fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        _ => None,
    }
}

/// Decides which paths may trigger a sync
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter {
    ignore_names: Vec<String>,
    ignore_dirs: Vec<PathBuf>,
}

impl ChangeFilter {
    pub fn new(ignore_names: Vec<String>, ignore_dirs: Vec<PathBuf>) -> Self {
        Self {
            ignore_names,
            ignore_dirs,
        }
    }

    /// Ignore configured names plus the sync outputs, so writing posts or
    /// assets inside the notes tree does not retrigger a sync
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.settings.watch.ignore.clone(),
            vec![config.posts_dir.clone(), config.public_asset_dir()],
        )
    }

    pub fn accepts(&self, path: &Path) -> bool {
        if self.ignore_dirs.iter().any(|dir| path.starts_with(dir)) {
            return false;
        }
        if is_temp_file(path) {
            return false;
        }
        !path.components().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            self.ignore_names.iter().any(|ignored| *ignored == name)
        })
    }
}

/// Editor swap and backup files
fn is_temp_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with('~')
        || name.starts_with(".#")
        || name.ends_with(".swp")
        || name.ends_with(".swx")
        || name.ends_with(".tmp")
}

/// Default settle delay for `dev`
pub const DEV_SETTLE: Duration = Duration::from_millis(300);

/// Default settle delay for `watch`
pub const WATCH_SETTLE: Duration = Duration::from_millis(2000);

/// Holds changes back until their path has been quiet for `delay`
#[derive(Debug)]
pub struct Settler {
    delay: Duration,
    pending: HashMap<PathBuf, (ChangeKind, Instant)>,
}

impl Settler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    /// Record a change seen at `at`, restarting the path's quiet period.
    ///
    /// - Removed then Created/Modified: the file came back
    /// - Created/Modified then Removed: the file is gone
    /// - otherwise the first kind wins
    pub fn add(&mut self, path: PathBuf, kind: ChangeKind, at: Instant) {
        let kind = match self.pending.get(&path) {
            Some((ChangeKind::Removed, _)) => kind,
            Some((_, _)) if kind == ChangeKind::Removed => ChangeKind::Removed,
            Some((first, _)) => *first,
            None => kind,
        };
        self.pending.insert(path, (kind, at));
    }

    /// Changes whose quiet period has elapsed at `now`, sorted by path
    pub fn take_ready(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let delay = self.delay;
        let mut ready: Vec<ChangeEvent> = self
            .pending
            .iter()
            .filter(|(_, (_, at))| now.saturating_duration_since(*at) >= delay)
            .map(|(path, (kind, _))| ChangeEvent {
                path: path.clone(),
                kind: *kind,
            })
            .collect();
        for change in &ready {
            self.pending.remove(&change.path);
        }
        ready.sort_by(|a, b| a.path.cmp(&b.path));
        ready
    }

    /// Time until the next pending change settles, if any is pending
    pub fn next_wait(&self, now: Instant) -> Option<Duration> {
        self.pending
            .values()
            .map(|(_, at)| self.delay.saturating_sub(now.saturating_duration_since(*at)))
            .min()
    }
}

/// Recursive watch on the content directory
pub struct ContentWatcher {
    _watcher: RecommendedWatcher,
}

impl ContentWatcher {
    /// Start watching `root`, forwarding accepted changes to `tx` once they
    /// have been quiet for `settle`
    pub fn spawn(
        root: &Path,
        filter: ChangeFilter,
        settle: Duration,
        tx: mpsc::Sender<ChangeEvent>,
    ) -> Result<Self> {
        // notify is callback based; hop through a std channel and a thread
        let (notify_tx, notify_rx) = std::sync::mpsc::channel::<notify::Result<notify::Event>>();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        std::thread::spawn(move || {
            let mut settler = Settler::new(settle);
            loop {
                let received = match settler.next_wait(Instant::now()) {
                    Some(wait) => notify_rx.recv_timeout(wait),
                    None => notify_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };

                match received {
                    Ok(Ok(event)) => {
                        if let Some(kind) = change_kind(&event.kind) {
                            let now = Instant::now();
                            for path in event.paths {
                                if filter.accepts(&path) {
                                    settler.add(path, kind, now);
                                }
                            }
                        }
                    }
                    Ok(Err(e)) => tracing::warn!(error = %e, "Watch error"),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => return,
                }

                for change in settler.take_ready(Instant::now()) {
                    if tx.blocking_send(change).is_err() {
                        return;
                    }
                }
            }
        });

        tracing::info!(
            root = %root.display(),
            settle_ms = settle.as_millis() as u64,
            "Watching for changes"
        );
        Ok(Self { _watcher: watcher })
    }
}
