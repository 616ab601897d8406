//! Sync pipeline
//!
//! Ties the stages together: copy notes, relocate their images, and
//! optionally publish the result with git. Also hosts the `clean` step.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::assets::{AssetRelocator, AssetReport};
use crate::config::Config;
use crate::copier::{ContentCopier, CopyReport, SENTINEL_FILE};
use crate::git::{PublishOutcome, Publisher};
use crate::scheduler::SyncJob;

/// Options for a full sync
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncOptions {
    /// Commit and push when the working tree changed
    pub publish: bool,
}

/// Result of a full sync
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub copy: CopyReport,
    pub assets: AssetReport,
    /// Commit message, when a commit was pushed
    pub commit: Option<String>,
}

/// Copy notes into the posts directory
pub fn copy_content(config: &Config) -> Result<CopyReport> {
    tracing::info!(from = %config.content_dir.display(), to = %config.posts_dir.display(), "Running content copy");
    ContentCopier::from_config(config).copy_all()
}

/// Copy images referenced by synced posts into the public asset directory
pub fn relocate_assets(config: &Config) -> Result<AssetReport> {
    tracing::info!(to = %config.public_asset_dir().display(), "Running asset copy");
    AssetRelocator::from_config(config).relocate_all(&config.posts_dir)
}

/// Copy, relocate, and optionally publish
pub fn run_sync(config: &Config, options: SyncOptions) -> Result<SyncReport> {
    let copy = copy_content(config)?;
    let assets = relocate_assets(config)?;

    let commit = if options.publish && config.settings.git.enabled {
        let publisher = Publisher::new(&config.project_root, config.settings.git.remote.clone());
        match publisher.publish().context("Failed to publish content")? {
            PublishOutcome::Pushed { message } => Some(message),
            PublishOutcome::NoChanges => None,
        }
    } else {
        None
    };

    Ok(SyncReport {
        copy,
        assets,
        commit,
    })
}

/// Scheduler job running the full pipeline
#[derive(Debug)]
pub struct PipelineJob {
    config: Arc<Config>,
    options: SyncOptions,
}

impl PipelineJob {
    pub fn new(config: Arc<Config>, options: SyncOptions) -> Self {
        Self { config, options }
    }
}

impl SyncJob for PipelineJob {
    fn run(&self) -> Result<()> {
        let report = run_sync(&self.config, self.options)?;
        tracing::info!(
            written = report.copy.written,
            unchanged = report.copy.unchanged,
            skipped = report.copy.skipped,
            errors = report.copy.errors + report.assets.errors,
            images = report.assets.copied,
            "Content sync complete"
        );
        Ok(())
    }
}

/// Remove everything in the posts directory except the sentinel.
/// Returns the number of removed entries.
pub fn clean_posts(posts_dir: &Path) -> Result<usize> {
    if !posts_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(posts_dir)
        .with_context(|| format!("Failed to read posts directory: {}", posts_dir.display()))?
    {
        let entry = entry?;
        if entry.file_name() == SENTINEL_FILE {
            continue;
        }

        let path = entry.path();
        let result = if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.with_context(|| format!("Failed to remove {}", path.display()))?;
        removed += 1;
    }

    tracing::info!(removed, dir = %posts_dir.display(), "Cleaned posts directory");
    Ok(removed)
}
