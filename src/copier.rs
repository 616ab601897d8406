//! Content copying
//!
//! Walks the notes directory and writes every note whose frontmatter is a
//! valid post into the content collection, keeping slugs and timestamps
//! stable across runs.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::frontmatter::{self, Document};
use crate::fs::{display_relative, dotted_extension, markdown_files};
use crate::post::{Post, SchemaError};
use crate::slug::SlugResolver;

/// Sentinel that keeps the collection directory in version control
pub const SENTINEL_FILE: &str = ".gitkeep";

/// Result of a copy run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug)]
enum Outcome {
    Written(PathBuf),
    Unchanged(PathBuf),
    Skipped(SchemaError),
}

/// Copies notes from the content directory into the posts directory
#[derive(Debug)]
pub struct ContentCopier {
    content_dir: PathBuf,
    posts_dir: PathBuf,
    exclude: Vec<PathBuf>,
}

impl ContentCopier {
    /// Create a copier; the posts directory is never read as input
    pub fn new(content_dir: &Path, posts_dir: &Path) -> Self {
        Self {
            content_dir: content_dir.to_path_buf(),
            posts_dir: posts_dir.to_path_buf(),
            exclude: vec![posts_dir.to_path_buf()],
        }
    }

    /// Create a copier that also skips the public asset directory
    pub fn from_config(config: &Config) -> Self {
        let mut copier = Self::new(&config.content_dir, &config.posts_dir);
        copier.exclude.push(config.public_asset_dir());
        copier
    }

    /// Copy every valid note. Per-file failures are logged and counted.
    pub fn copy_all(&self) -> Result<CopyReport> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.copy_all_at(&now)
    }

    /// Copy every valid note using `now` as the current timestamp
    pub fn copy_all_at(&self, now: &str) -> Result<CopyReport> {
        if !self.content_dir.is_dir() {
            anyhow::bail!(
                "Content directory does not exist: {}",
                self.content_dir.display()
            );
        }

        self.ensure_sentinel()?;

        let files = markdown_files(&self.content_dir, &self.exclude)?;
        let mut resolver = SlugResolver::new(&self.posts_dir);
        let mut report = CopyReport::default();

        for file in &files {
            let shown = display_relative(file, &self.content_dir);
            match self.copy_one(file, &mut resolver, now) {
                Ok(Outcome::Written(target)) => {
                    tracing::info!(source = %shown, target = %target.display(), "Processed note");
                    report.written += 1;
                }
                Ok(Outcome::Unchanged(target)) => {
                    tracing::debug!(source = %shown, target = %target.display(), "Note unchanged");
                    report.unchanged += 1;
                }
                Ok(Outcome::Skipped(reason)) => {
                    tracing::debug!(source = %shown, %reason, "Skipping note");
                    report.skipped += 1;
                }
                Err(e) => {
                    let error = format!("{e:#}");
                    tracing::error!(source = %shown, %error, "Error processing note");
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }

    fn ensure_sentinel(&self) -> Result<()> {
        fs::create_dir_all(&self.posts_dir).with_context(|| {
            format!(
                "Failed to create posts directory: {}",
                self.posts_dir.display()
            )
        })?;

        let sentinel = self.posts_dir.join(SENTINEL_FILE);
        if !sentinel.exists() {
            fs::write(&sentinel, "")
                .with_context(|| format!("Failed to write {}", sentinel.display()))?;
        }
        Ok(())
    }

    fn copy_one(&self, file: &Path, resolver: &mut SlugResolver, now: &str) -> Result<Outcome> {
        let text = fs::read_to_string(file)
            .with_context(|| format!("Failed to read note: {}", file.display()))?;
        let source = Document::parse(&text)
            .with_context(|| format!("Failed to parse frontmatter: {}", file.display()))?;

        let post = match Post::safe_parse(&source.data) {
            Ok(post) => post,
            Err(reason) => return Ok(Outcome::Skipped(reason)),
        };

        let extension = dotted_extension(file)
            .with_context(|| format!("Note has no extension: {}", file.display()))?;
        let slug = resolver.resolve(&post.slug, &extension);
        let target = resolver.target_path(&slug, &extension);

        let existing_text = if target.exists() {
            Some(
                fs::read_to_string(&target)
                    .with_context(|| format!("Failed to read post: {}", target.display()))?,
            )
        } else {
            None
        };
        let existing = existing_text
            .as_deref()
            .map(Document::parse)
            .transpose()
            .with_context(|| format!("Failed to parse existing post: {}", target.display()))?;

        let merged = frontmatter::merge(&source, existing.as_ref(), &slug, now);
        let rendered = merged
            .render()
            .with_context(|| format!("Failed to serialize post: {}", target.display()))?;

        if existing_text.as_deref() == Some(rendered.as_str()) {
            return Ok(Outcome::Unchanged(target));
        }

        fs::write(&target, rendered)
            .with_context(|| format!("Failed to write post: {}", target.display()))?;

        Ok(Outcome::Written(target))
    }
}
