//! Image relocation
//!
//! Scans synced posts for Markdown image references and copies the images
//! they point at from the notes' asset directory into the site's public
//! asset directory, keeping the directory structure below `assets/`.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use crate::config::Config;
use crate::fs::{copy_file, markdown_files};

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap());

const ASSETS_PREFIX: &str = "assets/";

/// Result of a relocation run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AssetReport {
    pub copied: usize,
    pub missing: usize,
    pub external: usize,
    pub errors: usize,
}

/// How an image reference is handled
#[derive(Debug, PartialEq, Eq)]
pub enum ImageRef {
    /// `http://` or `https://`, left untouched
    External,
    /// Path below both the source and public asset roots
    Local(PathBuf),
    /// Escapes the asset root or is otherwise unusable
    Invalid,
}

/// Extract the raw targets of every `![alt](target)` in a Markdown body
pub fn image_targets(markdown: &str) -> Vec<&str> {
    IMAGE_RE
        .captures_iter(markdown)
        .filter_map(|caps| caps.get(2))
        .map(|m| m.as_str())
        .collect()
}

/// Classify and normalize an image target.
///
/// A trailing `"title"`, a leading `/` or `./`, and one leading `assets/`
/// segment are removed and percent-escapes decoded, so `/assets/img/a.png`
/// and `img/a.png` both name `img/a.png` below each asset root.
pub fn classify(target: &str) -> ImageRef {
    let target = target.trim();
    if target.starts_with("http://") || target.starts_with("https://") {
        return ImageRef::External;
    }

    let path = target.split_whitespace().next().unwrap_or_default();
    let path = path
        .strip_prefix('<')
        .and_then(|p| p.strip_suffix('>'))
        .unwrap_or(path);
    let Ok(decoded) = urlencoding::decode(path) else {
        return ImageRef::Invalid;
    };

    let mut rel = decoded.as_ref();
    rel = rel.strip_prefix('/').unwrap_or(rel);
    rel = rel.strip_prefix("./").unwrap_or(rel);
    rel = rel.strip_prefix(ASSETS_PREFIX).unwrap_or(rel);

    let rel = Path::new(rel);
    let only_normal = rel.components().all(|c| matches!(c, Component::Normal(_)));
    if rel.as_os_str().is_empty() || !only_normal {
        return ImageRef::Invalid;
    }

    ImageRef::Local(rel.to_path_buf())
}

/// Copies images referenced by posts into the public asset directory
#[derive(Debug)]
pub struct AssetRelocator {
    source_root: PathBuf,
    public_dir: PathBuf,
}

impl AssetRelocator {
    pub fn new(source_root: &Path, public_dir: &Path) -> Self {
        Self {
            source_root: source_root.to_path_buf(),
            public_dir: public_dir.to_path_buf(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.asset_source_dir(), &config.public_asset_dir())
    }

    /// Relocate images for every Markdown file under `posts_dir`
    pub fn relocate_all(&self, posts_dir: &Path) -> Result<AssetReport> {
        fs::create_dir_all(&self.public_dir).with_context(|| {
            format!(
                "Failed to create public asset directory: {}",
                self.public_dir.display()
            )
        })?;

        let mut report = AssetReport::default();
        for file in markdown_files(posts_dir, &[])? {
            match fs::read_to_string(&file) {
                Ok(markdown) => self.relocate_in(&file, &markdown, &mut report),
                Err(e) => {
                    tracing::error!(file = %file.display(), error = %e, "Failed to read post");
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }

    fn relocate_in(&self, file: &Path, markdown: &str, report: &mut AssetReport) {
        let targets = image_targets(markdown);
        if targets.is_empty() {
            return;
        }
        tracing::debug!(file = %file.display(), images = targets.len(), "Processing images");

        for target in targets {
            let rel = match classify(target) {
                ImageRef::External => {
                    report.external += 1;
                    continue;
                }
                ImageRef::Invalid => {
                    tracing::warn!(file = %file.display(), image = target, "Ignoring unusable image path");
                    report.missing += 1;
                    continue;
                }
                ImageRef::Local(rel) => rel,
            };

            let source = self.source_root.join(&rel);
            if !source.is_file() {
                tracing::warn!(image = target, path = %source.display(), "Image not found");
                report.missing += 1;
                continue;
            }

            let dest = self.public_dir.join(&rel);
            match copy_file(&source, &dest) {
                Ok(()) => {
                    tracing::info!(image = target, dest = %dest.display(), "Copied image");
                    report.copied += 1;
                }
                Err(e) => {
                    let error = format!("{e:#}");
                    tracing::error!(image = target, %error, "Failed to copy image");
                    report.errors += 1;
                }
            }
        }
    }
}
