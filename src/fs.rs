//! File system utilities.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions treated as Markdown notes
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "mdx"];

/// Whether a path has a Markdown extension
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.contains(&ext))
}

/// Extension of a Markdown file including the leading dot (`.md`, `.mdx`)
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
}

/// Recursively collect Markdown files under `root`, sorted by path.
///
/// Directories listed in `exclude` are not descended into, so a destination
/// that lives inside the source tree is never read back as input. Excluded
/// directories match by their resolved location, however they are spelled.
pub fn markdown_files(root: &Path, exclude: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let resolved: Vec<PathBuf> = exclude
        .iter()
        .filter_map(|dir| fs::canonicalize(dir).ok())
        .collect();

    let is_excluded = |entry: &walkdir::DirEntry| {
        if !entry.file_type().is_dir() {
            return false;
        }
        exclude.iter().any(|dir| entry.path() == dir.as_path())
            || fs::canonicalize(entry.path()).is_ok_and(|path| resolved.contains(&path))
    };

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry));

    for entry in walker {
        let entry =
            entry.with_context(|| format!("Failed to walk directory: {}", root.display()))?;
        if entry.file_type().is_file() && is_markdown(entry.path()) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Copy a file, creating the destination's parent directories
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::copy(src, dst).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            src.display(),
            dst.display()
        )
    })?;
    Ok(())
}

/// Path relative to `base` for log output, or the full path if unrelated
pub fn display_relative(path: &Path, base: &Path) -> String {
    match pathdiff::diff_paths(path, base) {
        Some(rel) if !rel.starts_with("..") => rel.display().to_string(),
        _ => path.display().to_string(),
    }
}
