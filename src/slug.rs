//! Output slug resolution
//!
//! There is no source-to-slug index: a destination file named after a
//! document's declared slug is assumed to belong to that document. Only
//! documents written earlier in the same run count as collisions.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Tracks destination paths claimed during one copy run
#[derive(Debug)]
pub struct SlugResolver {
    posts_dir: PathBuf,
    claimed: HashSet<PathBuf>,
}

impl SlugResolver {
    pub fn new(posts_dir: &Path) -> Self {
        Self {
            posts_dir: posts_dir.to_path_buf(),
            claimed: HashSet::new(),
        }
    }

    /// Destination path for a slug and extension (extension includes the dot)
    pub fn target_path(&self, slug: &str, extension: &str) -> PathBuf {
        self.posts_dir.join(format!("{slug}{extension}"))
    }

    /// Pick `base`, or `base-1`, `base-2`, ... if an earlier document of this
    /// run already took it, and claim the result.
    pub fn resolve(&mut self, base: &str, extension: &str) -> String {
        let mut slug = base.to_string();
        let mut counter = 1;

        while self.claimed.contains(&self.target_path(&slug, extension)) {
            slug = format!("{base}-{counter}");
            counter += 1;
        }

        self.claimed.insert(self.target_path(&slug, extension));
        slug
    }
}
