//! Git auto-publish
//!
//! Stages, commits and pushes the site repository after a sync, but only
//! when `git status --porcelain` reports something to commit.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run `git {args}`: {source}")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`git {args}` failed: {stderr}")]
    Failed { args: String, stderr: String },
}

/// What a publish attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    NoChanges,
    Pushed { message: String },
}

/// Commit message for a sync at the given local time
pub fn commit_message(at: DateTime<Local>) -> String {
    format!("Content sync: {}", at.format("%Y-%m-%d @ %I:%M %p"))
}

/// Runs git in the site repository
#[derive(Debug)]
pub struct Publisher {
    repo: PathBuf,
    remote: Option<String>,
}

impl Publisher {
    pub fn new(repo: &Path, remote: Option<String>) -> Self {
        Self {
            repo: repo.to_path_buf(),
            remote,
        }
    }

    /// Whether the working tree has anything to commit
    pub fn has_changes(&self) -> Result<bool, GitError> {
        let status = self.git(&["status", "--porcelain"])?;
        Ok(!status.trim().is_empty())
    }

    /// Stage everything, commit with `message`, and push
    pub fn commit_and_push(&self, message: &str) -> Result<(), GitError> {
        self.git(&["add", "."])?;
        self.git(&["commit", "-m", message])?;
        match &self.remote {
            Some(remote) => self.git(&["push", remote, "HEAD"])?,
            None => self.git(&["push"])?,
        };
        Ok(())
    }

    /// Commit and push if there are changes
    pub fn publish(&self) -> Result<PublishOutcome, GitError> {
        if !self.has_changes()? {
            tracing::info!("No changes detected");
            return Ok(PublishOutcome::NoChanges);
        }

        let message = commit_message(Local::now());
        tracing::info!(%message, "Changes detected, committing and pushing");
        self.commit_and_push(&message)?;
        tracing::info!("Successfully committed and pushed changes");

        Ok(PublishOutcome::Pushed { message })
    }

    fn git(&self, args: &[&str]) -> Result<String, GitError> {
        let joined = args.join(" ");
        tracing::debug!(args = %joined, repo = %self.repo.display(), "Running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .output()
            .map_err(|source| GitError::Spawn {
                args: joined.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(GitError::Failed {
                args: joined,
                stderr,
            })
        }
    }
}
