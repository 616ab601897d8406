//! Configuration for postsync
//!
//! The three required settings come from the environment (`CONTENT_DIR`,
//! `POSTS_DIR`, `WATCH_INTERVAL_MINUTES`). Everything else has defaults that
//! can be overridden by an optional `postsync.toml` in the project root.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Optional configuration file name, looked up in the project root
pub const CONFIG_FILE_NAME: &str = "postsync.toml";

/// Source notes root
pub const CONTENT_DIR_VAR: &str = "CONTENT_DIR";

/// Destination content collection root
pub const POSTS_DIR_VAR: &str = "POSTS_DIR";

/// Debounce and periodic sync interval for `watch`
pub const WATCH_INTERVAL_VAR: &str = "WATCH_INTERVAL_MINUTES";

/// Upper bound for the interval: one year
const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingVar(&'static str),
    #[error("{var} must be a positive whole number of minutes (at most one year), got {value:?}")]
    InvalidInterval { var: &'static str, value: String },
}

/// Settings read from `postsync.toml`
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub git: GitConfig,
}

/// Where images are looked up and where they are copied to
#[derive(Debug, Deserialize)]
pub struct AssetsConfig {
    /// Image root, relative to the content directory
    #[serde(default = "default_asset_source_dir")]
    pub source_dir: String,

    /// Public asset directory, relative to the project root
    #[serde(default = "default_public_dir")]
    pub public_dir: String,
}

fn default_asset_source_dir() -> String {
    "assets".to_string()
}

fn default_public_dir() -> String {
    "public/assets".to_string()
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            source_dir: default_asset_source_dir(),
            public_dir: default_public_dir(),
        }
    }
}

/// Watcher configuration
#[derive(Debug, Deserialize)]
pub struct WatchConfig {
    /// Path components that never trigger a sync
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Quiet period a changed file needs before it counts, in milliseconds.
    /// Unset means the command's own default.
    #[serde(default)]
    pub settle_ms: Option<u64>,
}

fn default_ignore() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        ".git".to_string(),
        "dist".to_string(),
    ]
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ignore: default_ignore(),
            settle_ms: None,
        }
    }
}

/// Auto-publish configuration
#[derive(Debug, Deserialize)]
pub struct GitConfig {
    /// Whether `sync` and `watch` commit and push
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Remote to push to; plain `git push` when unset
    #[serde(default)]
    pub remote: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remote: None,
        }
    }
}

/// Resolved runtime configuration
#[derive(Debug)]
pub struct Config {
    /// Site repository root; relative paths resolve against it
    pub project_root: PathBuf,
    /// Source notes root (`CONTENT_DIR`)
    pub content_dir: PathBuf,
    /// Destination collection root (`POSTS_DIR`)
    pub posts_dir: PathBuf,
    /// Parsed `WATCH_INTERVAL_MINUTES`, if set
    pub watch_interval: Option<Duration>,
    pub settings: Settings,
}

impl Config {
    /// Build the configuration from the process environment
    pub fn from_env(project_root: &Path) -> Result<Self> {
        Self::from_lookup(project_root, |key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(project_root: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content_dir = lookup(CONTENT_DIR_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar(CONTENT_DIR_VAR))?;
        let posts_dir = lookup(POSTS_DIR_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar(POSTS_DIR_VAR))?;
        let watch_interval = lookup(WATCH_INTERVAL_VAR)
            .map(|raw| parse_interval(&raw))
            .transpose()?;

        // Walk and watch paths are compared against these, so all of them
        // must be absolute even when the root was given as `.`
        let project_root = std::path::absolute(project_root).with_context(|| {
            format!("Failed to resolve project root: {}", project_root.display())
        })?;
        let settings = Self::load_settings(&project_root)?;

        Ok(Self {
            content_dir: resolve_path(&project_root, &content_dir),
            posts_dir: resolve_path(&project_root, &posts_dir),
            project_root,
            watch_interval,
            settings,
        })
    }

    /// Load `postsync.toml` from the project root, falling back to defaults
    pub fn load_settings(project_root: &Path) -> Result<Settings> {
        let path = project_root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Interval used by the debounced scheduler; required only by `watch`
    pub fn watch_interval(&self) -> Result<Duration, ConfigError> {
        self.watch_interval
            .ok_or(ConfigError::MissingVar(WATCH_INTERVAL_VAR))
    }

    /// Directory image references are resolved against
    pub fn asset_source_dir(&self) -> PathBuf {
        self.content_dir.join(&self.settings.assets.source_dir)
    }

    /// Directory images are copied into
    pub fn public_asset_dir(&self) -> PathBuf {
        resolve_path(&self.project_root, &self.settings.assets.public_dir)
    }

    /// Watcher settle delay, `default` unless `[watch] settle_ms` is set
    pub fn settle_delay(&self, default: Duration) -> Duration {
        self.settings
            .watch
            .settle_ms
            .map(Duration::from_millis)
            .unwrap_or(default)
    }
}

/// Expand a leading `~`, anchor relative paths at `base`, and drop `.`
/// components
pub fn resolve_path(base: &Path, raw: &str) -> PathBuf {
    let expanded = shellexpand::tilde(raw.trim());
    let path = base.join(&*expanded);
    std::path::absolute(&path).unwrap_or(path)
}

fn parse_interval(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidInterval {
        var: WATCH_INTERVAL_VAR,
        value: raw.to_string(),
    };
    let minutes: u64 = raw.trim().parse().map_err(|_| invalid())?;
    if minutes == 0 || minutes > MAX_INTERVAL_MINUTES {
        return Err(invalid());
    }
    Ok(Duration::from_secs(minutes * 60))
}
