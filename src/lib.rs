//! PostSync - Notes to Blog Content Synchronization
//!
//! A tool for publishing Markdown notes to a static blog. Notes with valid
//! post frontmatter are copied into the site's content collection, the images
//! they reference are relocated into the public asset directory, and a watch
//! mode keeps both in sync and optionally commits the result to git.

pub mod assets;
pub mod config;
pub mod copier;
pub mod frontmatter;
pub mod fs;
pub mod git;
pub mod pipeline;
pub mod post;
pub mod scheduler;
pub mod slug;
pub mod watcher;

pub use config::Config;
pub use copier::{ContentCopier, CopyReport};
pub use pipeline::{SyncOptions, SyncReport};
pub use scheduler::{SyncJob, SyncScheduler, Trigger};
