//! End-to-End CLI Tests for PostSync
//!
//! These tests run the binary against temporary notes and site directories
//! and check outputs and file system changes.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct Project {
    _temp: TempDir,
    site: PathBuf,
    notes: PathBuf,
}

impl Project {
    fn posts(&self) -> PathBuf {
        self.site.join("src/content/posts")
    }
}

fn setup_project() -> Project {
    let temp = TempDir::new().unwrap();
    let site = temp.path().join("site");
    let notes = temp.path().join("notes");
    fs::create_dir_all(&site).unwrap();
    fs::create_dir_all(notes.join("assets")).unwrap();

    fs::write(
        notes.join("note.md"),
        "---\ntitle: T\nslug: t\npublished: true\n---\nHello ![pic](assets/pic.png)\n",
    )
    .unwrap();
    fs::write(notes.join("scratch.md"), "just a scratch note").unwrap();
    fs::write(notes.join("assets/pic.png"), b"\x89PNG").unwrap();

    Project {
        _temp: temp,
        site,
        notes,
    }
}

fn postsync_cmd(project: &Project) -> Command {
    let mut cmd = Command::cargo_bin("postsync").unwrap();
    cmd.arg("--path")
        .arg(&project.site)
        .env("CONTENT_DIR", &project.notes)
        .env("POSTS_DIR", "src/content/posts")
        .env_remove("WATCH_INTERVAL_MINUTES")
        .env_remove("RUST_LOG");
    cmd
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

// =============================================================================
// CONFIGURATION ERRORS
// =============================================================================

#[test]
fn test_cli_missing_content_dir_fails() {
    let project = setup_project();

    postsync_cmd(&project)
        .env_remove("CONTENT_DIR")
        .arg("copy")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "CONTENT_DIR environment variable is not set",
        ));
}

#[test]
fn test_cli_watch_requires_interval() {
    let project = setup_project();

    postsync_cmd(&project)
        .arg("watch")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("WATCH_INTERVAL_MINUTES"));
}

#[test]
fn test_cli_invalid_interval_fails() {
    let project = setup_project();

    postsync_cmd(&project)
        .env("WATCH_INTERVAL_MINUTES", "soon")
        .arg("copy")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("positive whole number"));
}

// =============================================================================
// COPY / ASSETS COMMAND TESTS
// =============================================================================

#[test]
fn test_cli_copy_writes_valid_posts_only() {
    let project = setup_project();

    postsync_cmd(&project)
        .arg("copy")
        .assert()
        .success()
        .stdout(predicate::str::contains("Posts written: 1"));

    let post = read(&project.posts().join("t.md"));
    assert!(post.contains("createdAt:"));
    assert!(post.contains("updatedAt:"));
    assert!(project.posts().join(".gitkeep").exists());
    assert!(!project.posts().join("scratch.md").exists());
}

#[test]
fn test_cli_assets_after_copy() {
    let project = setup_project();

    postsync_cmd(&project).arg("copy").assert().success();
    postsync_cmd(&project)
        .arg("assets")
        .assert()
        .success()
        .stdout(predicate::str::contains("Images copied: 1"));

    assert!(project.site.join("public/assets/pic.png").exists());
}

#[test]
fn test_cli_relative_path_reruns_do_not_duplicate_posts() {
    let project = setup_project();
    // Posts live inside the notes tree and the root is given as `.`
    let run = || {
        Command::cargo_bin("postsync")
            .unwrap()
            .current_dir(&project.notes)
            .args(["--path", ".", "copy"])
            .env("CONTENT_DIR", &project.notes)
            .env("POSTS_DIR", "posts")
            .env_remove("WATCH_INTERVAL_MINUTES")
            .env_remove("RUST_LOG")
            .assert()
            .success();
    };

    for _ in 0..3 {
        run();
    }

    let mut entries: Vec<String> = fs::read_dir(project.notes.join("posts"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries, vec![".gitkeep".to_string(), "t.md".to_string()]);
}

#[test]
fn test_cli_copy_twice_keeps_file_identical() {
    let project = setup_project();

    postsync_cmd(&project).arg("copy").assert().success();
    let first = read(&project.posts().join("t.md"));

    postsync_cmd(&project)
        .arg("copy")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unchanged: 1"));
    let second = read(&project.posts().join("t.md"));

    assert_eq!(first, second);
}

// =============================================================================
// SYNC COMMAND TESTS
// =============================================================================

#[test]
fn test_cli_sync_no_publish_json() {
    let project = setup_project();

    let output = postsync_cmd(&project)
        .args(["sync", "--no-publish", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["copy"]["written"], 1);
    assert_eq!(report["copy"]["skipped"], 1);
    assert_eq!(report["assets"]["copied"], 1);
    assert!(report["commit"].is_null());
}

#[test]
fn test_cli_sync_respects_settings_file() {
    let project = setup_project();
    fs::write(
        project.site.join("postsync.toml"),
        "[assets]\npublic_dir = \"static/images\"\n\n[git]\nenabled = false\n",
    )
    .unwrap();

    postsync_cmd(&project)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to publish"));

    assert!(project.site.join("static/images/pic.png").exists());
}

#[test]
fn test_cli_sync_publish_outside_git_fails() {
    let project = setup_project();

    postsync_cmd(&project)
        .arg("sync")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to publish content"));
}

// =============================================================================
// CLEAN COMMAND TESTS
// =============================================================================

#[test]
fn test_cli_clean_keeps_sentinel() {
    let project = setup_project();
    postsync_cmd(&project).arg("copy").assert().success();

    postsync_cmd(&project)
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Clean complete"));

    assert!(project.posts().join(".gitkeep").exists());
    assert!(!project.posts().join("t.md").exists());
}

#[test]
fn test_cli_help_lists_commands() {
    Command::cargo_bin("postsync")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("copy"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("clean"));
}
