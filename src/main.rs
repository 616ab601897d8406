//! PostSync CLI
//!
//! Command-line interface for syncing notes into a static blog.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use postsync::assets::AssetReport;
use postsync::pipeline::{self, PipelineJob};
use postsync::watcher::{ChangeFilter, ContentWatcher, DEV_SETTLE, WATCH_SETTLE};
use postsync::{Config, CopyReport, SyncOptions, SyncScheduler, Trigger};

#[derive(Parser)]
#[command(name = "postsync")]
#[command(
    author,
    version,
    about = "Sync Markdown notes and their images into a static blog"
)]
#[command(propagate_version = true)]
struct Cli {
    /// Site project root (default: current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Show detailed output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy notes with valid post frontmatter into POSTS_DIR
    Copy,

    /// Copy images referenced by synced posts into the public asset directory
    Assets,

    /// Copy notes and images, then commit and push any changes
    Sync {
        /// Skip the git commit and push
        #[arg(long)]
        no_publish: bool,

        /// Print the sync report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove every synced post, keeping the .gitkeep sentinel
    Clean,

    /// Watch CONTENT_DIR and sync immediately on every change (no git)
    Dev,

    /// Watch CONTENT_DIR, sync after WATCH_INTERVAL_MINUTES of quiet and
    /// periodically afterwards, committing and pushing each time
    Watch,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(error) = run(cli) {
        eprintln!("{} {:#}", "✘".red(), error);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "postsync=debug" } else { "postsync=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let project_root = match cli.path {
        Some(p) => p,
        None => env::current_dir().context("Failed to determine current directory")?,
    };
    let config = Config::from_env(&project_root)?;

    if cli.verbose {
        println!(
            "Content: {}\nPosts:   {}\n",
            config.content_dir.display().to_string().dimmed(),
            config.posts_dir.display().to_string().dimmed()
        );
    }

    match cli.command {
        Commands::Copy => {
            println!("{}", "➤ Copying content".cyan().bold());
            let report = pipeline::copy_content(&config)?;
            print_copy_summary(&report);
        }

        Commands::Assets => {
            println!("{}", "➤ Copying assets".cyan().bold());
            let report = pipeline::relocate_assets(&config)?;
            print_asset_summary(&report);
        }

        Commands::Sync { no_publish, json } => {
            let options = SyncOptions {
                publish: !no_publish,
            };
            let report = pipeline::run_sync(&config, options)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\n{}", "✨ Sync complete!".green().bold());
                print_copy_summary(&report.copy);
                print_asset_summary(&report.assets);
                match &report.commit {
                    Some(message) => println!("  Pushed: {}", message.green()),
                    None => println!("  {}", "Nothing to publish".dimmed()),
                }
            }
        }

        Commands::Clean => {
            let removed = pipeline::clean_posts(&config.posts_dir)?;
            println!("\n{}", "✨ Clean complete!".green().bold());
            println!("  Removed: {} entries", removed.to_string().green());
        }

        Commands::Dev => {
            println!("{}", "➤ Starting development watch".cyan().bold());
            println!("  Files will sync immediately on change");
            watch(config, Trigger::Immediate, SyncOptions { publish: false })?;
        }

        Commands::Watch => {
            let interval = config.watch_interval()?;
            println!("{}", "➤ Starting watch".cyan().bold());
            println!(
                "  Will sync after {} seconds of no changes",
                interval.as_secs()
            );
            watch(
                config,
                Trigger::Debounced(interval),
                SyncOptions { publish: true },
            )?;
        }
    }

    Ok(())
}

fn watch(config: Config, trigger: Trigger, options: SyncOptions) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(watch_until_interrupted(config, trigger, options))
}

async fn watch_until_interrupted(
    config: Config,
    trigger: Trigger,
    options: SyncOptions,
) -> Result<()> {
    let config = Arc::new(config);
    let settle = config.settle_delay(match trigger {
        Trigger::Immediate => DEV_SETTLE,
        Trigger::Debounced(_) => WATCH_SETTLE,
    });
    let (tx, rx) = mpsc::channel(256);
    let watcher = ContentWatcher::spawn(
        &config.content_dir,
        ChangeFilter::from_config(&config),
        settle,
        tx,
    )?;

    let job = PipelineJob::new(Arc::clone(&config), options);
    let scheduler = tokio::spawn(
        SyncScheduler::new(trigger, job)
            .with_initial_sync(true)
            .run(rx),
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    println!("\n{}", "Gracefully shutting down...".yellow());

    // Closing the watcher closes the event channel; the scheduler then
    // finishes any in-flight sync and returns.
    drop(watcher);
    let stats = scheduler.await.context("Scheduler task failed")?;

    println!(
        "  Runs: {}, Failures: {}, Skipped events: {}",
        stats.runs.to_string().green(),
        if stats.failures > 0 {
            stats.failures.to_string().red()
        } else {
            stats.failures.to_string().dimmed()
        },
        stats.skipped.to_string().dimmed()
    );
    Ok(())
}

fn print_copy_summary(report: &CopyReport) {
    println!(
        "  Posts written: {}, Unchanged: {}, Skipped: {}, Errors: {}",
        report.written.to_string().green(),
        report.unchanged.to_string().dimmed(),
        report.skipped.to_string().dimmed(),
        if report.errors > 0 {
            report.errors.to_string().red()
        } else {
            report.errors.to_string().dimmed()
        }
    );
}

fn print_asset_summary(report: &AssetReport) {
    println!(
        "  Images copied: {}, Missing: {}, External: {}, Errors: {}",
        report.copied.to_string().green(),
        if report.missing > 0 {
            report.missing.to_string().yellow()
        } else {
            report.missing.to_string().dimmed()
        },
        report.external.to_string().dimmed(),
        if report.errors > 0 {
            report.errors.to_string().red()
        } else {
            report.errors.to_string().dimmed()
        }
    );
}
