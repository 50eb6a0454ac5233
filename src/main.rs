//! tpsync - sync FANUC teach-pendant programs (.LS) with a robot
//! controller over anonymous FTP.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;

use tpsync::address::resolve_address;
use tpsync::engine::{self, SyncSummary};
use tpsync::interact::{ConsoleInteract, Interact};
use tpsync::logger::{ConsoleLogger, NoopLogger, SyncLogger, TextLogger};
use tpsync::plan::{self, LS_SUFFIX};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tpsync - push/pull FANUC .LS programs over the controller's FTP server"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Suggested controller address when no ip.txt hint exists yet
    #[arg(long, default_value = "192.168.10.124")]
    default_address: String,

    /// Write timestamped log entries to file
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Show the resolved address, the upload plan and per-file operations
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a .LS file, or every .LS file of a directory
    Upload {
        /// Local file or directory
        path: PathBuf,
    },
    /// Download every remote file into a fresh dated folder
    DownloadAll {
        /// Destination root (prompted for when omitted)
        dest: Option<PathBuf>,
    },
    /// Download remote files matching a suffix into a fresh dated folder
    Download {
        /// Destination root (prompted for when omitted)
        dest: Option<PathBuf>,
        /// Remote name suffix to keep
        #[arg(long, default_value = LS_SUFFIX)]
        suffix: String,
        /// Tag embedded in the folder name
        #[arg(long, default_value = "LS")]
        tag: String,
    },
    /// Refresh local copies of files that already exist in a folder
    Update {
        /// Folder holding the files to refresh
        dest: PathBuf,
        /// Remote name suffix to consider
        #[arg(long, default_value = LS_SUFFIX)]
        suffix: String,
    },
    /// Re-fetch the one remote file named after a local selection
    Get {
        /// Local file whose base name is fetched from the controller
        file: PathBuf,
        /// Suffix used for the empty-listing diagnostic
        #[arg(long, default_value = LS_SUFFIX)]
        suffix: String,
    },
}

fn main() -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        std::process::exit(130);
    })
    .expect("Error setting Ctrl-C handler");

    let args = Args::parse();

    let logger: Arc<dyn SyncLogger> = if let Some(ref p) = args.log_file {
        match TextLogger::new(p) {
            Ok(l) => Arc::new(l),
            Err(_) => Arc::new(NoopLogger),
        }
    } else if args.verbose {
        Arc::new(ConsoleLogger)
    } else {
        Arc::new(NoopLogger)
    };

    let mut ui = ConsoleInteract;

    // Simple activity spinner unless the per-file output is wanted
    let spinner = if args.verbose {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };
    let progress = spinner.as_ref();

    match &args.command {
        Command::Upload { path } => {
            let is_dir = path
                .metadata()
                .with_context(|| format!("cannot read {}", path.display()))?
                .is_dir();
            let hint_dir = if is_dir {
                path.clone()
            } else {
                path.parent().map(Path::to_path_buf).unwrap_or_default()
            };
            let address = resolve(&hint_dir, &args, &mut ui)?;
            if args.verbose {
                println!("Uploading {} to {}", path.display(), address);
                let plan = plan::plan_upload(path, is_dir)?;
                println!("Plan: {} file(s)", plan.len());
                for item in &plan.items {
                    println!("  {} -> {}", item.local.display(), item.remote);
                }
            }
            let summary = engine::upload_path(&address, path, is_dir, &*logger, progress)?;
            report_upload(&summary, &address, spinner);
        }
        Command::DownloadAll { dest } => {
            let dest = require_dest(dest.clone(), &mut ui)?;
            let address = resolve(&dest, &args, &mut ui)?;
            if args.verbose {
                println!("Downloading everything from {} into {}", address, dest.display());
            }
            let summary = engine::download_all(&address, &dest, &*logger, progress)?;
            report_download(&summary, spinner);
        }
        Command::Download { dest, suffix, tag } => {
            let dest = require_dest(dest.clone(), &mut ui)?;
            let address = resolve(&dest, &args, &mut ui)?;
            if args.verbose {
                println!(
                    "Downloading *{} from {} into {}",
                    suffix,
                    address,
                    dest.display()
                );
            }
            let summary =
                engine::download_filtered(&address, &dest, suffix, tag, &*logger, progress)?;
            report_download(&summary, spinner);
        }
        Command::Update { dest, suffix } => {
            let address = resolve(dest, &args, &mut ui)?;
            if args.verbose {
                println!("Refreshing *{} already present in {}", suffix, dest.display());
            }
            let summary = engine::sync_existing(&address, dest, suffix, &*logger, progress)?;
            report_download(&summary, spinner);
        }
        Command::Get { file, suffix } => {
            let dest_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
            let address = resolve(&dest_dir, &args, &mut ui)?;
            let summary = engine::download_one(&address, file, &dest_dir, suffix, &*logger)?;
            report_download(&summary, spinner);
        }
    }

    Ok(())
}

fn resolve(hint_dir: &Path, args: &Args, ui: &mut ConsoleInteract) -> Result<String> {
    let address = resolve_address(hint_dir, &args.default_address, &[], ui)?;
    if args.verbose {
        println!("Controller address: {address}");
    }
    Ok(address)
}

fn require_dest(dest: Option<PathBuf>, ui: &mut ConsoleInteract) -> Result<PathBuf> {
    if let Some(d) = dest {
        return Ok(d);
    }
    ui.choose_folder("Destination folder")?
        .context("a destination folder is required")
}

fn report_upload(summary: &SyncSummary, address: &str, spinner: Option<ProgressBar>) {
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    println!(
        "Uploaded {} file(s) ({} bytes) to {} in {:.2}s",
        summary.files, summary.bytes, address, summary.seconds
    );
}

fn report_download(summary: &SyncSummary, spinner: Option<ProgressBar>) {
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let dest = summary
        .dest
        .as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| ".".to_string());
    if summary.skipped > 0 {
        println!(
            "Saved {} file(s) ({} bytes) to {} in {:.2}s; skipped {} not present locally",
            summary.files, summary.bytes, dest, summary.seconds, summary.skipped
        );
    } else {
        println!(
            "Saved {} file(s) ({} bytes) to {} in {:.2}s",
            summary.files, summary.bytes, dest, summary.seconds
        );
    }
}
