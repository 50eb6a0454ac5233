//! Sync operations. Each one resolves to: open a session, drive it
//! through a plan, and tear the session down on every exit path. The
//! session close is scoped here so no caller can forget it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use indicatif::ProgressBar;

use crate::error::SyncError;
use crate::logger::SyncLogger;
use crate::plan::{self, TransferPlan};
use crate::session::{FtpSession, RemoteSession};

/// Outcome of one sync operation.
#[derive(Debug, Default, Clone)]
pub struct SyncSummary {
    pub files: u64,
    pub bytes: u64,
    pub skipped: u64,
    pub dest: Option<PathBuf>,
    pub seconds: f64,
}

impl SyncSummary {
    fn add(&mut self, bytes: u64) {
        self.files += 1;
        self.bytes += bytes;
    }
}

/// Run `f` against the session and close it afterwards no matter how `f`
/// exits. Close failures are logged, never propagated, so they cannot
/// mask a transfer error.
pub fn with_session<S, R>(
    mut session: S,
    address: &str,
    logger: &dyn SyncLogger,
    f: impl FnOnce(&mut S) -> Result<R, SyncError>,
) -> Result<R, SyncError>
where
    S: RemoteSession,
{
    let result = f(&mut session);
    if let Err(e) = session.close() {
        logger.close_failed(address, &e.to_string());
    }
    result
}

/// Drive the session through an upload plan, strictly in order. The first
/// failed transfer aborts the remainder of the plan; completed uploads
/// stay applied.
pub fn run_upload(
    session: &mut dyn RemoteSession,
    plan: &TransferPlan,
    logger: &dyn SyncLogger,
    progress: Option<&ProgressBar>,
) -> Result<SyncSummary, SyncError> {
    let mut summary = SyncSummary::default();
    for item in &plan.items {
        if let Some(pb) = progress {
            pb.set_message(item.remote.clone());
        }
        let bytes = session.upload_file(&item.local, &item.remote).map_err(|e| {
            logger.error("upload", &item.remote, &e.to_string());
            e
        })?;
        logger.upload_done(&item.local, &item.remote, bytes);
        summary.add(bytes);
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }
    Ok(summary)
}

/// Download counterpart of `run_upload`; same ordering and abort
/// semantics.
pub fn run_download(
    session: &mut dyn RemoteSession,
    plan: &TransferPlan,
    logger: &dyn SyncLogger,
    progress: Option<&ProgressBar>,
) -> Result<SyncSummary, SyncError> {
    let mut summary = SyncSummary::default();
    for item in &plan.items {
        if let Some(pb) = progress {
            pb.set_message(item.remote.clone());
        }
        let bytes = session.download_file(&item.remote, &item.local).map_err(|e| {
            logger.error("download", &item.remote, &e.to_string());
            e
        })?;
        logger.download_done(&item.remote, &item.local, bytes);
        summary.add(bytes);
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }
    Ok(summary)
}

fn open(address: &str, logger: &dyn SyncLogger) -> Result<FtpSession, SyncError> {
    let session = FtpSession::open(address)?;
    logger.connected(address);
    Ok(session)
}

fn finish(mut summary: SyncSummary, start: Instant, logger: &dyn SyncLogger) -> SyncSummary {
    summary.seconds = start.elapsed().as_secs_f64();
    logger.done(summary.files, summary.bytes, summary.seconds);
    summary
}

/// Upload a single `.LS` file or every `.LS` file of a directory (flat,
/// non-recursive) to the controller's working directory.
pub fn upload_path(
    address: &str,
    local: &Path,
    is_dir: bool,
    logger: &dyn SyncLogger,
    progress: Option<&ProgressBar>,
) -> Result<SyncSummary, SyncError> {
    let start = Instant::now();
    let plan = plan::plan_upload(local, is_dir)?;
    let session = open(address, logger)?;
    let summary = with_session(session, address, logger, |s| {
        run_upload(s, &plan, logger, progress)
    })?;
    Ok(finish(summary, start, logger))
}

/// Download every remote file into a fresh date-stamped `ALL` folder.
pub fn download_all(
    address: &str,
    dest_root: &Path,
    logger: &dyn SyncLogger,
    progress: Option<&ProgressBar>,
) -> Result<SyncSummary, SyncError> {
    download_bulk(address, dest_root, None, "ALL", logger, progress)
}

/// Download remote files matching `suffix` into a fresh date-stamped
/// folder named with `tag`.
pub fn download_filtered(
    address: &str,
    dest_root: &Path,
    suffix: &str,
    tag: &str,
    logger: &dyn SyncLogger,
    progress: Option<&ProgressBar>,
) -> Result<SyncSummary, SyncError> {
    download_bulk(address, dest_root, Some(suffix), tag, logger, progress)
}

fn download_bulk(
    address: &str,
    dest_root: &Path,
    suffix: Option<&str>,
    tag: &str,
    logger: &dyn SyncLogger,
    progress: Option<&ProgressBar>,
) -> Result<SyncSummary, SyncError> {
    let start = Instant::now();
    let session = open(address, logger)?;
    let summary = with_session(session, address, logger, |s| {
        let entries = s.list()?;
        let files = plan::select_remote(&entries, suffix);
        // The folder is created before any download begins; one fresh
        // folder per invocation, even within the same day.
        let dest = plan::dated_folder(dest_root, Local::now().date_naive(), tag)?;
        let plan = plan::plan_download(&files, &dest);
        let mut summary = run_download(s, &plan, logger, progress)?;
        summary.dest = Some(dest);
        Ok(summary)
    })?;
    Ok(finish(summary, start, logger))
}

/// Update-existing policy: refresh files already present in `dest`,
/// skip remote files with no local counterpart. Skips are logged and
/// counted, never errors.
pub fn sync_existing(
    address: &str,
    dest: &Path,
    suffix: &str,
    logger: &dyn SyncLogger,
    progress: Option<&ProgressBar>,
) -> Result<SyncSummary, SyncError> {
    let start = Instant::now();
    let session = open(address, logger)?;
    let summary = with_session(session, address, logger, |s| {
        let entries = s.list()?;
        let (plan, skipped) = plan::plan_update_existing(&entries, suffix, dest)?;
        for name in &skipped {
            logger.skip(name);
        }
        let mut summary = run_download(s, &plan, logger, progress)?;
        summary.skipped = skipped.len() as u64;
        summary.dest = Some(dest.to_path_buf());
        Ok(summary)
    })?;
    Ok(finish(summary, start, logger))
}

/// Fetch exactly one remote file into `dest_dir` under `name`. The
/// remote listing is consulted for empty-result diagnostics only; the
/// target name is never taken from it.
pub fn run_single(
    session: &mut dyn RemoteSession,
    name: &str,
    dest_dir: &Path,
    suffix: &str,
    logger: &dyn SyncLogger,
) -> Result<SyncSummary, SyncError> {
    let entries = session.list()?;
    if plan::select_remote(&entries, Some(suffix)).is_empty() {
        logger.note(&format!("no {suffix} files in the remote listing"));
    }
    let local = dest_dir.join(name);
    let bytes = session.download_file(name, &local).map_err(|e| {
        logger.error("download", name, &e.to_string());
        e
    })?;
    logger.download_done(name, &local, bytes);
    let mut summary = SyncSummary::default();
    summary.add(bytes);
    summary.dest = Some(dest_dir.to_path_buf());
    Ok(summary)
}

/// Re-fetch the one remote file named after the local selection.
pub fn download_one(
    address: &str,
    selection: &Path,
    dest_dir: &Path,
    suffix: &str,
    logger: &dyn SyncLogger,
) -> Result<SyncSummary, SyncError> {
    let start = Instant::now();
    let name = selection
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            SyncError::InvalidSelection(format!("{} has no file name", selection.display()))
        })?;
    let session = open(address, logger)?;
    let summary = with_session(session, address, logger, |s| {
        run_single(s, &name, dest_dir, suffix, logger)
    })?;
    Ok(finish(summary, start, logger))
}
