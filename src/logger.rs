use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub trait SyncLogger: Send + Sync {
    fn connected(&self, _address: &str) {}
    fn upload_done(&self, _local: &Path, _remote: &str, _bytes: u64) {}
    fn download_done(&self, _remote: &str, _local: &Path, _bytes: u64) {}
    fn skip(&self, _remote: &str) {}
    fn note(&self, _msg: &str) {}
    fn close_failed(&self, _address: &str, _msg: &str) {}
    fn error(&self, _context: &str, _name: &str, _msg: &str) {}
    fn done(&self, _files: u64, _bytes: u64, _seconds: f64) {}
}

pub struct NoopLogger;
impl SyncLogger for NoopLogger {}

/// Prints per-file operations to the console; backs the CLI's verbose
/// mode.
pub struct ConsoleLogger;

impl SyncLogger for ConsoleLogger {
    fn connected(&self, address: &str) {
        println!("Connected to {address}");
    }
    fn upload_done(&self, local: &Path, remote: &str, bytes: u64) {
        println!("  {} -> {} ({} bytes)", local.display(), remote, bytes);
    }
    fn download_done(&self, remote: &str, local: &Path, bytes: u64) {
        println!("  {} -> {} ({} bytes)", remote, local.display(), bytes);
    }
    fn skip(&self, remote: &str) {
        println!("  skipping {remote} (not present locally)");
    }
    fn note(&self, msg: &str) {
        println!("  {msg}");
    }
    fn close_failed(&self, address: &str, msg: &str) {
        eprintln!("warning: closing session to {address} failed: {msg}");
    }
    fn error(&self, context: &str, name: &str, msg: &str) {
        eprintln!("error: {context} {name}: {msg}");
    }
}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl SyncLogger for TextLogger {
    fn connected(&self, address: &str) {
        self.line(&format!("CONNECT host={address}"));
    }
    fn upload_done(&self, local: &Path, remote: &str, bytes: u64) {
        self.line(&format!(
            "PUT src={} dst={} bytes={}",
            local.display(),
            remote,
            bytes
        ));
    }
    fn download_done(&self, remote: &str, local: &Path, bytes: u64) {
        self.line(&format!(
            "GET src={} dst={} bytes={}",
            remote,
            local.display(),
            bytes
        ));
    }
    fn skip(&self, remote: &str) {
        self.line(&format!("SKIP name={remote}"));
    }
    fn note(&self, msg: &str) {
        self.line(&format!("NOTE {msg}"));
    }
    fn close_failed(&self, address: &str, msg: &str) {
        self.line(&format!("CLOSE-FAIL host={address} msg={msg}"));
    }
    fn error(&self, context: &str, name: &str, msg: &str) {
        self.line(&format!("ERROR ctx={context} name={name} msg={msg}"));
    }
    fn done(&self, files: u64, bytes: u64, seconds: f64) {
        self.line(&format!("DONE files={files} bytes={bytes} seconds={seconds:.3}"));
    }
}
