//! One FTP control-connection lifecycle: connect, login, binary mode,
//! transfers, quit. The controller is a single embedded device with one
//! control channel, so there is exactly one session per sync operation
//! and no pooling.

use std::fs::{self, File};
use std::path::Path;

use suppaftp::types::FileType;
use suppaftp::FtpStream;

use crate::error::SyncError;

/// Fixed credentials: FANUC controllers accept anonymous plain FTP.
const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous";

const DEFAULT_PORT: u16 = 21;

/// One entry of a remote directory listing. Produced fresh by each
/// `list()` call, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Seam over the live session so plan executors can run against a
/// scripted double in tests.
pub trait RemoteSession {
    fn upload_file(&mut self, local: &Path, remote_name: &str) -> Result<u64, SyncError>;
    fn download_file(&mut self, remote_name: &str, local: &Path) -> Result<u64, SyncError>;
    fn list(&mut self) -> Result<Vec<RemoteEntry>, SyncError>;
    fn close(&mut self) -> Result<(), SyncError>;
}

pub struct FtpSession {
    stream: FtpStream,
    address: String,
    closed: bool,
}

impl FtpSession {
    /// Connect, authenticate, and switch to binary mode. A failure at any
    /// of the three steps is a `Connection` error and the caller must not
    /// attempt transfers afterwards.
    pub fn open(address: &str) -> Result<Self, SyncError> {
        let target = if address.contains(':') {
            address.to_string()
        } else {
            format!("{address}:{DEFAULT_PORT}")
        };
        let conn = |source| SyncError::Connection {
            address: address.to_string(),
            source,
        };
        let mut stream = FtpStream::connect(&target).map_err(conn)?;
        stream.login(ANONYMOUS_USER, ANONYMOUS_PASSWORD).map_err(conn)?;
        stream.transfer_type(FileType::Binary).map_err(conn)?;
        Ok(Self {
            stream,
            address: address.to_string(),
            closed: false,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl RemoteSession for FtpSession {
    fn upload_file(&mut self, local: &Path, remote_name: &str) -> Result<u64, SyncError> {
        let mut reader = File::open(local).map_err(|e| SyncError::local(local, e))?;
        self.stream
            .put_file(remote_name, &mut reader)
            .map_err(|source| SyncError::Transfer {
                name: remote_name.to_string(),
                source,
            })
    }

    fn download_file(&mut self, remote_name: &str, local: &Path) -> Result<u64, SyncError> {
        let buffer = self
            .stream
            .retr_as_buffer(remote_name)
            .map_err(|source| SyncError::Transfer {
                name: remote_name.to_string(),
                source,
            })?
            .into_inner();
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::local(parent, e))?;
        }
        fs::write(local, &buffer).map_err(|e| SyncError::local(local, e))?;
        Ok(buffer.len() as u64)
    }

    fn list(&mut self) -> Result<Vec<RemoteEntry>, SyncError> {
        let lines = self
            .stream
            .list(None)
            .map_err(|source| SyncError::Connection {
                address: self.address.clone(),
                source,
            })?;
        Ok(lines.iter().filter_map(|l| parse_list_line(l)).collect())
    }

    fn close(&mut self) -> Result<(), SyncError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.quit().map_err(|source| SyncError::Connection {
            address: self.address.clone(),
            source,
        })
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        // Backstop only; the engine closes explicitly and logs failures.
        if !self.closed {
            let _ = self.stream.quit();
        }
    }
}

/// Parse one line of a Unix-style `LIST` reply:
/// `-rw-r--r-- 1 user group 1234 Jan 01 00:00 PROG.LS`
/// Header lines (`total ...`), dot entries, and anything malformed are
/// dropped rather than treated as files.
pub fn parse_list_line(line: &str) -> Option<RemoteEntry> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("total ") || trimmed.starts_with("Total ") {
        return None;
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.len() < 9 {
        return None;
    }
    let name = parts[8..].join(" ");
    if name == "." || name == ".." {
        return None;
    }
    Some(RemoteEntry {
        name,
        is_dir: parts[0].starts_with('d'),
        size: parts[4].parse().unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_and_directory_lines() {
        let file = parse_list_line("-rw-r--r-- 1 robot robot 2048 Jan 12 09:30 MAIN.LS").unwrap();
        assert_eq!(file.name, "MAIN.LS");
        assert!(!file.is_dir);
        assert_eq!(file.size, 2048);

        let dir = parse_list_line("drwxr-xr-x 2 robot robot 4096 Jan 12 09:30 md").unwrap();
        assert!(dir.is_dir);
        assert_eq!(dir.name, "md");
    }

    #[test]
    fn keeps_spaces_in_names() {
        let entry =
            parse_list_line("-rw-r--r-- 1 robot robot 10 Jan 12 09:30 WELD CELL.LS").unwrap();
        assert_eq!(entry.name, "WELD CELL.LS");
    }

    #[test]
    fn drops_headers_dots_and_noise() {
        assert!(parse_list_line("total 14").is_none());
        assert!(parse_list_line("").is_none());
        assert!(parse_list_line("drwxr-xr-x 2 robot robot 4096 Jan 12 09:30 .").is_none());
        assert!(parse_list_line("drwxr-xr-x 2 robot robot 4096 Jan 12 09:30 ..").is_none());
        assert!(parse_list_line("garbage line").is_none());
    }
}
