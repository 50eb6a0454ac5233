use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use suppaftp::FtpError;

/// Errors surfaced by the sync engine. Every operation ends with either a
/// single summary or a single one of these; nothing is swallowed except
/// session-close failures, which are logged only.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No controller address could be established (user cancelled or
    /// provided nothing). No connection is attempted after this.
    #[error("a controller address is required")]
    AddressRequired,

    /// Session open failed: host unreachable, login rejected, or the
    /// binary-mode switch refused. No files were transferred.
    #[error("connection to {address} failed: {source}")]
    Connection {
        address: String,
        #[source]
        source: FtpError,
    },

    /// An individual file transfer failed. Earlier entries of the plan
    /// remain applied; later entries are never attempted.
    #[error("transfer of {name} failed: {source}")]
    Transfer {
        name: String,
        #[source]
        source: FtpError,
    },

    /// Local listing, folder creation, or hint-record read/write failed.
    #[error("local I/O error at {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The selected local path cannot be used for the requested operation.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// An interactive prompt failed at the terminal level (distinct from
    /// the user cancelling, which maps to `AddressRequired`).
    #[error("interactive prompt failed")]
    Prompt(#[source] io::Error),
}

impl SyncError {
    pub fn local(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SyncError::LocalIo {
            path: path.into(),
            source,
        }
    }
}
