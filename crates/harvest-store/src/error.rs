//! Error types for dataset persistence.
//!
//! Every variant carries the path of the file involved so a failed run
//! reports which of the canonical, staging, temporary or marker files was
//! at fault.

use std::io;
use std::path::PathBuf;

/// Errors that can occur while reading or writing a dataset file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An existing file could not be parsed as a match-results table.
    #[error("corrupt dataset {}: {reason}", path.display())]
    CorruptDataset {
        /// File that failed to parse.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The CSV encoder failed while writing.
    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        /// File being written.
        path: PathBuf,
        /// Underlying error.
        source: csv::Error,
    },
}

impl StoreError {
    /// Whether this error means an existing file holds unreadable data.
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptDataset { .. })
    }
}
