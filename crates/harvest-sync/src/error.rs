//! Error types for object-store sync.

use std::io;
use std::path::PathBuf;

/// Errors that can occur while talking to an object store.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The bucket directory does not exist or is not a directory.
    #[error("bucket not found: {}", .0.display())]
    BucketNotFound(PathBuf),

    /// A key is empty or would escape the bucket.
    #[error("invalid object key {0:?}")]
    InvalidKey(String),

    /// No object is stored under the key.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// A remote object store rejected a request or could not be reached.
    #[cfg(feature = "s3")]
    #[error("object store error on {bucket}: {source}")]
    Remote {
        /// Bucket being accessed.
        bucket: String,
        /// Underlying error.
        source: Box<object_store::Error>,
    },
}
