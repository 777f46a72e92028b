//! Object-store abstraction, the directory-backed implementation and the
//! enum that picks a backend at runtime.
//!
//! An [`ObjectStore`] is a flat namespace of keys holding whole files.
//! [`DirectoryBucket`] maps each key to a file in one directory, which
//! covers local buckets as well as object stores mounted into the
//! filesystem. With the `s3` feature, `S3Bucket` talks to an S3 bucket
//! directly.

use std::fs::{self, File};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::SyncError;
#[cfg(feature = "s3")]
use crate::s3::S3Bucket;

/// A flat key/file store.
pub trait ObjectStore {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Every key in the store, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the listing fails.
    fn list_keys(&self) -> impl Future<Output = Result<Vec<String>, SyncError>> + Send;

    /// Copy the object at `key` to the local file `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if there is no such key.
    fn download(&self, key: &str, dest: &Path)
    -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Store the local file `src` under `key`, replacing any existing
    /// object.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if `key` is invalid or the copy fails.
    fn upload(&self, src: &Path, key: &str) -> impl Future<Output = Result<(), SyncError>> + Send;
}

// ---------------------------------------------------------------------------
// Runtime backend selection
// ---------------------------------------------------------------------------

/// A bucket chosen at runtime.
///
/// Uses enum dispatch because [`ObjectStore`] has async methods and is not
/// dyn-compatible.
#[derive(Debug)]
pub enum Bucket {
    /// A local directory.
    Directory(DirectoryBucket),
    /// An S3 bucket.
    #[cfg(feature = "s3")]
    S3(S3Bucket),
}

impl ObjectStore for Bucket {
    fn name(&self) -> &str {
        match self {
            Self::Directory(bucket) => bucket.name(),
            #[cfg(feature = "s3")]
            Self::S3(bucket) => bucket.name(),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>, SyncError> {
        match self {
            Self::Directory(bucket) => bucket.list_keys().await,
            #[cfg(feature = "s3")]
            Self::S3(bucket) => bucket.list_keys().await,
        }
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<(), SyncError> {
        match self {
            Self::Directory(bucket) => bucket.download(key, dest).await,
            #[cfg(feature = "s3")]
            Self::S3(bucket) => bucket.download(key, dest).await,
        }
    }

    async fn upload(&self, src: &Path, key: &str) -> Result<(), SyncError> {
        match self {
            Self::Directory(bucket) => bucket.upload(src, key).await,
            #[cfg(feature = "s3")]
            Self::S3(bucket) => bucket.upload(src, key).await,
        }
    }
}

impl From<DirectoryBucket> for Bucket {
    fn from(bucket: DirectoryBucket) -> Self {
        Self::Directory(bucket)
    }
}

#[cfg(feature = "s3")]
impl From<S3Bucket> for Bucket {
    fn from(bucket: S3Bucket) -> Self {
        Self::S3(bucket)
    }
}

// ---------------------------------------------------------------------------
// Directory bucket
// ---------------------------------------------------------------------------

/// A directory acting as a bucket: one file per key.
#[derive(Debug, Clone)]
pub struct DirectoryBucket {
    root: PathBuf,
    name: String,
}

impl DirectoryBucket {
    /// Open the bucket rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BucketNotFound`] if `root` is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SyncError::BucketNotFound(root));
        }
        let name = root.display().to_string();
        Ok(Self { root, name })
    }

    /// Directory backing the bucket.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, SyncError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\'])
            && key != "..";
        if !valid {
            return Err(SyncError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(key))
    }
}

impl ObjectStore for DirectoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_keys(&self) -> Result<Vec<String>, SyncError> {
        let entries = fs::read_dir(&self.root).map_err(|source| io_error(&self.root, source))?;
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&self.root, source))?;
            let is_file = entry
                .file_type()
                .map_err(|source| io_error(&entry.path(), source))?
                .is_file();
            let key = entry.file_name().to_string_lossy().into_owned();
            // In-flight uploads are hidden.
            if is_file && !key.starts_with('.') {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<(), SyncError> {
        let object = self.object_path(key)?;
        if !object.is_file() {
            return Err(SyncError::NotFound(key.to_owned()));
        }
        copy_replacing(&object, dest)?;
        debug!(bucket = %self.name, key, dest = %dest.display(), "downloaded object");
        Ok(())
    }

    async fn upload(&self, src: &Path, key: &str) -> Result<(), SyncError> {
        let object = self.object_path(key)?;
        copy_replacing(src, &object)?;
        debug!(bucket = %self.name, key, src = %src.display(), "uploaded object");
        Ok(())
    }
}

/// Copy `src` over `dest` without readers of `dest` ever seeing a
/// half-written file.
fn copy_replacing(src: &Path, dest: &Path) -> Result<(), SyncError> {
    let mut input = File::open(src).map_err(|source| io_error(src, source))?;
    replace_file(dest, |file| io::copy(&mut input, file).map(|_| ()))
}

/// Atomically replace `dest` with whatever `write` puts in a fresh file in
/// the same directory. Missing parent directories are created.
pub(crate) fn replace_file<F>(dest: &Path, write: F) -> Result<(), SyncError>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let parent = dest
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;

    let mut staged = NamedTempFile::new_in(parent).map_err(|source| io_error(parent, source))?;
    write(staged.as_file_mut())
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|source| io_error(dest, source))?;
    staged
        .persist(dest)
        .map_err(|error| io_error(dest, error.error))?;
    Ok(())
}

pub(crate) fn io_error(path: &Path, source: io::Error) -> SyncError {
    SyncError::Io {
        path: path.to_path_buf(),
        source,
    }
}
