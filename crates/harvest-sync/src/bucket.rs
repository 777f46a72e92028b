//! Date-keyed dataset sync.
//!
//! Datasets are stored under `YYMMDD_<file name>`, e.g.
//! `240316_match_data.csv`. The most recent object is the one whose
//! prefix is the latest date; keys without a parseable prefix are ignored.

use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::error::SyncError;
use crate::store::ObjectStore;

/// Date format of key prefixes.
const KEY_DATE_FORMAT: &str = "%y%m%d";

/// Key for a dataset file named `file_name` uploaded on `date`.
pub fn dated_key(date: NaiveDate, file_name: &str) -> String {
    format!("{}_{file_name}", date.format(KEY_DATE_FORMAT))
}

/// Date encoded in the prefix of `key` (text before the first `_`).
pub fn key_date(key: &str) -> Option<NaiveDate> {
    let prefix = key.split('_').next()?;
    NaiveDate::parse_from_str(prefix, KEY_DATE_FORMAT).ok()
}

/// Uploads and downloads datasets through an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct BucketSync<O> {
    store: O,
}

impl<O: ObjectStore> BucketSync<O> {
    /// Sync through `store`.
    pub const fn new(store: O) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub const fn store(&self) -> &O {
        &self.store
    }

    /// Key of the most recently dated object, if any.
    ///
    /// When two keys carry the same date, the first in key order wins.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the store cannot be listed.
    pub async fn latest_key(&self) -> Result<Option<String>, SyncError> {
        let mut latest: Option<(NaiveDate, String)> = None;
        for key in self.store.list_keys().await? {
            let Some(date) = key_date(&key) else {
                continue;
            };
            if latest.as_ref().is_none_or(|(best, _)| date > *best) {
                latest = Some((date, key));
            }
        }
        Ok(latest.map(|(_, key)| key))
    }

    /// Download the most recent dataset to `dest`.
    ///
    /// Returns the key downloaded, or `None` if the store holds no dated
    /// object, in which case `dest` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if listing or downloading fails.
    pub async fn download_latest(&self, dest: &Path) -> Result<Option<String>, SyncError> {
        let Some(key) = self.latest_key().await? else {
            info!(bucket = self.store.name(), "no dated dataset in bucket");
            return Ok(None);
        };
        info!(bucket = self.store.name(), key = %key, "downloading latest dataset");
        self.store.download(&key, dest).await?;
        info!(
            bucket = self.store.name(),
            key = %key,
            dest = %dest.display(),
            "downloaded latest dataset"
        );
        Ok(Some(key))
    }

    /// Upload the dataset at `path` under a key dated `date`.
    ///
    /// Returns the key written.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidKey`] if `path` has no file name, and
    /// [`SyncError`] if the upload fails.
    pub async fn upload_dataset(&self, path: &Path, date: NaiveDate) -> Result<String, SyncError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| SyncError::InvalidKey(path.display().to_string()))?;
        let key = dated_key(date, &file_name);
        info!(bucket = self.store.name(), path = %path.display(), key = %key, "uploading dataset");
        self.store.upload(path, &key).await?;
        info!(bucket = self.store.name(), key = %key, "uploaded dataset");
        Ok(key)
    }
}
