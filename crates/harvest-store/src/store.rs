//! The on-disk dataset: one canonical file plus a staging file.
//!
//! The canonical file holds the last completed harvest. While a harvest is
//! running, the full accumulator is checkpointed to the staging file after
//! every day; a clean finish publishes it to the canonical path and removes
//! the staging file. A staging file that survives into the next run marks an
//! interrupted harvest and is resumed from.
//!
//! Each file carries a hidden progress marker recording the last day
//! harvested, so a trailing run of days without fixtures is not fetched
//! again on the next run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use harvest_types::Dataset;
use tracing::{debug, info, warn};

use crate::csv_io::{read_dataset, write_dataset};
use crate::error::StoreError;
use crate::progress::remove_marker;

/// File-name prefix that turns a canonical path into its staging path.
pub const STAGING_PREFIX: &str = "tmp_";

/// Staging path for `canonical`: same directory, name prefixed with
/// [`STAGING_PREFIX`].
pub fn staging_path_for(canonical: &Path) -> PathBuf {
    let name = canonical
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    canonical.with_file_name(format!("{STAGING_PREFIX}{name}"))
}

/// Which file a resumed dataset was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOrigin {
    /// Neither file recorded any progress.
    Fresh,
    /// The canonical file from the last completed harvest.
    Canonical,
    /// The staging file left by an interrupted harvest.
    Staging,
}

impl ResumeOrigin {
    /// Lowercase label for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Canonical => "canonical",
            Self::Staging => "staging",
        }
    }
}

/// Dataset to resume from, and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeState {
    /// Records already harvested.
    pub dataset: Dataset,
    /// File the records were read from.
    pub origin: ResumeOrigin,
}

impl ResumeState {
    /// Most recent harvested day, if any, including days without
    /// matches.
    pub fn checkpoint_date(&self) -> Option<NaiveDate> {
        self.dataset.checkpoint_date()
    }
}

/// Owner of the canonical and staging dataset files.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    canonical: PathBuf,
    staging: PathBuf,
}

impl DatasetStore {
    /// Store for `canonical`, with the staging file beside it.
    pub fn new(canonical: impl Into<PathBuf>) -> Self {
        let canonical = canonical.into();
        let staging = staging_path_for(&canonical);
        Self { canonical, staging }
    }

    /// Path of the published dataset.
    pub fn canonical_path(&self) -> &Path {
        &self.canonical
    }

    /// Path of the in-progress checkpoint.
    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    /// Load the dataset at `path`, with its harvested-through day when a
    /// matching progress marker sits beside it.
    ///
    /// A missing or zero-byte file is an empty dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptDataset`] if the file exists but is not
    /// a valid table (missing column, unparseable cell, ragged row), and
    /// [`StoreError::Io`] if it cannot be read.
    pub fn load(path: &Path) -> Result<Dataset, StoreError> {
        read_dataset(path)
    }

    /// Whether `path` exists, parses, and holds at least one record.
    pub fn has_data(path: &Path) -> bool {
        read_dataset(path).is_ok_and(|dataset| !dataset.is_empty())
    }

    /// Load the dataset a new harvest should resume from.
    ///
    /// A staging file with progress supersedes the canonical file: it was
    /// seeded from the canonical dataset and extended by the interrupted
    /// run. Progress means records or a harvested-through day.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptDataset`] if either file exists but
    /// does not parse. A corrupt file is never skipped.
    pub fn load_resume_state(&self) -> Result<ResumeState, StoreError> {
        let staged = read_dataset(&self.staging)?;
        if staged.has_progress() {
            warn!(
                path = %self.staging.display(),
                rows = staged.len(),
                checkpoint = ?staged.checkpoint_date(),
                "found staging file from an interrupted harvest"
            );
            return Ok(ResumeState {
                dataset: staged,
                origin: ResumeOrigin::Staging,
            });
        }

        let canonical = read_dataset(&self.canonical)?;
        let origin = if canonical.has_progress() {
            ResumeOrigin::Canonical
        } else {
            ResumeOrigin::Fresh
        };
        Ok(ResumeState {
            dataset: canonical,
            origin,
        })
    }

    /// Overwrite the staging file with the full accumulator.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails; the previous staging file
    /// is left intact.
    pub fn checkpoint(&self, dataset: &Dataset) -> Result<(), StoreError> {
        write_dataset(&self.staging, dataset)?;
        debug!(
            path = %self.staging.display(),
            rows = dataset.len(),
            checkpoint = ?dataset.checkpoint_date(),
            "checkpointed"
        );
        Ok(())
    }

    /// Write the accumulator to the canonical path, then remove the
    /// staging file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write or the staging removal fails;
    /// the previous canonical file is left intact on a failed write.
    pub fn publish(&self, dataset: &Dataset) -> Result<(), StoreError> {
        write_dataset(&self.canonical, dataset)?;
        self.discard_staging()?;
        info!(
            path = %self.canonical.display(),
            rows = dataset.len(),
            "published dataset"
        );
        Ok(())
    }

    /// Remove the staging file and its progress marker. Absent files are
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if a file exists and cannot be removed.
    pub fn discard_staging(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.staging) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.staging.clone(),
                    source,
                });
            }
        }
        remove_marker(&self.staging)
    }
}
