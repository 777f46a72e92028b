//! Harvested-through markers.
//!
//! A day without fixtures adds no row, so the table alone cannot tell how
//! far a harvest got. Every dataset file `name` may carry a sidecar
//! `.name.progress`: a one-row CSV holding the last harvested day and the
//! latest `match_date` of the table it was written with. The marker is only
//! trusted while that match date still agrees with the table.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use harvest_types::Dataset;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::csv_io::{csv_error, io_error, replace_file};
use crate::error::StoreError;

/// Contents of a progress marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ProgressMarker {
    /// Last day harvested, with or without matches.
    pub(crate) harvested_through: NaiveDate,
    /// Latest `match_date` in the table when the marker was written.
    pub(crate) last_match_date: Option<NaiveDate>,
}

impl ProgressMarker {
    /// Marker for `dataset`, or `None` if it has never been harvested.
    pub(crate) fn for_dataset(dataset: &Dataset) -> Option<Self> {
        dataset.harvested_through().map(|harvested_through| Self {
            harvested_through,
            last_match_date: dataset.last_match_date(),
        })
    }

    /// Whether this marker was written alongside `dataset`'s table.
    pub(crate) fn describes(&self, dataset: &Dataset) -> bool {
        self.last_match_date == dataset.last_match_date()
            && self
                .last_match_date
                .is_none_or(|last| last <= self.harvested_through)
    }
}

/// Sidecar path holding the marker for the dataset at `path`.
pub(crate) fn marker_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.progress"))
}

/// Read the marker for `path`.
///
/// An absent marker is `None`. So is an unreadable one: it only saves
/// re-fetching days, and losing it costs nothing but time.
pub(crate) fn read_marker(path: &Path) -> Result<Option<ProgressMarker>, StoreError> {
    let marker_path = marker_path_for(path);
    let file = match File::open(&marker_path) {
        Ok(file) => file,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(io_error(&marker_path, source)),
    };
    match csv::Reader::from_reader(file)
        .deserialize::<ProgressMarker>()
        .next()
    {
        Some(Ok(marker)) => Ok(Some(marker)),
        Some(Err(error)) if error.is_io_error() => Err(csv_error(&marker_path, error)),
        Some(Err(error)) => {
            warn!(path = %marker_path.display(), %error, "ignoring unreadable progress marker");
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Replace the marker for `path`.
pub(crate) fn write_marker(path: &Path, marker: &ProgressMarker) -> Result<(), StoreError> {
    let marker_path = marker_path_for(path);
    replace_file(&marker_path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        writer
            .serialize(marker)
            .map_err(|source| csv_error(&marker_path, source))?;
        writer
            .flush()
            .map_err(|source| io_error(&marker_path, source))
    })
}

/// Remove the marker for `path`. An absent marker is not an error.
pub(crate) fn remove_marker(path: &Path) -> Result<(), StoreError> {
    let marker_path = marker_path_for(path);
    match fs::remove_file(&marker_path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(io_error(&marker_path, source)),
    }
}
