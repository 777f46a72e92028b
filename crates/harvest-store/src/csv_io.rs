//! CSV encoding of a [`Dataset`] and the crash-safe write path.
//!
//! Files carry a header row naming [`MatchRecord::COLUMNS`]. Columns are
//! matched by name on read, so extra columns and a different column order
//! are tolerated; a missing column is not.
//!
//! Writes never truncate the target in place. The table is written to a
//! uniquely named temporary file in the same directory, flushed, synced to
//! disk, and renamed over the target, so an interrupted write leaves the
//! previous file intact. A temporary file that is never persisted is
//! removed when dropped.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;

use harvest_types::{Dataset, MatchRecord};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::progress::{ProgressMarker, read_marker, remove_marker, write_marker};

/// Read a dataset file, restoring its harvested-through day from the
/// progress marker beside it.
///
/// A missing or zero-byte file is an empty dataset, whatever the marker
/// says.
pub(crate) fn read_dataset(path: &Path) -> Result<Dataset, StoreError> {
    let Some(dataset) = read_table(path)? else {
        return Ok(Dataset::new());
    };
    let Some(marker) = read_marker(path)? else {
        return Ok(dataset);
    };
    if !marker.describes(&dataset) {
        warn!(
            path = %path.display(),
            marker_last_match = ?marker.last_match_date,
            table_last_match = ?dataset.last_match_date(),
            "progress marker does not match the table, ignoring it"
        );
        return Ok(dataset);
    }
    Ok(dataset.with_harvested_through(marker.harvested_through))
}

/// Parse the table at `path`; `None` when the file is absent or empty.
fn read_table(path: &Path) -> Result<Option<Dataset>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(io_error(path, source)),
    };
    let size = file
        .metadata()
        .map_err(|source| io_error(path, source))?
        .len();
    if size == 0 {
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(file);
    let headers = reader
        .headers()
        .map_err(|error| read_error(path, error))?
        .clone();
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(position, name)| (name.trim(), position))
        .collect();
    if let Some(missing) = MatchRecord::COLUMNS
        .iter()
        .find(|column| !index.contains_key(*column))
    {
        return Err(corrupt(path, format!("missing column `{missing}`")));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|error| read_error(path, error))?;
        let line = row.position().map_or(0, csv::Position::line);
        let record = MatchRecord::from_row(|column| {
            index.get(column).and_then(|position| row.get(*position))
        })
        .map_err(|error| corrupt(path, format!("line {line}: {error}")))?;
        records.push(record);
    }

    debug!(path = %path.display(), rows = records.len(), "loaded dataset");
    Ok(Some(Dataset::from_records(records)))
}

/// Replace `path` with the encoded dataset, then its progress marker.
///
/// The table goes first. A crash between the two writes leaves a marker
/// that no longer describes the table, which reads back as no marker.
pub(crate) fn write_dataset(path: &Path, dataset: &Dataset) -> Result<(), StoreError> {
    replace_file(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(MatchRecord::COLUMNS)
            .map_err(|source| csv_error(path, source))?;
        for record in dataset.records() {
            writer
                .write_record(record.to_row())
                .map_err(|source| csv_error(path, source))?;
        }
        writer.flush().map_err(|source| io_error(path, source))
    })?;

    match ProgressMarker::for_dataset(dataset) {
        Some(marker) => write_marker(path, &marker)?,
        None => remove_marker(path)?,
    }

    debug!(path = %path.display(), rows = dataset.len(), "wrote dataset");
    Ok(())
}

/// Atomically replace `path` with whatever `write` puts in a fresh file.
///
/// Missing parent directories are created.
pub(crate) fn replace_file<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut File) -> Result<(), StoreError>,
{
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;

    let mut staged = NamedTempFile::new_in(parent).map_err(|source| io_error(parent, source))?;
    write(staged.as_file_mut())?;
    staged
        .as_file()
        .sync_all()
        .map_err(|source| io_error(staged.path(), source))?;
    staged
        .persist(path)
        .map_err(|error| io_error(path, error.error))?;
    Ok(())
}

fn read_error(path: &Path, error: csv::Error) -> StoreError {
    if error.is_io_error() {
        return StoreError::Csv {
            path: path.to_path_buf(),
            source: error,
        };
    }
    let line = error.position().map_or(0, csv::Position::line);
    corrupt(path, format!("line {line}: {error}"))
}

fn corrupt(path: &Path, reason: String) -> StoreError {
    StoreError::CorruptDataset {
        path: path.to_path_buf(),
        reason,
    }
}

pub(crate) fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) fn csv_error(path: &Path, source: csv::Error) -> StoreError {
    StoreError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
