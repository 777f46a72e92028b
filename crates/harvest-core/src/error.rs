//! Error types for range ingestion.

use chrono::NaiveDate;
use harvest_source::SourceError;
use harvest_store::StoreError;

/// Unrecoverable failures of a range ingestion.
///
/// When one of these is returned, every day before the failing one has
/// already been checkpointed to the staging file.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A day kept failing transiently until the attempt budget ran out.
    #[error("giving up on {date} after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Day being fetched.
        date: NaiveDate,
        /// Attempts made, including the first.
        attempts: u32,
        /// The last transient failure.
        source: SourceError,
    },

    /// A day failed in a way retrying cannot fix.
    #[error("fetch failed for {date}: {source}")]
    Source {
        /// Day being fetched.
        date: NaiveDate,
        /// The underlying failure.
        source: SourceError,
    },

    /// Reading or writing the dataset failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    /// The day that failed, if the failure belongs to one.
    pub const fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::RetriesExhausted { date, .. } | Self::Source { date, .. } => Some(*date),
            Self::Store(_) => None,
        }
    }
}
