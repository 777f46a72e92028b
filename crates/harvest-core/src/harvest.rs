//! One complete harvest run: configuration in, summary out.

use chrono::NaiveDate;
use harvest_source::DaySource;
use harvest_store::{DatasetStore, ResumeOrigin, StoreError};
use harvest_types::{DateRange, DateRangeError};
use tracing::info;

use crate::config::HarvestConfig;
use crate::error::IngestError;
use crate::ingest::{IngestSummary, RangeIngestor};

/// User overrides for the harvested range. `None` means the default bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestRequest {
    /// First day to harvest; defaults to the first day the source has data.
    pub earliest: Option<NaiveDate>,
    /// Last day to harvest; defaults to yesterday.
    pub latest: Option<NaiveDate>,
}

/// Errors that can end a harvest run.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// The requested range is empty.
    #[error(transparent)]
    Range(#[from] DateRangeError),

    /// The existing dataset could not be loaded.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Ingestion failed part-way; progress is in the staging file.
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

/// Resume the configured dataset and ingest up to the requested end.
///
/// `today` is the caller's current local date; the default range ends the
/// day before it. When the staging file left by an interrupted run already
/// covers the range, it is published as it stands, so the canonical file
/// always reflects the finished run.
///
/// # Errors
///
/// Returns [`HarvestError::Range`] before touching the network when the
/// resolved bounds are reversed, [`HarvestError::Store`] when an existing
/// file is corrupt, and [`HarvestError::Ingest`] when ingestion fails.
pub async fn run_harvest<S: DaySource>(
    config: &HarvestConfig,
    request: HarvestRequest,
    source: S,
    today: NaiveDate,
) -> Result<IngestSummary, HarvestError> {
    let range = DateRange::resolve(request.earliest, request.latest, today)?;
    let store = DatasetStore::new(config.storage.canonical_path());

    let resume = store.load_resume_state()?;
    let origin = resume.origin;
    match origin {
        ResumeOrigin::Fresh => info!(
            path = %store.canonical_path().display(),
            earliest = %range.earliest(),
            latest = %range.latest(),
            "starting fresh harvest"
        ),
        origin => info!(
            from = origin.as_str(),
            rows = resume.dataset.len(),
            checkpoint = ?resume.checkpoint_date(),
            latest = %range.latest(),
            "resuming harvest"
        ),
    }

    let ingestor = RangeIngestor::new(source, store, config.retry.policy());
    let (dataset, summary) = ingestor.ingest_with_summary(range, resume.dataset).await?;
    if summary.caught_up && origin == ResumeOrigin::Staging {
        info!(
            path = %ingestor.store().canonical_path().display(),
            rows = dataset.len(),
            "staging file already covers the range, publishing it"
        );
        ingestor.store().publish(&dataset)?;
    }
    Ok(summary)
}
