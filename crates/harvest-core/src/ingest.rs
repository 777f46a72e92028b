//! The day-by-day range ingestor.
//!
//! [`RangeIngestor`] walks a [`DateRange`] in calendar order, one day at a
//! time:
//!
//! ```text
//! resume dataset --> drop checkpoint day --> for each day:
//!                                              fetch (with retry)
//!                                              flatten + append
//!                                              checkpoint to staging
//!                                            publish canonical
//! ```
//!
//! The most recent harvested day of a resumed dataset is treated as
//! provisional: its records are dropped and the day is fetched again,
//! because the source may still have been adding matches when it was last
//! read. Days without matches count as harvested, so a trailing stretch of
//! empty days is not walked again. Every completed day
//! is checkpointed before the next fetch starts, so an interrupted run loses
//! at most the day in flight.

use chrono::NaiveDate;
use harvest_source::DaySource;
use harvest_store::DatasetStore;
use harvest_types::{Dataset, DateRange, MatchRecord, iter_days};
use tracing::{debug, info};

use crate::error::IngestError;
use crate::retry::RetryPolicy;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    /// Days fetched, including a re-fetched checkpoint day.
    pub days_visited: u64,
    /// Records returned by the source across all visited days.
    pub records_fetched: usize,
    /// Rows in the final dataset.
    pub total_rows: usize,
    /// Most recent harvested day of the final dataset, with or without
    /// matches.
    pub checkpoint_date: Option<NaiveDate>,
    /// The dataset already covered the range; nothing was fetched or
    /// written.
    pub caught_up: bool,
}

/// Incremental, resumable ingestion over a date range.
pub struct RangeIngestor<S> {
    source: S,
    store: DatasetStore,
    retry: RetryPolicy,
}

impl<S: DaySource> RangeIngestor<S> {
    /// Create an ingestor reading from `source` and persisting to `store`.
    pub const fn new(source: S, store: DatasetStore, retry: RetryPolicy) -> Self {
        Self {
            source,
            store,
            retry,
        }
    }

    /// The day source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The dataset store.
    pub const fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Ingest `range`, continuing from `resume_from`.
    ///
    /// # Errors
    ///
    /// See [`ingest_with_summary`](Self::ingest_with_summary).
    pub async fn ingest(
        &self,
        range: DateRange,
        resume_from: Dataset,
    ) -> Result<Dataset, IngestError> {
        self.ingest_with_summary(range, resume_from)
            .await
            .map(|(dataset, _)| dataset)
    }

    /// Ingest `range`, continuing from `resume_from`, and report what
    /// happened.
    ///
    /// Starts at the checkpoint day of `resume_from` when it has one (see
    /// [`Dataset::checkpoint_date`]), and at the start of `range`
    /// otherwise. Returns `resume_from` untouched, without writing any
    /// file, when that start falls after the end of `range`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::RetriesExhausted`] or [`IngestError::Source`]
    /// when a day cannot be fetched, and [`IngestError::Store`] when a
    /// checkpoint or the final publish fails. Days before the failing one
    /// are already in the staging file.
    pub async fn ingest_with_summary(
        &self,
        range: DateRange,
        resume_from: Dataset,
    ) -> Result<(Dataset, IngestSummary), IngestError> {
        let checkpoint = resume_from.checkpoint_date();
        let start = checkpoint.unwrap_or_else(|| range.earliest());

        if start > range.latest() {
            info!(
                checkpoint = ?checkpoint,
                latest = %range.latest(),
                rows = resume_from.len(),
                "dataset already covers the range, nothing to do"
            );
            let summary = IngestSummary {
                days_visited: 0,
                records_fetched: 0,
                total_rows: resume_from.len(),
                checkpoint_date: checkpoint,
                caught_up: true,
            };
            return Ok((resume_from, summary));
        }

        let mut accumulator = resume_from;
        if let Some(day) = checkpoint {
            let dropped = accumulator.drop_date(day);
            info!(
                checkpoint = %day,
                dropped,
                "re-fetching last harvested day"
            );
        }

        info!(
            source = self.source.name(),
            start = %start,
            latest = %range.latest(),
            "ingesting"
        );

        let mut days_visited: u64 = 0;
        let mut records_fetched: usize = 0;
        for date in iter_days(start, range.latest()) {
            let matches = self.retry.fetch_day(&self.source, date).await?;
            let records: Vec<MatchRecord> =
                matches.iter().map(|raw| raw.flatten(date)).collect();
            let fetched = records.len();

            accumulator.append_day(date, records);
            self.store.checkpoint(&accumulator)?;

            days_visited = days_visited.saturating_add(1);
            records_fetched = records_fetched.saturating_add(fetched);
            info!(
                date = %date,
                matches = fetched,
                total = accumulator.len(),
                "day ingested"
            );
        }

        self.store.publish(&accumulator)?;
        debug!(days_visited, records_fetched, "range complete");

        let summary = IngestSummary {
            days_visited,
            records_fetched,
            total_rows: accumulator.len(),
            checkpoint_date: accumulator.checkpoint_date(),
            caught_up: false,
        };
        Ok((accumulator, summary))
    }
}
