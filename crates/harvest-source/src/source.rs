//! The day source capability.
//!
//! The ingestor asks a [`DaySource`] for one calendar day at a time and
//! never concurrently. How the source gets its data (one JSON request,
//! several page fetches in parallel, a fixture on disk) is its own
//! business.

use std::future::Future;

use chrono::NaiveDate;
use harvest_types::MatchRecord;
use serde_json::Value;

use crate::error::SourceError;
use crate::flatten::flatten;

/// One match as published by the provider, before flattening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    /// The event structure (teams, venue, kickoff).
    pub event: Value,
    /// The enclosing competition (league name, season), without its events.
    pub competition: Value,
}

impl RawMatch {
    /// Pair an event with its competition context.
    pub const fn new(event: Value, competition: Value) -> Self {
        Self { event, competition }
    }

    /// Flatten into a record for the harvested day `date`.
    pub fn flatten(&self, date: NaiveDate) -> MatchRecord {
        flatten(&self.event, &self.competition, date)
    }
}

/// A provider of per-day match data.
///
/// Implementations return every match published for `date`; an empty
/// vector is a normal answer for a day without fixtures.
pub trait DaySource {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Fetch the raw matches for one calendar day.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Transient`] for failures worth retrying and
    /// any other variant for failures that are not.
    fn fetch(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<RawMatch>, SourceError>> + Send;
}
