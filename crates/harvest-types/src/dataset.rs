//! The ordered record accumulator.
//!
//! A [`Dataset`] only ever grows by whole days. Besides its records it
//! remembers the last day it was harvested through, since a day without
//! fixtures leaves no row behind. The checkpoint date is the later of that
//! day and the latest `match_date` held; records on the checkpoint day are
//! provisional, since the source may still have been adding fixtures when
//! they were read.

use chrono::NaiveDate;

use crate::record::MatchRecord;

/// An ordered sequence of match records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<MatchRecord>,
    harvested_through: Option<NaiveDate>,
}

impl Dataset {
    /// An empty dataset.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            harvested_through: None,
        }
    }

    /// Wrap records loaded from storage, preserving their order.
    pub const fn from_records(records: Vec<MatchRecord>) -> Self {
        Self {
            records,
            harvested_through: None,
        }
    }

    /// Record that every day up to `date` has been harvested.
    ///
    /// Never moves the marker backwards.
    #[must_use]
    pub fn with_harvested_through(mut self, date: NaiveDate) -> Self {
        self.mark_harvested(date);
        self
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    /// Consume the dataset, returning its records.
    pub fn into_records(self) -> Vec<MatchRecord> {
        self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether anything has been harvested, even days without matches.
    pub fn has_progress(&self) -> bool {
        self.checkpoint_date().is_some()
    }

    /// The most recent `match_date` present, if any.
    pub fn last_match_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|record| record.match_date).max()
    }

    /// The last day explicitly marked as harvested.
    pub const fn harvested_through(&self) -> Option<NaiveDate> {
        self.harvested_through
    }

    /// The most recent harvested day: the later of
    /// [`harvested_through`](Self::harvested_through) and
    /// [`last_match_date`](Self::last_match_date).
    pub fn checkpoint_date(&self) -> Option<NaiveDate> {
        self.last_match_date().max(self.harvested_through)
    }

    /// Number of records on `date`.
    pub fn count_on(&self, date: NaiveDate) -> usize {
        self.records
            .iter()
            .filter(|record| record.match_date == date)
            .count()
    }

    /// Remove every record on `date`, returning how many were removed.
    ///
    /// The harvested-through day is left alone.
    pub fn drop_date(&mut self, date: NaiveDate) -> usize {
        let before = self.records.len();
        self.records.retain(|record| record.match_date != date);
        before.saturating_sub(self.records.len())
    }

    /// Append one day's records, stamping `date` onto each of them, and
    /// mark the day harvested.
    ///
    /// The stamp wins over whatever date the record already carries, so the
    /// checkpoint date always reflects the day that was actually fetched.
    /// An empty batch still advances the checkpoint.
    pub fn append_day(&mut self, date: NaiveDate, records: Vec<MatchRecord>) {
        self.records.extend(records.into_iter().map(|mut record| {
            record.match_date = date;
            record
        }));
        self.mark_harvested(date);
    }

    fn mark_harvested(&mut self, date: NaiveDate) {
        self.harvested_through = self.harvested_through.max(Some(date));
    }
}

impl From<Vec<MatchRecord>> for Dataset {
    fn from(records: Vec<MatchRecord>) -> Self {
        Self::from_records(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn records_on(day: NaiveDate, count: usize) -> Vec<MatchRecord> {
        (0..count).map(|_| MatchRecord::new(day)).collect()
    }

    #[test]
    fn empty_dataset_has_no_checkpoint() {
        let dataset = Dataset::new();
        assert!(dataset.is_empty());
        assert!(!dataset.has_progress());
        assert_eq!(dataset.checkpoint_date(), None);
    }

    #[test]
    fn checkpoint_is_latest_date_not_last_row() {
        let mut records = records_on(date(2005, 2, 7), 1);
        records.extend(records_on(date(2005, 2, 5), 2));
        let dataset = Dataset::from(records);
        assert_eq!(dataset.checkpoint_date(), Some(date(2005, 2, 7)));
    }

    #[test]
    fn append_day_stamps_the_fetched_date() {
        let mut dataset = Dataset::new();
        dataset.append_day(date(2005, 2, 6), records_on(date(1999, 1, 1), 2));
        assert_eq!(dataset.count_on(date(2005, 2, 6)), 2);
        assert_eq!(dataset.count_on(date(1999, 1, 1)), 0);
    }

    #[test]
    fn empty_day_still_advances_checkpoint() {
        let mut dataset = Dataset::new();
        dataset.append_day(date(2005, 2, 5), records_on(date(2005, 2, 5), 1));
        dataset.append_day(date(2005, 2, 6), Vec::new());
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.last_match_date(), Some(date(2005, 2, 5)));
        assert_eq!(dataset.checkpoint_date(), Some(date(2005, 2, 6)));

        let only_empty_days = Dataset::new().with_harvested_through(date(2005, 2, 9));
        assert!(only_empty_days.is_empty());
        assert!(only_empty_days.has_progress());
        assert_eq!(only_empty_days.checkpoint_date(), Some(date(2005, 2, 9)));
    }

    #[test]
    fn harvested_through_never_moves_back() {
        let dataset = Dataset::new()
            .with_harvested_through(date(2005, 2, 9))
            .with_harvested_through(date(2005, 2, 6));
        assert_eq!(dataset.harvested_through(), Some(date(2005, 2, 9)));
    }

    #[test]
    fn drop_date_removes_only_that_day() {
        let mut dataset = Dataset::new();
        dataset.append_day(date(2005, 2, 5), records_on(date(2005, 2, 5), 2));
        dataset.append_day(date(2005, 2, 7), records_on(date(2005, 2, 7), 3));
        assert_eq!(dataset.drop_date(date(2005, 2, 7)), 3);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.drop_date(date(2005, 2, 7)), 0);
        assert_eq!(dataset.last_match_date(), Some(date(2005, 2, 5)));
        assert_eq!(dataset.checkpoint_date(), Some(date(2005, 2, 7)));
    }
}
