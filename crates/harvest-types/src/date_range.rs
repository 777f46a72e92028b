//! Inclusive calendar ranges and day iteration.
//!
//! A harvest walks a [`DateRange`] one calendar day at a time. The range
//! defaults to "everything the source has": from [`source_earliest_date`]
//! up to yesterday, since the source never has complete results for the
//! current day.

use chrono::NaiveDate;

/// Format accepted for user-supplied dates.
const CLI_DATE_FORMAT: &str = "%Y-%m-%d";

/// A user-supplied date string did not match `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date {input:?}: expected YYYY-MM-DD")]
pub struct DateFormatError {
    /// The rejected input.
    pub input: String,
}

/// A range whose earliest day falls after its latest day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("earliest date {earliest} is after latest date {latest}")]
pub struct DateRangeError {
    /// Requested first day.
    pub earliest: NaiveDate,
    /// Requested last day.
    pub latest: NaiveDate,
}

/// First day the source has any results for (5 February 2005).
pub fn source_earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2005, 2, 5).unwrap_or(NaiveDate::MIN)
}

/// Default last day of a harvest: the day before `today`.
pub fn default_latest_date(today: NaiveDate) -> NaiveDate {
    today.pred_opt().unwrap_or(today)
}

/// Parse a `YYYY-MM-DD` date as given on the command line.
///
/// # Errors
///
/// Returns [`DateFormatError`] for anything that is not a zero-padded
/// ISO calendar date.
pub fn parse_cli_date(input: &str) -> Result<NaiveDate, DateFormatError> {
    let trimmed = input.trim();
    let error = || DateFormatError {
        input: input.to_owned(),
    };
    if !is_iso_date_shape(trimmed) {
        return Err(error());
    }
    NaiveDate::parse_from_str(trimmed, CLI_DATE_FORMAT)
        .ok()
        .ok_or_else(error)
}

/// `DDDD-DD-DD` with ASCII digits. chrono alone accepts unpadded and
/// over-long fields.
fn is_iso_date_shape(input: &str) -> bool {
    input.len() == 10
        && input.bytes().enumerate().all(|(position, byte)| match position {
            4 | 7 => byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}

/// An inclusive `[earliest, latest]` calendar range with `earliest <= latest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    earliest: NaiveDate,
    latest: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `earliest > latest`.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError`] if the bounds are reversed.
    pub fn new(earliest: NaiveDate, latest: NaiveDate) -> Result<Self, DateRangeError> {
        if earliest > latest {
            return Err(DateRangeError { earliest, latest });
        }
        Ok(Self { earliest, latest })
    }

    /// Resolve optional user bounds against the defaults.
    ///
    /// A missing `earliest` becomes [`source_earliest_date`]; a missing
    /// `latest` becomes the day before `today`.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError`] if the resolved bounds are reversed.
    pub fn resolve(
        earliest: Option<NaiveDate>,
        latest: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, DateRangeError> {
        Self::new(
            earliest.unwrap_or_else(source_earliest_date),
            latest.unwrap_or_else(|| default_latest_date(today)),
        )
    }

    /// First day of the range.
    pub const fn earliest(&self) -> NaiveDate {
        self.earliest
    }

    /// Last day of the range.
    pub const fn latest(&self) -> NaiveDate {
        self.latest
    }

    /// Whether `date` falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.earliest <= date && date <= self.latest
    }

    /// Number of days in the range, counting both ends.
    pub fn len_days(&self) -> u64 {
        self.latest
            .signed_duration_since(self.earliest)
            .num_days()
            .unsigned_abs()
            .saturating_add(1)
    }

    /// Every day of the range in ascending order.
    pub fn days(&self) -> DayIter {
        iter_days(self.earliest, self.latest)
    }
}

/// Iterate from `first` to `last` inclusive. Empty when `first > last`.
pub fn iter_days(first: NaiveDate, last: NaiveDate) -> DayIter {
    DayIter {
        next: Some(first),
        last,
    }
}

/// Ascending iterator over calendar days, produced by [`iter_days`].
#[derive(Debug, Clone)]
pub struct DayIter {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl Iterator for DayIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|day| *day <= self.last)?;
        self.next = current.succ_opt();
        Some(current)
    }
}
