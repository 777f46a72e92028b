//! Bounded retry of a single day's fetch.
//!
//! Only [transient](harvest_source::SourceError::is_transient) failures are
//! retried, with a fixed pause between attempts. Anything else fails the
//! day on the first attempt.

use std::time::Duration;

use chrono::NaiveDate;
use harvest_source::{DaySource, RawMatch};
use tracing::warn;

use crate::error::IngestError;

/// Attempt budget and pause for transient fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// A policy making at most `max_attempts` attempts (at least one),
    /// sleeping `backoff` between them.
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        let max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Total attempts per day, including the first.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between attempts.
    pub const fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Fetch `date` from `source`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::RetriesExhausted`] when every attempt failed
    /// transiently, and [`IngestError::Source`] on the first
    /// non-transient failure.
    pub async fn fetch_day<S: DaySource>(
        &self,
        source: &S,
        date: NaiveDate,
    ) -> Result<Vec<RawMatch>, IngestError> {
        let mut attempt: u32 = 1;
        loop {
            match source.fetch(date).await {
                Ok(matches) => return Ok(matches),
                Err(error) if error.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        date = %date,
                        source = source.name(),
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %error,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) if error.is_transient() => {
                    return Err(IngestError::RetriesExhausted {
                        date,
                        attempts: attempt,
                        source: error,
                    });
                }
                Err(error) => return Err(IngestError::Source { date, source: error }),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}
