//! Error types for day sources.
//!
//! The ingestor retries only [`SourceError::Transient`]. A malformed
//! response or an unexpected HTTP status will not improve on a second
//! attempt, so those propagate immediately.

use chrono::NaiveDate;

/// Errors that can occur while fetching one day of matches.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Network-level failure: connection refused or reset, timeout, or a
    /// gateway-class status from the provider.
    #[error("transient failure fetching {date}: {message}")]
    Transient {
        /// Day being fetched.
        date: NaiveDate,
        /// Description of the failure.
        message: String,
    },

    /// The provider answered with something that is not the expected
    /// structure.
    #[error("malformed response for {date}: {message}")]
    Malformed {
        /// Day being fetched.
        date: NaiveDate,
        /// What did not match.
        message: String,
    },

    /// The provider answered with a non-retryable HTTP status.
    #[error("HTTP {status} fetching {date}")]
    Http {
        /// Day being fetched.
        date: NaiveDate,
        /// Status code returned.
        status: u16,
    },

    /// The HTTP client could not be built from configuration.
    #[error("client setup error: {0}")]
    Client(String),
}

impl SourceError {
    /// Whether another attempt at the same day may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// The day the error relates to, if any.
    pub const fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Transient { date, .. } | Self::Malformed { date, .. } | Self::Http { date, .. } => {
                Some(*date)
            }
            Self::Client(_) => None,
        }
    }
}
