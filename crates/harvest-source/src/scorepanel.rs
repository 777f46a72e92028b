//! Scorepanel JSON API source.
//!
//! One GET per day returns every competition with fixtures that day under
//! `scores[]`, each carrying its `events[]`. The response is split into one
//! [`RawMatch`] per event, with the competition context copied alongside.
//!
//! # Error classification
//!
//! | Failure                                   | Result                     |
//! |-------------------------------------------|----------------------------|
//! | connect, timeout, reset, body read        | [`SourceError::Transient`] |
//! | HTTP 429, 502, 503, 504                   | [`SourceError::Transient`] |
//! | any other non-2xx status                  | [`SourceError::Http`]      |
//! | body is not JSON, or has the wrong shape  | [`SourceError::Malformed`] |

use std::error::Error as _;
use std::io;

use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::lookup::lookup;
use crate::source::{DaySource, RawMatch};

/// Day source backed by the public scorepanel API.
pub struct ScorePanelSource {
    client: reqwest::Client,
    config: SourceConfig,
}

impl ScorePanelSource {
    /// Build the HTTP client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Client`] if a configured header is invalid or
    /// the client cannot be constructed.
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        for (key, raw) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| SourceError::Client(format!("invalid header name {key:?}: {e}")))?;
            let value = HeaderValue::from_str(raw)
                .map_err(|e| SourceError::Client(format!("invalid value for header {key}: {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SourceError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// The configuration this source was built from.
    pub const fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn fetch_json(&self, date: NaiveDate) -> Result<Value, SourceError> {
        let response = self
            .client
            .get(self.config.endpoint())
            .query(&self.config.query(date))
            .send()
            .await
            .map_err(|e| classify(date, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(date, status));
        }

        let body = response.text().await.map_err(|e| classify(date, &e))?;
        serde_json::from_str(&body).map_err(|e| SourceError::Malformed {
            date,
            message: format!("response is not JSON: {e}"),
        })
    }
}

impl DaySource for ScorePanelSource {
    fn name(&self) -> &str {
        "scorepanel"
    }

    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawMatch>, SourceError> {
        debug!(date = %date, endpoint = %self.config.endpoint(), "requesting scorepanel");
        let json = self.fetch_json(date).await?;
        parse_scorepanel(date, &json)
    }
}

/// Split a scorepanel response into raw matches.
///
/// A missing or null `scores` means no fixtures that day. A competition
/// without `events` contributes nothing.
///
/// # Errors
///
/// Returns [`SourceError::Malformed`] if the root is not an object, or if
/// `scores` or a competition's `events` is present but not an array.
pub fn parse_scorepanel(date: NaiveDate, json: &Value) -> Result<Vec<RawMatch>, SourceError> {
    let malformed = |message: &str| SourceError::Malformed {
        date,
        message: message.to_owned(),
    };

    if !json.is_object() {
        return Err(malformed("response root is not an object"));
    }

    let competitions = match lookup(json, "scores") {
        None => return Ok(Vec::new()),
        Some(Value::Array(competitions)) => competitions,
        Some(_) => return Err(malformed("`scores` is not an array")),
    };

    let mut matches = Vec::new();
    for competition in competitions {
        let events = match lookup(competition, "events") {
            None => continue,
            Some(Value::Array(events)) => events,
            Some(_) => return Err(malformed("competition `events` is not an array")),
        };
        let context = competition_context(competition);
        matches.extend(
            events
                .iter()
                .map(|event| RawMatch::new(event.clone(), context.clone())),
        );
    }

    debug!(
        date = %date,
        competitions = competitions.len(),
        matches = matches.len(),
        "parsed scorepanel response"
    );
    Ok(matches)
}

/// The competition object minus its event list.
fn competition_context(competition: &Value) -> Value {
    match competition {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(key, _)| key.as_str() != "events")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn status_error(date: NaiveDate, status: StatusCode) -> SourceError {
    match status {
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => SourceError::Transient {
            date,
            message: format!("provider returned {status}"),
        },
        _ => SourceError::Http {
            date,
            status: status.as_u16(),
        },
    }
}

fn classify(date: NaiveDate, error: &reqwest::Error) -> SourceError {
    if error.is_builder() {
        return SourceError::Client(error.to_string());
    }
    if error.is_decode() {
        return SourceError::Malformed {
            date,
            message: error.to_string(),
        };
    }
    let kind = if error.is_connect() {
        "connection failed"
    } else if error.is_timeout() {
        "timed out"
    } else if is_connection_reset(error) {
        "connection reset"
    } else {
        "request failed"
    };
    SourceError::Transient {
        date,
        message: format!("{kind}: {error}"),
    }
}

fn is_connection_reset(error: &reqwest::Error) -> bool {
    let mut cause = error.source();
    while let Some(current) = cause {
        if let Some(io_error) = current.downcast_ref::<io::Error>() {
            if matches!(
                io_error.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        cause = current.source();
    }
    false
}
