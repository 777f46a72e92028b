//! Provider settings for the scorepanel source.
//!
//! Everything the HTTP client needs is carried in [`SourceConfig`] and
//! handed to [`ScorePanelSource::new`](crate::ScorePanelSource::new).
//! Nothing is read from ambient process state here; environment overrides
//! are applied by the configuration loader before the source is built.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

/// Settings for the scorepanel JSON API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    /// API host, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sport segment of the API path.
    #[serde(default = "default_sport")]
    pub sport: String,

    /// Response language.
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Provider region edition.
    #[serde(default = "default_region")]
    pub region: String,

    /// Timezone the provider uses to decide which day a match belongs to.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            sport: default_sport(),
            lang: default_lang(),
            region: default_region(),
            timezone: default_timezone(),
            user_agent: default_user_agent(),
            request_timeout_ms: default_request_timeout_ms(),
            headers: BTreeMap::new(),
        }
    }
}

impl SourceConfig {
    /// Scorepanel endpoint URL.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/apis/site/v2/sports/{}/scorepanel",
            self.base_url.trim_end_matches('/'),
            self.sport
        )
    }

    /// Query parameters selecting one day, in the provider's `YYYYMMDD` form.
    pub fn query(&self, date: NaiveDate) -> Vec<(&'static str, String)> {
        vec![
            ("contentorigin", "espn".to_owned()),
            ("dates", date.format("%Y%m%d").to_string()),
            ("lang", self.lang.clone()),
            ("region", self.region.clone()),
            ("tz", self.timezone.clone()),
        ]
    }

    /// Per-request timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_base_url() -> String {
    "https://site.web.api.espn.com".to_owned()
}

fn default_sport() -> String {
    "rugby".to_owned()
}

fn default_lang() -> String {
    "en".to_owned()
}

fn default_region() -> String {
    "gb".to_owned()
}

fn default_timezone() -> String {
    "Europe/London".to_owned()
}

fn default_user_agent() -> String {
    concat!("harvest/", env!("CARGO_PKG_VERSION")).to_owned()
}

const fn default_request_timeout_ms() -> u64 {
    15_000
}
