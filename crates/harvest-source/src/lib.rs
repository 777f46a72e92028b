//! Day sources and record flattening for the Harvest harvester.
//!
//! A [`DaySource`] turns a calendar date into the raw match structures the
//! provider published for that day. [`flatten`] turns one raw structure into
//! a [`MatchRecord`](harvest_types::MatchRecord), reading every nested field
//! through the null-tolerant [`lookup`] helpers.
//!
//! # Modules
//!
//! - [`config`] -- [`SourceConfig`], the explicit provider settings
//! - [`error`] -- [`SourceError`] and its transient/fatal classification
//! - [`lookup`] -- Safe nested lookup over `serde_json::Value`
//! - [`flatten`] -- Raw match to flat record conversion
//! - [`source`] -- The [`DaySource`] capability and [`RawMatch`]
//! - [`scorepanel`] -- [`ScorePanelSource`], the JSON scorepanel API client

pub mod config;
pub mod error;
pub mod flatten;
pub mod lookup;
pub mod scorepanel;
pub mod source;

// Re-export primary types for convenience.
pub use config::SourceConfig;
pub use error::SourceError;
pub use flatten::flatten;
pub use lookup::{lookup, lookup_array, lookup_bool, lookup_i64, lookup_str};
pub use scorepanel::{ScorePanelSource, parse_scorepanel};
pub use source::{DaySource, RawMatch};
