//! Shared type definitions for the Harvest match-results harvester.
//!
//! This crate is the single source of truth for the tabular record shape
//! and the date bookkeeping used across the workspace. The day source, the
//! dataset store and the range ingestor all speak in these types.
//!
//! # Modules
//!
//! - [`record`] -- [`MatchRecord`], [`TeamSide`] and the uniform column schema
//! - [`date_range`] -- Inclusive [`DateRange`], day iteration and CLI date parsing
//! - [`dataset`] -- [`Dataset`], the ordered record accumulator and its checkpoint date

pub mod dataset;
pub mod date_range;
pub mod record;

// Re-export all public types at crate root for convenience.
pub use dataset::Dataset;
pub use date_range::{
    DateFormatError, DateRange, DateRangeError, DayIter, default_latest_date, iter_days,
    parse_cli_date, source_earliest_date,
};
pub use record::{
    COLUMN_COUNT, FieldValue, HomeAway, MatchRecord, RowError, TeamSide, parse_source_datetime,
};
