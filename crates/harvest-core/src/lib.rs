//! Ingestion engine for the Harvest match-results harvester.
//!
//! This crate drives a [`DaySource`](harvest_source::DaySource) across a
//! calendar range, one day at a time, and keeps the on-disk dataset
//! current through [`DatasetStore`](harvest_store::DatasetStore). Runs are
//! incremental: each one resumes from the most recent harvested day, and an
//! interrupted run picks up from its staging file.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with environment overrides
//! - [`retry`] -- Bounded retry of transient fetch failures
//! - [`ingest`] -- [`RangeIngestor`], the day-by-day loop
//! - [`harvest`] -- [`run_harvest`], one complete run from configuration
//! - [`error`] -- Ingestion error types

pub mod config;
pub mod error;
pub mod harvest;
pub mod ingest;
pub mod retry;

pub use config::{
    ConfigError, HarvestConfig, LoggingConfig, RetryConfig, StorageConfig, SyncConfig,
};
pub use error::IngestError;
pub use harvest::{HarvestError, HarvestRequest, run_harvest};
pub use ingest::{IngestSummary, RangeIngestor};
pub use retry::RetryPolicy;
