//! Crash-safe persistence for the Harvest match-results dataset.
//!
//! A dataset lives in one CSV file at a canonical path. During a harvest
//! the running accumulator is checkpointed to a staging file beside it
//! (`tmp_<name>`); publishing writes the canonical file and drops the
//! staging file.
//!
//! ```text
//! harvest day N --> checkpoint --> tmp_match_data.csv   (every day)
//! range done    --> publish ----> match_data.csv        (once)
//!                                 tmp_match_data.csv removed
//! ```
//!
//! # Modules
//!
//! - [`store`] -- [`DatasetStore`], resume state and staging paths
//! - [`error`] -- Shared error types
//!
//! The CSV codec, the atomic write path and the harvested-through markers
//! are private to the crate.

mod csv_io;
pub mod error;
mod progress;
pub mod store;

pub use error::StoreError;
pub use store::{DatasetStore, ResumeOrigin, ResumeState, STAGING_PREFIX, staging_path_for};
