//! Object-store sync for the Harvest match-results dataset.
//!
//! A finished dataset can be pushed to a bucket under a date-prefixed key,
//! and the most recent one pulled back to seed a new machine before a run.
//!
//! # Modules
//!
//! - [`store`] -- [`ObjectStore`] trait, [`DirectoryBucket`] and the [`Bucket`] dispatch enum
//! - `s3` -- `S3Bucket` and `S3Config` (feature `s3`)
//! - [`bucket`] -- [`BucketSync`] and the `YYMMDD_<file>` key scheme
//! - [`error`] -- Shared error types

pub mod bucket;
pub mod error;
#[cfg(feature = "s3")]
pub mod s3;
pub mod store;

pub use bucket::{BucketSync, dated_key, key_date};
pub use error::SyncError;
#[cfg(feature = "s3")]
pub use s3::{S3Bucket, S3Config};
pub use store::{Bucket, DirectoryBucket, ObjectStore};
