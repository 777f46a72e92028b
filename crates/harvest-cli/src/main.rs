//! Command-line entry point for the Harvest match-results harvester.
//!
//! Pulls match results for every day between two dates into a CSV dataset,
//! resuming from whatever is already on disk. With no dates given, the range
//! runs from the first day the source has results up to yesterday.
//!
//! ```text
//! [bucket] --download-latest--> data/match_data.csv
//!                                  |
//!                     scorepanel --+--> tmp_match_data.csv (per day)
//!                                  |
//!                                  +--> match_data.csv --upload--> [bucket]
//! ```
//!
//! The bucket is either an S3 bucket (`--bucket`, credentials from
//! `AWS_DEFAULT_REGION`, `AWS_ACCESS_ID` and `AWS_SECRET_ACCESS_KEY`) or a
//! local directory (`--bucket-dir`).

use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::{Local, NaiveDate};
use clap::Parser;
use harvest_core::{HarvestConfig, HarvestRequest, LoggingConfig, SyncConfig, run_harvest};
use harvest_source::ScorePanelSource;
use harvest_sync::{Bucket, BucketSync, DirectoryBucket, ObjectStore as _, S3Bucket, S3Config};
use harvest_types::parse_cli_date;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Harvest match results day by day into a CSV dataset.
///
/// Runs are incremental: the last harvested day is fetched again and the
/// harvest continues from there. An interrupted run resumes from its
/// staging file.
#[derive(Debug, Parser)]
#[command(name = "harvest", version)]
struct Args {
    /// First day to harvest, as YYYY-MM-DD. Defaults to 2005-02-05.
    #[arg(long, value_name = "DATE", value_parser = parse_cli_date)]
    earliest_date: Option<NaiveDate>,

    /// Last day to harvest, as YYYY-MM-DD. Defaults to yesterday.
    #[arg(long, value_name = "DATE", value_parser = parse_cli_date)]
    latest_date: Option<NaiveDate>,

    /// Dataset file name; `.csv` is appended if missing.
    #[arg(long, value_name = "NAME")]
    filename: Option<String>,

    /// YAML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the dataset.
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// S3 bucket to sync with.
    #[arg(long, value_name = "NAME", conflicts_with = "bucket_dir")]
    bucket: Option<String>,

    /// Directory acting as the sync bucket.
    #[arg(long, value_name = "DIR")]
    bucket_dir: Option<PathBuf>,

    /// Seed the dataset with the latest dated file from the bucket first.
    #[arg(long)]
    download_latest: bool,

    /// Upload the dataset to the bucket after a successful run.
    #[arg(long)]
    upload: bool,
}

/// Application entry point.
///
/// Loads configuration, initializes logging, optionally seeds the dataset
/// from the bucket, runs the harvest, and optionally uploads the result.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the existing dataset is
/// corrupt, a day cannot be fetched, or a sync step fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_tracing(&config.logging);

    info!(version = env!("CARGO_PKG_VERSION"), "harvest starting");

    let canonical = config.storage.canonical_path();
    let today = Local::now().date_naive();
    info!(
        path = %canonical.display(),
        source = %config.source.endpoint(),
        max_attempts = config.retry.max_attempts,
        "configuration loaded"
    );

    let sync = if args.download_latest || args.upload {
        let bucket = open_bucket(&config.sync)?;
        info!(bucket = %bucket.name(), "sync bucket ready");
        Some(BucketSync::new(bucket))
    } else {
        None
    };

    if let Some(sync) = sync.as_ref().filter(|_| args.download_latest) {
        sync.download_latest(&canonical)
            .await
            .context("downloading latest dataset")?;
    }

    let source = ScorePanelSource::new(config.source.clone())?;
    let request = HarvestRequest {
        earliest: args.earliest_date,
        latest: args.latest_date,
    };
    let summary = run_harvest(&config, request, source, today).await?;
    info!(
        days_visited = summary.days_visited,
        records_fetched = summary.records_fetched,
        total_rows = summary.total_rows,
        checkpoint = ?summary.checkpoint_date,
        caught_up = summary.caught_up,
        path = %canonical.display(),
        "harvest complete"
    );

    if let Some(sync) = sync.as_ref().filter(|_| args.upload) {
        let key = sync
            .upload_dataset(&canonical, today)
            .await
            .context("uploading dataset")?;
        info!(key = %key, "dataset uploaded");
    }

    Ok(())
}

/// Build the effective configuration: file (or defaults), then environment,
/// then command-line flags.
fn load_config(args: &Args) -> anyhow::Result<HarvestConfig> {
    let mut config = match &args.config {
        Some(path) => HarvestConfig::from_file(path)?,
        None => {
            let mut config = HarvestConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Some(dir) = &args.data_dir {
        config.storage.data_dir.clone_from(dir);
    }
    if let Some(name) = &args.filename {
        config.storage.set_filename(name);
    }
    if let Some(name) = &args.bucket {
        config.sync.bucket = Some(name.clone());
        config.sync.bucket_dir = None;
    }
    if let Some(dir) = &args.bucket_dir {
        config.sync.bucket_dir = Some(dir.clone());
        config.sync.bucket = None;
    }
    Ok(config)
}

/// Open the configured sync bucket: S3 when a bucket name is set, otherwise
/// a local directory.
fn open_bucket(sync: &SyncConfig) -> anyhow::Result<Bucket> {
    match (&sync.bucket, &sync.bucket_dir) {
        (Some(_), Some(_)) => {
            bail!("configure either an S3 bucket or a bucket directory, not both")
        }
        (Some(name), None) => {
            let mut s3 = S3Config::from_env(name.clone());
            if sync.region.is_some() {
                s3.region.clone_from(&sync.region);
            }
            s3.endpoint.clone_from(&sync.endpoint);
            Ok(S3Bucket::connect(&s3)?.into())
        }
        (None, Some(dir)) => Ok(DirectoryBucket::open(dir)?.into()),
        (None, None) => bail!(
            "a bucket is required: set --bucket or --bucket-dir (or HARVEST_BUCKET / HARVEST_BUCKET_DIR)"
        ),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
