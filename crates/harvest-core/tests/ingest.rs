//! Integration tests for the range ingestor and `run_harvest`.
//!
//! A scripted in-memory source stands in for the provider; datasets are
//! persisted to temporary directories.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc,
    clippy::too_many_lines
)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;
use harvest_core::{
    HarvestConfig, HarvestError, HarvestRequest, IngestError, RangeIngestor, RetryPolicy,
    run_harvest,
};
use harvest_source::{DaySource, RawMatch, SourceError};
use harvest_store::{DatasetStore, ResumeOrigin};
use harvest_types::{Dataset, DateRange, MatchRecord};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Scripted source
// =============================================================================

/// Serves fixed matches per day, optionally failing first.
#[derive(Default)]
struct ScriptedSource {
    days: HashMap<NaiveDate, Vec<RawMatch>>,
    failures: Mutex<HashMap<NaiveDate, VecDeque<SourceError>>>,
    calls: Mutex<Vec<NaiveDate>>,
}

impl ScriptedSource {
    fn with_matches(mut self, date: NaiveDate, ids: &[&str]) -> Self {
        let matches = ids.iter().map(|id| raw_match(date, id)).collect();
        self.days.insert(date, matches);
        self
    }

    fn failing(self, date: NaiveDate, errors: Vec<SourceError>) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(date, errors.into_iter().collect());
        self
    }

    fn calls(&self) -> Vec<NaiveDate> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_on(&self, date: NaiveDate) -> usize {
        self.calls().iter().filter(|day| **day == date).count()
    }
}

impl DaySource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawMatch>, SourceError> {
        self.calls.lock().unwrap().push(date);
        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&date)
            .and_then(VecDeque::pop_front);
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(self.days.get(&date).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn raw_match(date: NaiveDate, id: &str) -> RawMatch {
    RawMatch::new(
        json!({
            "id": id,
            "date": format!("{date}T23:30Z"),
            "competitions": [{
                "id": id,
                "competitors": [
                    {"homeAway": "home", "score": "20", "team": {"name": format!("Home {id}")}},
                    {"homeAway": "away", "score": "18", "team": {"name": format!("Away {id}")}}
                ]
            }]
        }),
        json!({"leagues": [{"name": "Test League"}], "season": {"year": 2005}}),
    )
}

fn record(date: NaiveDate, id: &str) -> MatchRecord {
    raw_match(date, id).flatten(date)
}

fn range(earliest: NaiveDate, latest: NaiveDate) -> DateRange {
    DateRange::new(earliest, latest).unwrap()
}

fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

fn ingestor(dir: &TempDir, source: ScriptedSource) -> RangeIngestor<ScriptedSource> {
    let store = DatasetStore::new(dir.path().join("match_data.csv"));
    RangeIngestor::new(source, store, quick_retry())
}

fn ids(dataset: &Dataset) -> Vec<String> {
    dataset
        .records()
        .iter()
        .map(|record| record.match_id.clone().unwrap_or_default())
        .collect()
}

fn transient(date: NaiveDate) -> SourceError {
    SourceError::Transient {
        date,
        message: "connection reset by peer".to_owned(),
    }
}

/// Source with two matches on 02-05, none on 02-06 and one on 02-07.
fn three_days() -> ScriptedSource {
    ScriptedSource::default()
        .with_matches(date(2005, 2, 5), &["a", "b"])
        .with_matches(date(2005, 2, 7), &["c"])
}

// =============================================================================
// Fresh ingestion
// =============================================================================

#[tokio::test]
async fn three_day_range_from_scratch() {
    let dir = TempDir::new().unwrap();
    let ingestor = ingestor(&dir, three_days());

    let (dataset, summary) = ingestor
        .ingest_with_summary(range(date(2005, 2, 5), date(2005, 2, 7)), Dataset::new())
        .await
        .unwrap();

    let dates: Vec<NaiveDate> = dataset.records().iter().map(|r| r.match_date).collect();
    assert_eq!(
        dates,
        vec![date(2005, 2, 5), date(2005, 2, 5), date(2005, 2, 7)]
    );
    assert_eq!(dataset.checkpoint_date(), Some(date(2005, 2, 7)));
    assert_eq!(summary.days_visited, 3);
    assert_eq!(summary.records_fetched, 3);
    assert_eq!(summary.total_rows, 3);
    assert!(!summary.caught_up);

    // Published and cleaned up.
    let store = ingestor.store();
    assert_eq!(DatasetStore::load(store.canonical_path()).unwrap(), dataset);
    assert!(!store.staging_path().exists());
}

#[tokio::test]
async fn days_are_visited_once_in_ascending_order() {
    let dir = TempDir::new().unwrap();
    let ingestor = ingestor(&dir, ScriptedSource::default());

    ingestor
        .ingest(range(date(2012, 2, 27), date(2012, 3, 2)), Dataset::new())
        .await
        .unwrap();

    assert_eq!(
        ingestor.source().calls(),
        vec![
            date(2012, 2, 27),
            date(2012, 2, 28),
            date(2012, 2, 29),
            date(2012, 3, 1),
            date(2012, 3, 2),
        ]
    );
}

#[tokio::test]
async fn records_carry_day_kickoff_and_competition() {
    let dir = TempDir::new().unwrap();
    let day = date(2005, 2, 5);
    let ingestor = ingestor(&dir, ScriptedSource::default().with_matches(day, &["late"]));

    let dataset = ingestor.ingest(range(day, day), Dataset::new()).await.unwrap();

    let record = &dataset.records()[0];
    assert_eq!(record.match_date, day);
    assert_eq!(
        record.kickoff.map(|kickoff| kickoff.date_naive()),
        Some(day)
    );
    assert_eq!(record.competition.as_deref(), Some("Test League"));
}

// =============================================================================
// Failures and retry
// =============================================================================

#[tokio::test(start_paused = true)]
async fn transient_failures_then_success_keep_the_day() {
    let dir = TempDir::new().unwrap();
    let day = date(2005, 2, 7);
    let source = three_days().failing(day, vec![transient(day), transient(day)]);
    let store = DatasetStore::new(dir.path().join("match_data.csv"));
    let ingestor = RangeIngestor::new(source, store, RetryPolicy::default());

    let dataset = ingestor
        .ingest(range(date(2005, 2, 5), date(2005, 2, 7)), Dataset::new())
        .await
        .unwrap();

    assert_eq!(ingestor.source().calls_on(day), 3);
    assert_eq!(ids(&dataset), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn exhausted_retries_leave_earlier_days_staged() {
    let dir = TempDir::new().unwrap();
    let failing = date(2005, 2, 7);
    let source = three_days().failing(
        failing,
        vec![transient(failing), transient(failing), transient(failing)],
    );
    let ingestor = ingestor(&dir, source);

    let err = ingestor
        .ingest(range(date(2005, 2, 5), date(2005, 2, 8)), Dataset::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::RetriesExhausted { attempts: 3, .. }
    ));
    assert_eq!(err.date(), Some(failing));
    assert_eq!(ingestor.source().calls_on(failing), 3);
    assert!(!ingestor.source().calls().contains(&date(2005, 2, 8)));

    let store = ingestor.store();
    assert!(!store.canonical_path().exists());
    let staged = DatasetStore::load(store.staging_path()).unwrap();
    assert_eq!(ids(&staged), vec!["a", "b"]);
    assert!(staged.records().iter().all(|r| r.match_date < failing));
}

#[tokio::test]
async fn malformed_day_is_not_retried() {
    let dir = TempDir::new().unwrap();
    let day = date(2005, 2, 6);
    let source = three_days().failing(
        day,
        vec![SourceError::Malformed {
            date: day,
            message: "`scores` is not an array".to_owned(),
        }],
    );
    let ingestor = ingestor(&dir, source);

    let err = ingestor
        .ingest(range(date(2005, 2, 5), date(2005, 2, 7)), Dataset::new())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Source { .. }));
    assert_eq!(ingestor.source().calls_on(day), 1);
    assert_eq!(
        ingestor.source().calls(),
        vec![date(2005, 2, 5), date(2005, 2, 6)]
    );
}

// =============================================================================
// Resume
// =============================================================================

#[tokio::test]
async fn resume_replaces_checkpoint_day_without_duplicates() {
    let dir = TempDir::new().unwrap();
    let first = date(2005, 2, 5);
    let checkpoint = date(2005, 2, 6);
    let resume = Dataset::from(vec![record(first, "a"), record(checkpoint, "stale")]);
    let source = ScriptedSource::default()
        .with_matches(checkpoint, &["d", "e"])
        .with_matches(date(2005, 2, 7), &["f"]);
    let ingestor = ingestor(&dir, source);

    let (dataset, summary) = ingestor
        .ingest_with_summary(range(first, date(2005, 2, 7)), resume)
        .await
        .unwrap();

    assert_eq!(ingestor.source().calls(), vec![checkpoint, date(2005, 2, 7)]);
    assert_eq!(ids(&dataset), vec!["a", "d", "e", "f"]);
    assert_eq!(dataset.count_on(checkpoint), 2);
    assert_eq!(summary.days_visited, 2);
    assert_eq!(summary.records_fetched, 3);
}

#[tokio::test]
async fn checkpoint_before_range_start_is_still_refetched() {
    let dir = TempDir::new().unwrap();
    let checkpoint = date(2005, 2, 3);
    let resume = Dataset::from(vec![record(checkpoint, "old")]);
    let source = ScriptedSource::default().with_matches(checkpoint, &["old"]);
    let ingestor = ingestor(&dir, source);

    ingestor
        .ingest(range(date(2005, 2, 5), date(2005, 2, 5)), resume)
        .await
        .unwrap();

    assert_eq!(
        ingestor.source().calls(),
        vec![checkpoint, date(2005, 2, 4), date(2005, 2, 5)]
    );
}

#[tokio::test]
async fn rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let window = range(date(2005, 2, 5), date(2005, 2, 7));

    let first = ingestor(&dir, three_days())
        .ingest(window, Dataset::new())
        .await
        .unwrap();

    let again = ingestor(&dir, three_days());
    let resume = again.store().load_resume_state().unwrap();
    assert_eq!(resume.origin, ResumeOrigin::Canonical);
    let second = again.ingest(window, resume.dataset).await.unwrap();

    assert_eq!(second, first);
    assert_eq!(again.source().calls(), vec![date(2005, 2, 7)]);
}

#[tokio::test]
async fn caught_up_dataset_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let resume = Dataset::from(vec![record(date(2005, 2, 9), "x")]);
    let ingestor = ingestor(&dir, three_days());

    let (dataset, summary) = ingestor
        .ingest_with_summary(range(date(2005, 2, 5), date(2005, 2, 7)), resume.clone())
        .await
        .unwrap();

    assert_eq!(dataset, resume);
    assert!(summary.caught_up);
    assert_eq!(summary.days_visited, 0);
    assert_eq!(summary.checkpoint_date, Some(date(2005, 2, 9)));
    assert!(ingestor.source().calls().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn trailing_days_without_matches_are_not_fetched_again() {
    let dir = TempDir::new().unwrap();
    let window = range(date(2005, 2, 5), date(2005, 2, 14));
    let source = || ScriptedSource::default().with_matches(date(2005, 2, 5), &["a"]);

    let (_, first) = ingestor(&dir, source())
        .ingest_with_summary(window, Dataset::new())
        .await
        .unwrap();
    assert_eq!(first.days_visited, 10);
    assert_eq!(first.checkpoint_date, Some(date(2005, 2, 14)));

    let again = ingestor(&dir, source());
    let resume = again.store().load_resume_state().unwrap();
    assert_eq!(resume.checkpoint_date(), Some(date(2005, 2, 14)));
    let (dataset, second) = again
        .ingest_with_summary(window, resume.dataset)
        .await
        .unwrap();

    assert_eq!(again.source().calls(), vec![date(2005, 2, 14)]);
    assert_eq!(second.days_visited, 1);
    assert_eq!(second.checkpoint_date, Some(date(2005, 2, 14)));
    assert_eq!(ids(&dataset), vec!["a"]);

    let earlier = ingestor(&dir, source());
    let resume = earlier.store().load_resume_state().unwrap();
    let (_, third) = earlier
        .ingest_with_summary(range(date(2005, 2, 5), date(2005, 2, 13)), resume.dataset)
        .await
        .unwrap();
    assert!(third.caught_up);
    assert!(earlier.source().calls().is_empty());
}

#[tokio::test]
async fn interrupted_then_resumed_matches_uninterrupted() {
    let window = range(date(2005, 2, 5), date(2005, 2, 9));
    let full_source = || {
        three_days()
            .with_matches(date(2005, 2, 8), &["d", "e"])
            .with_matches(date(2005, 2, 9), &["f"])
    };

    let clean_dir = TempDir::new().unwrap();
    let uninterrupted = ingestor(&clean_dir, full_source())
        .ingest(window, Dataset::new())
        .await
        .unwrap();

    // Interrupt after 02-07 has been checkpointed.
    let dir = TempDir::new().unwrap();
    let crashing = full_source().failing(
        date(2005, 2, 8),
        vec![SourceError::Http {
            date: date(2005, 2, 8),
            status: 500,
        }],
    );
    ingestor(&dir, crashing)
        .ingest(window, Dataset::new())
        .await
        .unwrap_err();

    let resumed = ingestor(&dir, full_source());
    let state = resumed.store().load_resume_state().unwrap();
    assert_eq!(state.origin, ResumeOrigin::Staging);
    assert_eq!(state.checkpoint_date(), Some(date(2005, 2, 7)));
    let finished = resumed.ingest(window, state.dataset).await.unwrap();

    assert_eq!(finished, uninterrupted);
    assert_eq!(
        DatasetStore::load(resumed.store().canonical_path()).unwrap(),
        uninterrupted
    );
    assert!(!resumed.store().staging_path().exists());
}

// =============================================================================
// run_harvest
// =============================================================================

fn config_in(dir: &TempDir) -> HarvestConfig {
    let mut config = HarvestConfig::default();
    config.storage.data_dir = dir.path().join("data");
    config.retry.backoff_ms = 0;
    config
}

#[tokio::test]
async fn run_harvest_fresh_then_resume() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let request = HarvestRequest {
        earliest: Some(date(2005, 2, 5)),
        latest: Some(date(2005, 2, 7)),
    };

    let summary = run_harvest(&config, request, three_days(), date(2024, 1, 1))
        .await
        .unwrap();
    assert_eq!(summary.total_rows, 3);
    assert_eq!(summary.checkpoint_date, Some(date(2005, 2, 7)));
    assert!(DatasetStore::has_data(&config.storage.canonical_path()));

    let later = HarvestRequest {
        earliest: None,
        latest: Some(date(2005, 2, 8)),
    };
    let source = three_days().with_matches(date(2005, 2, 8), &["g"]);
    let summary = run_harvest(&config, later, source, date(2024, 1, 1))
        .await
        .unwrap();
    assert_eq!(summary.days_visited, 2);
    assert_eq!(summary.total_rows, 4);
}

#[tokio::test]
async fn run_harvest_publishes_staging_that_already_covers_the_range() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let store = DatasetStore::new(config.storage.canonical_path());
    let mut staged = Dataset::new();
    staged.append_day(date(2005, 2, 5), vec![record(date(2005, 2, 5), "a")]);
    staged.append_day(date(2005, 2, 6), Vec::new());
    staged.append_day(date(2005, 2, 7), vec![record(date(2005, 2, 7), "c")]);
    store.checkpoint(&staged).unwrap();
    assert!(!store.canonical_path().exists());

    let request = HarvestRequest {
        earliest: Some(date(2005, 2, 5)),
        latest: Some(date(2005, 2, 6)),
    };
    let summary = run_harvest(&config, request, ScriptedSource::default(), date(2024, 1, 1))
        .await
        .unwrap();

    assert!(summary.caught_up);
    assert_eq!(summary.days_visited, 0);
    assert_eq!(summary.total_rows, 2);
    assert!(!store.staging_path().exists());
    assert_eq!(DatasetStore::load(store.canonical_path()).unwrap(), staged);
}

#[tokio::test]
async fn run_harvest_leaves_caught_up_canonical_untouched() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let request = HarvestRequest {
        earliest: Some(date(2005, 2, 5)),
        latest: Some(date(2005, 2, 7)),
    };
    run_harvest(&config, request, three_days(), date(2024, 1, 1))
        .await
        .unwrap();
    let canonical = config.storage.canonical_path();
    let before = std::fs::metadata(&canonical).unwrap().modified().unwrap();

    let earlier = HarvestRequest {
        earliest: Some(date(2005, 2, 5)),
        latest: Some(date(2005, 2, 6)),
    };
    let summary = run_harvest(&config, earlier, three_days(), date(2024, 1, 1))
        .await
        .unwrap();

    assert!(summary.caught_up);
    assert_eq!(
        std::fs::metadata(&canonical).unwrap().modified().unwrap(),
        before
    );
}

#[tokio::test]
async fn run_harvest_rejects_reversed_range() {
    let dir = TempDir::new().unwrap();
    let request = HarvestRequest {
        earliest: Some(date(2005, 2, 7)),
        latest: Some(date(2005, 2, 5)),
    };

    let source = ScriptedSource::default();
    let err = run_harvest(&config_in(&dir), request, source, date(2024, 1, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::Range(_)));
    assert!(!dir.path().join("data").exists());
}

#[tokio::test]
async fn run_harvest_refuses_corrupt_dataset() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    std::fs::create_dir_all(&config.storage.data_dir).unwrap();
    std::fs::write(config.storage.canonical_path(), "not,a,dataset\n1,2,3\n").unwrap();

    let err = run_harvest(
        &config,
        HarvestRequest::default(),
        ScriptedSource::default(),
        date(2005, 2, 8),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, HarvestError::Store(ref store) if store.is_corrupt()));
}
