//! Protocol-level tests for the collection loop and the orchestrator,
//! driven by scripted fakes instead of a live browser.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;

use crmigrate::cdp::CdpError;
use crmigrate::collect::{PageReader, collect_pages};
use crmigrate::console::{OperatorConsole, Signal};
use crmigrate::dest::{DestError, DestinationSite};
use crmigrate::migrate::{self, MigrateOptions, RecordStatus, SkipReason};
use crmigrate::model::{CustomResult, MatchType, ResultIdentity, Term, fold_name};

// ============================================================================
// Fakes
// ============================================================================

/// Console that replays a fixed script of operator signals.
struct ScriptedConsole {
    script: VecDeque<Signal>,
}

impl ScriptedConsole {
    fn new(signals: &[Signal]) -> Self {
        Self {
            script: signals.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl OperatorConsole for ScriptedConsole {
    async fn await_signal(&mut self, _prompt: &str) -> std::io::Result<Signal> {
        Ok(self.script.pop_front().unwrap_or(Signal::Stop))
    }

    fn notify(&self, _message: &str) {}
}

/// Reader that serves scripted pages, repeating the last one.
struct FakeListing {
    pages: VecDeque<Vec<ResultIdentity>>,
    last: Vec<ResultIdentity>,
}

impl FakeListing {
    fn new(pages: Vec<Vec<ResultIdentity>>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
            last: Vec::new(),
        }
    }
}

#[async_trait]
impl PageReader for FakeListing {
    type Row = ResultIdentity;

    async fn capture_rows(&mut self) -> Result<Vec<ResultIdentity>, CdpError> {
        if let Some(page) = self.pages.pop_front() {
            self.last = page;
        }
        Ok(self.last.clone())
    }
}

/// Reader whose first captures fail, as when the operator has not
/// finished logging in yet.
struct FlakyListing {
    failures_left: u32,
    rows: Vec<ResultIdentity>,
}

#[async_trait]
impl PageReader for FlakyListing {
    type Row = ResultIdentity;

    async fn capture_rows(&mut self) -> Result<Vec<ResultIdentity>, CdpError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(CdpError::Timeout("listing table never appeared".to_string()));
        }
        Ok(self.rows.clone())
    }
}

/// Destination that records calls and fails per a scripted plan.
#[derive(Default)]
struct FakeSite {
    /// Remaining failures per record name before creation succeeds.
    failures: HashMap<String, u32>,
    /// Resets beyond this count fail, when set.
    fail_resets_after: Option<usize>,
    create_calls: Vec<String>,
    resets: usize,
}

impl FakeSite {
    fn failing(name: &str, times: u32) -> Self {
        Self {
            failures: HashMap::from([(name.to_string(), times)]),
            ..Default::default()
        }
    }

    fn creations(&self, name: &str) -> usize {
        self.create_calls.iter().filter(|n| *n == name).count()
    }
}

#[async_trait]
impl DestinationSite for FakeSite {
    async fn reset(&mut self) -> Result<(), DestError> {
        self.resets += 1;
        if let Some(limit) = self.fail_resets_after {
            if self.resets > limit {
                return Err(DestError::DomContract("list view unreachable".to_string()));
            }
        }
        Ok(())
    }

    async fn create(&mut self, record: &CustomResult) -> Result<(), DestError> {
        self.create_calls.push(record.name.clone());
        match self.failures.get_mut(&record.name) {
            Some(0) | None => Ok(()),
            Some(remaining) => {
                *remaining -= 1;
                Err(DestError::SubmitUnconfirmed(record.name.clone()))
            }
        }
    }
}

fn identity(name: &str, href: &str) -> ResultIdentity {
    ResultIdentity {
        name: name.to_string(),
        href: href.to_string(),
    }
}

fn record(name: &str) -> CustomResult {
    CustomResult {
        name: name.to_string(),
        terms: vec![],
        products: vec![],
    }
}

// ============================================================================
// Paginated collection
// ============================================================================

#[tokio::test]
async fn recapturing_a_page_adds_nothing() {
    let page = vec![
        identity("Alpha", "https://src/1"),
        identity("Beta", "https://src/2"),
    ];
    // The operator captures the same page twice, then stops.
    let mut console =
        ScriptedConsole::new(&[Signal::Capture, Signal::Capture, Signal::Stop]);
    let mut reader = FakeListing::new(vec![page.clone(), page]);

    let collected = collect_pages(&mut console, &mut reader, "SOURCE", |r| r.href.clone())
        .await
        .unwrap();

    assert_eq!(collected.len(), 2);
}

#[tokio::test]
async fn collection_accumulates_across_pages_in_order() {
    let mut console =
        ScriptedConsole::new(&[Signal::Capture, Signal::Capture, Signal::Stop]);
    let mut reader = FakeListing::new(vec![
        vec![identity("Alpha", "https://src/1"), identity("Beta", "https://src/2")],
        // The next page repeats one row, as real pagination boundaries do.
        vec![identity("Beta", "https://src/2"), identity("Gamma", "https://src/3")],
    ]);

    let collected = collect_pages(&mut console, &mut reader, "SOURCE", |r| r.href.clone())
        .await
        .unwrap();

    let names: Vec<_> = collected.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
}

#[tokio::test]
async fn capture_failure_is_reported_and_the_loop_continues() {
    // First capture fails (operator still on the login page); the loop
    // lets them retry instead of aborting the collection.
    let mut console =
        ScriptedConsole::new(&[Signal::Capture, Signal::Capture, Signal::Stop]);
    let mut reader = FlakyListing {
        failures_left: 1,
        rows: vec![identity("Alpha", "https://src/1")],
    };

    let collected = collect_pages(&mut console, &mut reader, "SOURCE", |r| r.href.clone())
        .await
        .unwrap();

    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].name, "Alpha");
}

#[tokio::test]
async fn immediate_stop_collects_nothing() {
    let mut console = ScriptedConsole::new(&[Signal::Stop]);
    let mut reader = FakeListing::new(vec![vec![identity("Alpha", "https://src/1")]]);

    let collected = collect_pages(&mut console, &mut reader, "SOURCE", |r| r.href.clone())
        .await
        .unwrap();

    assert!(collected.is_empty());
}

// ============================================================================
// Orchestrator
// ============================================================================

#[tokio::test]
async fn existing_name_is_skipped_case_insensitively() {
    let mut site = FakeSite::default();
    let existing: HashSet<String> = [fold_name("Summer Sale")].into();
    let records = vec![record("summer sale")];

    let report = migrate::run(&mut site, &records, existing, &MigrateOptions::default())
        .await
        .unwrap();

    assert_eq!(report.created, 0);
    assert!(site.create_calls.is_empty());
    assert_eq!(
        report.outcomes[0].status,
        RecordStatus::Skipped(SkipReason::AlreadyExists)
    );
}

#[tokio::test]
async fn one_records_exhaustion_never_blocks_the_next() {
    let mut site = FakeSite::failing("Doomed", u32::MAX);
    let records = vec![record("Doomed"), record("Fine")];

    let report = migrate::run(&mut site, &records, HashSet::new(), &MigrateOptions::default())
        .await
        .unwrap();

    assert_eq!(report.outcomes[0].status, RecordStatus::Failed { attempts: 3 });
    assert_eq!(report.outcomes[1].status, RecordStatus::Created);
    assert_eq!(report.created, 1);
    assert_eq!(site.creations("Doomed"), 3);
    assert_eq!(site.creations("Fine"), 1);
}

#[tokio::test]
async fn transient_failure_is_retried_within_the_budget() {
    let mut site = FakeSite::failing("Flaky", 2);
    let records = vec![record("Flaky")];

    let report = migrate::run(&mut site, &records, HashSet::new(), &MigrateOptions::default())
        .await
        .unwrap();

    assert_eq!(report.outcomes[0].status, RecordStatus::Created);
    assert_eq!(site.creations("Flaky"), 3);
}

#[tokio::test]
async fn duplicate_source_names_create_only_once() {
    let mut site = FakeSite::default();
    let records = vec![record("Promo"), record("PROMO")];

    let report = migrate::run(&mut site, &records, HashSet::new(), &MigrateOptions::default())
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(site.create_calls, vec!["Promo"]);
    assert_eq!(
        report.outcomes[1].status,
        RecordStatus::Skipped(SkipReason::AlreadyExists)
    );
}

#[tokio::test]
async fn reset_failure_after_a_create_keeps_the_report() {
    // Pre-creation reset succeeds, the record is created, and the
    // best-effort reset back to the list view fails; the finished
    // report must survive.
    let mut site = FakeSite {
        fail_resets_after: Some(1),
        ..Default::default()
    };
    let records = vec![record("Last One")];

    let report = migrate::run(&mut site, &records, HashSet::new(), &MigrateOptions::default())
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.outcomes[0].status, RecordStatus::Created);
}

#[tokio::test]
async fn dry_run_creates_nothing() {
    let mut site = FakeSite::default();
    let records = vec![record("Would Create")];
    let opts = MigrateOptions {
        dry_run: true,
        ..Default::default()
    };

    let report = migrate::run(&mut site, &records, HashSet::new(), &opts)
        .await
        .unwrap();

    assert!(site.create_calls.is_empty());
    assert_eq!(site.resets, 0);
    assert_eq!(
        report.outcomes[0].status,
        RecordStatus::Skipped(SkipReason::DryRun)
    );
}

#[tokio::test]
async fn mixed_batch_creates_named_and_skips_unnamed() {
    // One well-formed record and one unnamed record against an empty
    // destination: exactly one creation, one NoName skip.
    let mut site = FakeSite::default();
    let records = vec![
        CustomResult {
            name: "Red Shoes".to_string(),
            terms: vec![Term::new("shoes", MatchType::Exact)],
            products: vec!["SKU1".to_string()],
        },
        CustomResult {
            name: String::new(),
            terms: vec![],
            products: vec![],
        },
    ];

    let report = migrate::run(&mut site, &records, HashSet::new(), &MigrateOptions::default())
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(site.create_calls, vec!["Red Shoes"]);
    assert_eq!(report.outcomes[0].status, RecordStatus::Created);
    assert_eq!(
        report.outcomes[1].status,
        RecordStatus::Skipped(SkipReason::NoName)
    );
}
