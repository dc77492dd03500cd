//! Migration orchestrator.
//!
//! Walks the extracted records in discovery order, skips what already
//! exists at the destination, and creates the rest with a bounded retry
//! budget per record. One record's exhaustion never aborts the run; only
//! a failed pre-creation reset (an unrecoverable navigation) does.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::dest::{DestError, DestinationSite};
use crate::model::CustomResult;

/// Why a record was not created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Empty name; never eligible for comparison or creation.
    NoName,
    /// Case-insensitive name already present at the destination.
    AlreadyExists,
    /// Dry-run mode; creation suppressed.
    DryRun,
}

/// Outcome of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RecordStatus {
    Created,
    Skipped(SkipReason),
    /// Every creation attempt failed.
    Failed { attempts: u32 },
}

/// Per-record result, in source-discovery order.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub name: String,
    pub status: RecordStatus,
}

/// Summary of one orchestration pass.
#[derive(Debug, Default, Serialize)]
pub struct MigrationReport {
    pub outcomes: Vec<RecordOutcome>,
    pub created: usize,
}

impl MigrationReport {
    pub fn count(&self, status: &RecordStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == *status).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RecordStatus::Failed { .. }))
    }
}

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// End-to-end creation sequences per record before giving up.
    pub max_attempts: u32,
    /// Log every eligible record as skipped instead of creating it.
    pub dry_run: bool,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            dry_run: false,
        }
    }
}

/// Run the migration pass.
///
/// `existing` seeds the known destination names (case-folded); every
/// successful creation folds its name in immediately, so a later source
/// record with the same name is skipped within the same run.
pub async fn run<S: DestinationSite>(
    site: &mut S,
    records: &[CustomResult],
    mut existing: HashSet<String>,
    opts: &MigrateOptions,
) -> Result<MigrationReport, DestError> {
    let total = records.len();
    let mut report = MigrationReport::default();

    for (i, record) in records.iter().enumerate() {
        let position = format!("({}/{})", i + 1, total);

        if !record.has_name() {
            info!("{position} unnamed record, skipping");
            report.outcomes.push(RecordOutcome {
                name: String::new(),
                status: RecordStatus::Skipped(SkipReason::NoName),
            });
            continue;
        }

        let key = record.dedup_key();
        info!("{position} {}", record.name);

        if existing.contains(&key) {
            info!("  already exists, skipping");
            report.outcomes.push(RecordOutcome {
                name: record.name.clone(),
                status: RecordStatus::Skipped(SkipReason::AlreadyExists),
            });
            continue;
        }

        if opts.dry_run {
            info!("  dry run, not creating");
            report.outcomes.push(RecordOutcome {
                name: record.name.clone(),
                status: RecordStatus::Skipped(SkipReason::DryRun),
            });
            continue;
        }

        let status = create_with_retry(site, record, opts.max_attempts).await?;
        if status == RecordStatus::Created {
            existing.insert(key);
            report.created += 1;
            // Leave the session on the known list view. Best effort: the
            // next record's retry loop resets again before creating, and
            // after the last record there is nothing left to lose, so a
            // failure here must not discard the finished report.
            if let Err(e) = site.reset().await {
                warn!("reset after creating {:?} failed: {}", record.name, e);
            }
        }
        report.outcomes.push(RecordOutcome {
            name: record.name.clone(),
            status,
        });
    }

    Ok(report)
}

/// One record's bounded retry loop. Creation errors are absorbed and
/// retried after a reset; reset errors propagate, since no further
/// progress is possible without the known starting state.
async fn create_with_retry<S: DestinationSite>(
    site: &mut S,
    record: &CustomResult,
    max_attempts: u32,
) -> Result<RecordStatus, DestError> {
    for attempt in 1..=max_attempts {
        site.reset().await?;

        match site.create(record).await {
            Ok(()) => return Ok(RecordStatus::Created),
            Err(e) => {
                warn!(
                    "creating {:?} failed (attempt {}/{}): {}",
                    record.name, attempt, max_attempts, e
                );
            }
        }
    }

    error!(
        "giving up on {:?} after {} attempts",
        record.name, max_attempts
    );
    Ok(RecordStatus::Failed {
        attempts: max_attempts,
    })
}
