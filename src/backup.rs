//! Backup artifacts of the extracted record set.
//!
//! Write-only outputs for audit and recovery: a pretty-printed JSON for
//! human diffing and a compact single-line copy of the same fields. The
//! tool itself never reads them back.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::model::CustomResult;

pub const BACKUP_FILE: &str = "custom_results_backup.json";
pub const SUMMARY_FILE: &str = "custom_results_summary.json";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("failed to write backup: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persist both artifacts into `dir`, returning their paths.
pub fn write_backups(
    dir: &Path,
    records: &[CustomResult],
) -> Result<(PathBuf, PathBuf), BackupError> {
    fs::create_dir_all(dir)?;

    let backup_path = dir.join(BACKUP_FILE);
    fs::write(&backup_path, serde_json::to_string_pretty(records)?)?;

    let summary_path = dir.join(SUMMARY_FILE);
    fs::write(&summary_path, serde_json::to_string(records)?)?;

    info!(
        "backed up {} records to {} and {}",
        records.len(),
        backup_path.display(),
        summary_path.display()
    );
    Ok((backup_path, summary_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchType, Term};

    #[test]
    fn writes_both_artifacts_with_ui_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![CustomResult {
            name: "Red Shoes".to_string(),
            terms: vec![Term::new("shoes", MatchType::Exact)],
            products: vec!["SKU1".to_string()],
        }];

        let (backup, summary) = write_backups(dir.path(), &records).unwrap();

        let pretty = std::fs::read_to_string(&backup).unwrap();
        assert!(pretty.contains('\n'));
        assert!(pretty.contains("\"match\": \"Exact Match\""));

        let compact: Vec<CustomResult> =
            serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
        assert_eq!(compact, records);
    }
}
