/*!
Structured operation reports.

Reports are the response payload of a maintenance run. Callers distinguish
"fully succeeded", "partially succeeded", and "aborted" programmatically
from the status enums rather than by parsing the human-readable summary.
*/

use serde::Serialize;

use crate::backup::BackupRecord;
use crate::value::Row;

/// A single row-level failure recorded during a best-effort loop.
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    /// The row's key attributes, as far as they could be determined.
    pub key: Row,
    pub error: String,
}

/// Overall outcome of a multi-table run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    PartiallySucceeded,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::PartiallySucceeded => "partially succeeded",
            RunStatus::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Outcome of one table's purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Backup taken, every matching row deleted
    Purged,
    /// Backup taken, scan completed, but some deletes failed
    PurgedWithRowFailures,
    /// Processing stopped before completing: missing table, rejected
    /// backup, or a broken scan
    Aborted,
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TableStatus::Purged => "purged",
            TableStatus::PurgedWithRowFailures => "purged with row failures",
            TableStatus::Aborted => "aborted",
        };
        f.write_str(text)
    }
}

/// Per-table purge result.
#[derive(Debug, Clone, Serialize)]
pub struct TablePurgeOutcome {
    pub table: String,
    pub status: TableStatus,
    /// The accepted backup; present whenever deletion was reached.
    pub backup: Option<BackupRecord>,
    pub rows_scanned: u64,
    pub rows_deleted: u64,
    pub row_failures: Vec<RowFailure>,
    /// The failure that aborted this table, when `status` is `Aborted`.
    pub error: Option<String>,
}

impl TablePurgeOutcome {
    pub(crate) fn started(table: &str) -> Self {
        Self {
            table: table.to_string(),
            status: TableStatus::Aborted,
            backup: None,
            rows_scanned: 0,
            rows_deleted: 0,
            row_failures: Vec::new(),
            error: None,
        }
    }
}

/// Report for a whole purge invocation, one entry per requested table.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub tables: Vec<TablePurgeOutcome>,
}

impl PurgeReport {
    pub fn status(&self) -> RunStatus {
        let aborted = self
            .tables
            .iter()
            .filter(|t| t.status == TableStatus::Aborted)
            .count();
        let clean = self
            .tables
            .iter()
            .filter(|t| t.status == TableStatus::Purged)
            .count();

        if aborted == self.tables.len() {
            RunStatus::Failed
        } else if clean == self.tables.len() {
            RunStatus::Succeeded
        } else {
            RunStatus::PartiallySucceeded
        }
    }

    pub fn rows_deleted(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_deleted).sum()
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        match self.status() {
            RunStatus::Succeeded => format!(
                "Successfully deleted {} row(s) across {} table(s); backups stored before deletion.",
                self.rows_deleted(),
                self.tables.len()
            ),
            status => {
                let failing: Vec<&str> = self
                    .tables
                    .iter()
                    .filter(|t| t.status != TableStatus::Purged)
                    .map(|t| t.table.as_str())
                    .collect();
                format!(
                    "Purge {}: {} row(s) deleted; tables with failures: {}.",
                    match status {
                        RunStatus::PartiallySucceeded => "partially succeeded",
                        _ => "failed",
                    },
                    self.rows_deleted(),
                    failing.join(", ")
                )
            }
        }
    }
}

/// Report for a reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub source: String,
    pub target: String,
    pub source_rows: u64,
    pub target_rows: u64,
    pub rows_copied: u64,
    pub row_failures: Vec<RowFailure>,
}

impl ReconcileReport {
    pub fn status(&self) -> RunStatus {
        if self.row_failures.is_empty() {
            RunStatus::Succeeded
        } else {
            RunStatus::PartiallySucceeded
        }
    }

    pub fn summary(&self) -> String {
        match self.status() {
            RunStatus::Succeeded => format!(
                "Copied {} row(s) missing from '{}' out of {} in '{}'.",
                self.rows_copied, self.target, self.source_rows, self.source
            ),
            _ => format!(
                "Copied {} row(s) into '{}'; {} row(s) failed.",
                self.rows_copied,
                self.target,
                self.row_failures.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: TableStatus) -> TablePurgeOutcome {
        TablePurgeOutcome {
            status,
            ..TablePurgeOutcome::started("t")
        }
    }

    #[test]
    fn test_purge_run_status() {
        let report = PurgeReport {
            tables: vec![outcome(TableStatus::Purged), outcome(TableStatus::Purged)],
        };
        assert_eq!(report.status(), RunStatus::Succeeded);

        let report = PurgeReport {
            tables: vec![outcome(TableStatus::Purged), outcome(TableStatus::Aborted)],
        };
        assert_eq!(report.status(), RunStatus::PartiallySucceeded);

        let report = PurgeReport {
            tables: vec![
                outcome(TableStatus::Purged),
                outcome(TableStatus::PurgedWithRowFailures),
            ],
        };
        assert_eq!(report.status(), RunStatus::PartiallySucceeded);

        let report = PurgeReport {
            tables: vec![outcome(TableStatus::Aborted)],
        };
        assert_eq!(report.status(), RunStatus::Failed);
    }

    #[test]
    fn test_reconcile_status_reflects_row_failures() {
        let mut report = ReconcileReport {
            source: "a".to_string(),
            target: "b".to_string(),
            source_rows: 3,
            target_rows: 2,
            rows_copied: 1,
            row_failures: Vec::new(),
        };
        assert_eq!(report.status(), RunStatus::Succeeded);

        report.row_failures.push(RowFailure {
            key: Row::new(),
            error: "put rejected".to_string(),
        });
        assert_eq!(report.status(), RunStatus::PartiallySucceeded);
    }
}
