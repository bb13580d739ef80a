/*!
Purge engine: backup, scan, delete.

For each requested table, in order: fetch the key schema, take a backup,
scan with the shared predicate, and delete every yielded row by key.
Tables are processed independently; a failure in one never blocks the
others. Within a table, backup acceptance strictly precedes the first
delete, enforced by control flow.
*/

use futures::{pin_mut, StreamExt};
use tracing::{info, warn};

use crate::backup::BackupCoordinator;
use crate::error::{StoreError, SweepError};
use crate::predicate::FilterPredicate;
use crate::report::{PurgeReport, RowFailure, TablePurgeOutcome, TableStatus};
use crate::scanner;
use crate::store::StoreClient;
use crate::value::Row;

/// Executes purge invocations against a store.
pub struct PurgeEngine<C: StoreClient> {
    store: C,
    backups: BackupCoordinator,
}

impl<C: StoreClient> PurgeEngine<C> {
    pub fn new(store: C) -> Self {
        Self {
            store,
            backups: BackupCoordinator::new(),
        }
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// Consume the engine and hand the store back.
    pub fn into_store(self) -> C {
        self.store
    }

    /// Purge every row matching `predicate` from each table, taking a
    /// backup per table first.
    ///
    /// Re-running with an identical predicate is safe: only rows that
    /// still match are scanned and deleted, and timestamped backup names
    /// never overwrite an earlier backup.
    pub async fn purge(&self, tables: &[String], predicate: &FilterPredicate) -> PurgeReport {
        let mut outcomes = Vec::with_capacity(tables.len());
        for table in tables {
            let outcome = self.purge_table(table, predicate).await;
            info!(
                table = %table,
                status = ?outcome.status,
                rows_deleted = outcome.rows_deleted,
                "Table purge finished"
            );
            outcomes.push(outcome);
        }
        PurgeReport { tables: outcomes }
    }

    async fn purge_table(&self, table: &str, predicate: &FilterPredicate) -> TablePurgeOutcome {
        let mut outcome = TablePurgeOutcome::started(table);

        let key_schema = match self.store.describe_key_schema(table).await {
            Ok(schema) => schema,
            Err(StoreError::TableNotFound(_)) => {
                outcome.error = Some(SweepError::TableNotFound(table.to_string()).to_string());
                return outcome;
            }
            Err(cause) => {
                outcome.error = Some(format!("failed to read key schema: {cause}"));
                return outcome;
            }
        };

        // The backup must be accepted before the first delete is issued.
        match self.backups.backup(&self.store, table).await {
            Ok(record) => outcome.backup = Some(record),
            Err(e) => {
                outcome.error = Some(e.to_string());
                return outcome;
            }
        }

        let rows = scanner::scan(&self.store, table, Some(predicate));
        pin_mut!(rows);
        while let Some(item) = rows.next().await {
            let row = match item {
                Ok(row) => row,
                Err(e) => {
                    // A broken pagination sequence cannot be resumed from
                    // an arbitrary midpoint; stop deleting.
                    outcome.error = Some(e.to_string());
                    return outcome;
                }
            };
            outcome.rows_scanned += 1;

            let Some(key) = key_schema.extract(&row) else {
                outcome.row_failures.push(RowFailure {
                    key: Row::new(),
                    error: "row is missing a key schema attribute".to_string(),
                });
                continue;
            };

            match self.store.delete_by_key(table, &key).await {
                Ok(()) => outcome.rows_deleted += 1,
                Err(cause) => {
                    let err = SweepError::DeleteFailed {
                        table: table.to_string(),
                        cause,
                    };
                    warn!(table = %table, error = %err, "Row delete failed, continuing");
                    outcome.row_failures.push(RowFailure {
                        key,
                        error: err.to_string(),
                    });
                }
            }
        }

        outcome.status = if outcome.row_failures.is_empty() {
            TableStatus::Purged
        } else {
            TableStatus::PurgedWithRowFailures
        };
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RunStatus;
    use crate::store::{MemoryStore, StoreOp};
    use crate::value::{AttrValue, KeySchema};

    fn order(id: &str, status: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), AttrValue::S(id.to_string()));
        row.insert("status".to_string(), AttrValue::S(status.to_string()));
        row
    }

    fn cancelled_predicate() -> FilterPredicate {
        FilterPredicate::from_parallel(
            &["status".to_string()],
            &["S".to_string()],
            &["cancelled".to_string()],
        )
        .unwrap()
    }

    fn orders_store() -> MemoryStore {
        let store = MemoryStore::with_page_size(2);
        store.create_table("Orders", KeySchema::hash_key("id"));
        store.insert("Orders", order("a", "cancelled")).unwrap();
        store.insert("Orders", order("b", "active")).unwrap();
        store.insert("Orders", order("c", "cancelled")).unwrap();
        store.insert("Orders", order("d", "shipped")).unwrap();
        store.insert("Orders", order("e", "cancelled")).unwrap();
        store
    }

    #[tokio::test]
    async fn test_purge_removes_only_matching_rows_after_backup() {
        let engine = PurgeEngine::new(orders_store());
        let report = engine
            .purge(&["Orders".to_string()], &cancelled_predicate())
            .await;

        assert_eq!(report.status(), RunStatus::Succeeded);
        let outcome = &report.tables[0];
        assert_eq!(outcome.status, TableStatus::Purged);
        assert_eq!(outcome.rows_scanned, 3);
        assert_eq!(outcome.rows_deleted, 3);

        let backup = outcome.backup.as_ref().unwrap();
        assert!(backup.name.starts_with("Orders-"));

        let remaining = engine.store().rows("Orders").unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining
            .iter()
            .all(|r| r["status"] != AttrValue::S("cancelled".to_string())));
    }

    #[tokio::test]
    async fn test_no_delete_before_backup_acceptance() {
        let engine = PurgeEngine::new(orders_store());
        engine
            .purge(&["Orders".to_string()], &cancelled_predicate())
            .await;

        let ops = engine.store().operations();
        let backup_at = ops
            .iter()
            .position(|op| matches!(op, StoreOp::CreateBackup { .. }))
            .expect("backup was requested");
        let first_delete = ops
            .iter()
            .position(|op| matches!(op, StoreOp::DeleteByKey { .. }))
            .expect("deletes were issued");
        assert!(backup_at < first_delete);
    }

    #[tokio::test]
    async fn test_second_identical_run_deletes_nothing() {
        let engine = PurgeEngine::new(orders_store());
        let tables = vec!["Orders".to_string()];
        let predicate = cancelled_predicate();

        let first = engine.purge(&tables, &predicate).await;
        assert_eq!(first.rows_deleted(), 3);

        let second = engine.purge(&tables, &predicate).await;
        assert_eq!(second.status(), RunStatus::Succeeded);
        assert_eq!(second.tables[0].rows_scanned, 0);
        assert_eq!(second.tables[0].rows_deleted, 0);

        // The second run takes its own backup before scanning.
        assert_eq!(engine.store().backups().len(), 2);
    }

    #[tokio::test]
    async fn test_backup_failure_aborts_table_but_not_run() {
        let store = orders_store();
        store.create_table("Archive", KeySchema::hash_key("id"));
        store.insert("Archive", order("x", "cancelled")).unwrap();
        store.fail_backups("Orders");

        let engine = PurgeEngine::new(store);
        let report = engine
            .purge(
                &["Orders".to_string(), "Archive".to_string()],
                &cancelled_predicate(),
            )
            .await;

        assert_eq!(report.status(), RunStatus::PartiallySucceeded);

        let orders = &report.tables[0];
        assert_eq!(orders.status, TableStatus::Aborted);
        assert!(orders.error.as_ref().unwrap().contains("backup failed"));
        assert_eq!(orders.rows_deleted, 0);
        // All five Orders rows survived.
        assert_eq!(engine.store().rows("Orders").unwrap().len(), 5);

        let archive = &report.tables[1];
        assert_eq!(archive.status, TableStatus::Purged);
        assert_eq!(archive.rows_deleted, 1);

        // No delete was ever issued against the aborted table.
        assert!(!engine
            .store()
            .operations()
            .iter()
            .any(|op| matches!(op, StoreOp::DeleteByKey { table } if table == "Orders")));
    }

    #[tokio::test]
    async fn test_missing_table_is_recorded_and_skipped() {
        let engine = PurgeEngine::new(orders_store());
        let report = engine
            .purge(
                &["Ghost".to_string(), "Orders".to_string()],
                &cancelled_predicate(),
            )
            .await;

        let ghost = &report.tables[0];
        assert_eq!(ghost.status, TableStatus::Aborted);
        assert!(ghost.error.as_ref().unwrap().contains("not found"));
        assert!(ghost.backup.is_none());

        assert_eq!(report.tables[1].status, TableStatus::Purged);
    }

    #[tokio::test]
    async fn test_delete_failures_are_best_effort() {
        let store = orders_store();
        store.fail_deletes("Orders");

        let engine = PurgeEngine::new(store);
        let report = engine
            .purge(&["Orders".to_string()], &cancelled_predicate())
            .await;

        let outcome = &report.tables[0];
        assert_eq!(outcome.status, TableStatus::PurgedWithRowFailures);
        assert_eq!(outcome.rows_scanned, 3);
        assert_eq!(outcome.rows_deleted, 0);
        assert_eq!(outcome.row_failures.len(), 3);
        assert!(outcome.row_failures[0].error.contains("delete failed"));
        assert_eq!(report.status(), RunStatus::PartiallySucceeded);
    }

    #[tokio::test]
    async fn test_scan_failure_aborts_after_partial_deletes() {
        let store = orders_store();
        store.fail_scan_after("Orders", 1);

        let engine = PurgeEngine::new(store);
        let report = engine
            .purge(&["Orders".to_string()], &cancelled_predicate())
            .await;

        let outcome = &report.tables[0];
        assert_eq!(outcome.status, TableStatus::Aborted);
        assert!(outcome.error.as_ref().unwrap().contains("scan failed"));
        // The first page's match was deleted before the break; later rows
        // were left alone.
        assert_eq!(outcome.rows_deleted, 1);
        assert_eq!(engine.store().rows("Orders").unwrap().len(), 4);
    }
}
