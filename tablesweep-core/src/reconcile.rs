/*!
Reconcile engine: key-based set difference between two tables.

Loads both tables completely, finds the source rows whose key attribute
value is absent from the target, and writes them into the target. Working
memory is proportional to the size of both tables; that boundary is
accepted for the moderately sized tables this tool maintains.
*/

use std::collections::HashSet;

use tracing::{info, warn};

use crate::error::{Result, SweepError};
use crate::report::{ReconcileReport, RowFailure};
use crate::scanner;
use crate::store::StoreClient;
use crate::value::{AttrValue, Row};

/// Executes reconcile invocations against a store.
pub struct ReconcileEngine<C: StoreClient> {
    store: C,
}

impl<C: StoreClient> ReconcileEngine<C> {
    pub fn new(store: C) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// Consume the engine and hand the store back.
    pub fn into_store(self) -> C {
        self.store
    }

    /// Copy every row of `source` whose `key_attribute` value is absent
    /// from `target` into `target`.
    ///
    /// Rows already present in the target (by key) are left untouched; no
    /// non-key attributes are compared or merged. Per-row put failures are
    /// recorded in the report and do not stop the run.
    ///
    /// # Errors
    /// `ReconcileFailed` if either table's full load breaks mid-scan.
    /// Puts already committed before the failure remain; the operation is
    /// not transactional.
    pub async fn reconcile(
        &self,
        source: &str,
        target: &str,
        key_attribute: &str,
    ) -> Result<ReconcileReport> {
        let source_rows = scanner::scan_to_vec(&self.store, source, None)
            .await
            .map_err(as_reconcile_failure)?;
        let target_rows = scanner::scan_to_vec(&self.store, target, None)
            .await
            .map_err(as_reconcile_failure)?;

        let target_keys: HashSet<&AttrValue> = target_rows
            .iter()
            .filter_map(|row| row.get(key_attribute))
            .collect();

        let mut report = ReconcileReport {
            source: source.to_string(),
            target: target.to_string(),
            source_rows: source_rows.len() as u64,
            target_rows: target_rows.len() as u64,
            rows_copied: 0,
            row_failures: Vec::new(),
        };

        for row in &source_rows {
            let Some(key_value) = row.get(key_attribute) else {
                report.row_failures.push(RowFailure {
                    key: Row::new(),
                    error: format!("source row is missing key attribute '{key_attribute}'"),
                });
                continue;
            };
            if target_keys.contains(key_value) {
                continue;
            }

            match self.store.put_row(target, row).await {
                Ok(()) => report.rows_copied += 1,
                Err(cause) => {
                    let err = SweepError::PutFailed {
                        table: target.to_string(),
                        cause,
                    };
                    warn!(table = %target, error = %err, "Row put failed, continuing");
                    let mut key = Row::new();
                    key.insert(key_attribute.to_string(), key_value.clone());
                    report.row_failures.push(RowFailure {
                        key,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            source = %source,
            target = %target,
            rows_copied = report.rows_copied,
            failures = report.row_failures.len(),
            "Reconcile finished"
        );
        Ok(report)
    }
}

fn as_reconcile_failure(err: SweepError) -> SweepError {
    match err {
        SweepError::ScanFailed { table, cause } => SweepError::ReconcileFailed { table, cause },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RunStatus;
    use crate::store::MemoryStore;
    use crate::value::KeySchema;

    fn row(id: u32, note: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), AttrValue::N(id.to_string()));
        row.insert("note".to_string(), AttrValue::S(note.to_string()));
        row
    }

    fn two_tables() -> MemoryStore {
        let store = MemoryStore::with_page_size(1);
        store.create_table("table1", KeySchema::hash_key("id"));
        store.create_table("table2", KeySchema::hash_key("id"));
        store.insert("table1", row(1, "t1-original")).unwrap();
        store.insert("table1", row(2, "t1-original")).unwrap();
        store.insert("table2", row(2, "t2-copy")).unwrap();
        store.insert("table2", row(3, "t2-copy")).unwrap();
        store
    }

    #[tokio::test]
    async fn test_copies_rows_missing_from_target() {
        let engine = ReconcileEngine::new(two_tables());
        let report = engine.reconcile("table2", "table1", "id").await.unwrap();

        assert_eq!(report.status(), RunStatus::Succeeded);
        assert_eq!(report.source_rows, 2);
        assert_eq!(report.target_rows, 2);
        assert_eq!(report.rows_copied, 1);

        let target = engine.store().rows("table1").unwrap();
        assert_eq!(target.len(), 3);

        // The source is never written to.
        assert_eq!(engine.store().rows("table2").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_existing_target_rows_are_untouched() {
        let engine = ReconcileEngine::new(two_tables());
        engine.reconcile("table2", "table1", "id").await.unwrap();

        let target = engine.store().rows("table1").unwrap();
        let kept = target
            .iter()
            .find(|r| r["id"] == AttrValue::N("2".to_string()))
            .unwrap();
        // Row 2 existed in both tables with different payloads; the
        // target's version wins because present keys are never overwritten.
        assert_eq!(kept["note"], AttrValue::S("t1-original".to_string()));

        let copied = target
            .iter()
            .find(|r| r["id"] == AttrValue::N("3".to_string()))
            .unwrap();
        assert_eq!(copied["note"], AttrValue::S("t2-copy".to_string()));
    }

    #[tokio::test]
    async fn test_target_keys_cover_source_after_run() {
        let engine = ReconcileEngine::new(two_tables());
        engine.reconcile("table2", "table1", "id").await.unwrap();

        let source_keys: std::collections::HashSet<AttrValue> = engine
            .store()
            .rows("table2")
            .unwrap()
            .iter()
            .map(|r| r["id"].clone())
            .collect();
        let target_keys: std::collections::HashSet<AttrValue> = engine
            .store()
            .rows("table1")
            .unwrap()
            .iter()
            .map(|r| r["id"].clone())
            .collect();
        assert!(target_keys.is_superset(&source_keys));
    }

    #[tokio::test]
    async fn test_put_failures_are_recorded_not_fatal() {
        let store = two_tables();
        store.fail_puts("table1");

        let engine = ReconcileEngine::new(store);
        let report = engine.reconcile("table2", "table1", "id").await.unwrap();

        assert_eq!(report.status(), RunStatus::PartiallySucceeded);
        assert_eq!(report.rows_copied, 0);
        assert_eq!(report.row_failures.len(), 1);
        assert!(report.row_failures[0].error.contains("put failed"));
        assert_eq!(
            report.row_failures[0].key["id"],
            AttrValue::N("3".to_string())
        );
    }

    #[tokio::test]
    async fn test_scan_failure_aborts_whole_run() {
        let store = two_tables();
        store.fail_scan_after("table2", 0);

        let engine = ReconcileEngine::new(store);
        let err = engine.reconcile("table2", "table1", "id").await.unwrap_err();
        match err {
            SweepError::ReconcileFailed { table, .. } => assert_eq!(table, "table2"),
            other => panic!("expected ReconcileFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_source_row_without_key_attribute_is_recorded() {
        let store = two_tables();
        let mut keyless = Row::new();
        keyless.insert("id".to_string(), AttrValue::N("9".to_string()));
        store.insert("table2", keyless).unwrap();

        let engine = ReconcileEngine::new(store);
        // Reconcile on an attribute most rows carry but row 9 lacks.
        let report = engine.reconcile("table2", "table1", "note").await.unwrap();

        assert_eq!(report.row_failures.len(), 1);
        assert!(report.row_failures[0].error.contains("missing key attribute"));
    }
}
