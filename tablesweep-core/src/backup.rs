/*!
Backup-before-destroy coordination.

A purge may not delete anything from a table until the store has accepted a
full backup request for it. The coordinator names the backup, issues the
request, and turns the store's acknowledgement into a durable record.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SweepError};
use crate::store::StoreClient;

/// A requested backup: table, generated name, and creation timestamp.
///
/// Created exactly once per table per purge, never mutated, retained
/// indefinitely (backup deletion is out of scope).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub table: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Store-assigned identifier, when the store reports one.
    pub backup_id: Option<String>,
}

/// Requests full table backups ahead of destructive operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct BackupCoordinator;

impl BackupCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Request a backup of `table` named `{table}-{unix_seconds}` and wait
    /// for the store to accept it.
    ///
    /// Acceptance is the safety bar: the backup need not have completed,
    /// but the store must have acknowledged it before the caller proceeds
    /// to deletion.
    ///
    /// # Errors
    /// `BackupFailed` if the store rejects the request or the table does
    /// not exist. There are no retries beyond what the store call itself
    /// provides.
    pub async fn backup<C>(&self, store: &C, table: &str) -> Result<BackupRecord>
    where
        C: StoreClient + ?Sized,
    {
        let created_at = Utc::now();
        let name = format!("{table}-{}", created_at.timestamp());

        let handle = store
            .create_backup(table, &name)
            .await
            .map_err(|cause| SweepError::backup_failed(table, cause))?;

        info!(table = %table, backup = %name, "Backup accepted by store");
        Ok(BackupRecord {
            table: table.to_string(),
            name,
            created_at,
            backup_id: handle.backup_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::value::KeySchema;

    #[tokio::test]
    async fn test_backup_name_is_table_dash_unix_seconds() {
        let store = MemoryStore::new();
        store.create_table("Orders", KeySchema::hash_key("id"));

        let record = BackupCoordinator::new().backup(&store, "Orders").await.unwrap();

        let suffix = record.name.strip_prefix("Orders-").unwrap();
        let seconds: i64 = suffix.parse().unwrap();
        assert_eq!(seconds, record.created_at.timestamp());
        assert_eq!(store.backup_names(), vec![record.name.clone()]);
        assert_eq!(record.backup_id.as_deref(), Some(record.name.as_str()));
    }

    #[tokio::test]
    async fn test_missing_table_is_backup_failed() {
        let store = MemoryStore::new();
        let err = BackupCoordinator::new().backup(&store, "ghost").await.unwrap_err();
        match err {
            SweepError::BackupFailed { table, .. } => assert_eq!(table, "ghost"),
            other => panic!("expected BackupFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_store_rejection_is_backup_failed() {
        let store = MemoryStore::new();
        store.create_table("Orders", KeySchema::hash_key("id"));
        store.fail_backups("Orders");

        let err = BackupCoordinator::new().backup(&store, "Orders").await.unwrap_err();
        assert!(matches!(err, SweepError::BackupFailed { .. }));
    }
}
