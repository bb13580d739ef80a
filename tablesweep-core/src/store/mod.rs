/*!
Store capability interface and its implementations.

This module defines the narrow slice of the table store the engines need
(port) and the concrete backends (adapters). The engines never see an SDK
type; the DynamoDB adapter converts at the call boundary, and the in-memory
store backs tests and dry runs without any network.
*/

#[cfg(feature = "dynamo")]
pub mod dynamo;
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::predicate::FilterPredicate;
use crate::value::{KeySchema, Row};

/// Opaque continuation token returned by a partial scan.
///
/// Carried verbatim into the next `scan_page` call; its internal shape is
/// an adapter concern.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanToken(pub(crate) Row);

/// One page of a table scan.
#[derive(Debug, Clone)]
pub struct ScanPage {
    /// Rows matching the predicate within this page. May be empty even
    /// when `next` is present: the store filters after pagination.
    pub rows: Vec<Row>,
    /// Token for the next page; absence signals traversal completion.
    pub next: Option<ScanToken>,
}

/// Handle returned by the store once a backup request is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupHandle {
    /// Store-assigned backup identifier, when the store reports one.
    pub backup_id: Option<String>,
}

/// The store operations the maintenance engines require.
///
/// Constructed once at process start and passed by reference into every
/// component, so any backend (including an in-memory fake) can stand in.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Fetch the key schema identifying rows of `table`.
    async fn describe_key_schema(&self, table: &str) -> Result<KeySchema, StoreError>;

    /// Request a full point-in-time backup of `table` under `backup_name`.
    ///
    /// Returns once the store has accepted the request; acceptance, not
    /// completion, is the contract.
    async fn create_backup(&self, table: &str, backup_name: &str)
        -> Result<BackupHandle, StoreError>;

    /// Fetch one page of a table scan, optionally filtered, resuming from
    /// `token` when present.
    async fn scan_page(
        &self,
        table: &str,
        predicate: Option<&FilterPredicate>,
        token: Option<&ScanToken>,
    ) -> Result<ScanPage, StoreError>;

    /// Delete the row identified by `key` (the key-schema sub-row).
    async fn delete_by_key(&self, table: &str, key: &Row) -> Result<(), StoreError>;

    /// Insert or overwrite `row` in `table`.
    async fn put_row(&self, table: &str, row: &Row) -> Result<(), StoreError>;
}

#[cfg(feature = "dynamo")]
pub use dynamo::DynamoStore;
pub use memory::{MemoryBackup, MemoryStore, StoreOp};
