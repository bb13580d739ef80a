/*!
In-memory store implementation.

Backs unit and integration tests without any network, and doubles as a
dry-run target. Tables keep their rows ordered by a canonical encoding of
the key sub-row, so continuation tokens survive concurrent deletes the way
the real store's key-based tokens do. Every call is recorded in an
operation log so tests can assert call ordering (notably backup-before-
delete).
*/

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound::{Excluded, Unbounded};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BackupHandle, ScanPage, ScanToken, StoreClient};
use crate::error::StoreError;
use crate::predicate::FilterPredicate;
use crate::value::{KeySchema, Row};

/// One recorded store call, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    DescribeKeySchema { table: String },
    CreateBackup { table: String, name: String },
    ScanPage { table: String },
    DeleteByKey { table: String },
    PutRow { table: String },
}

/// A stored backup: the table's rows frozen at request time.
#[derive(Debug, Clone)]
pub struct MemoryBackup {
    pub table: String,
    pub name: String,
    pub rows: Vec<Row>,
}

struct TableData {
    key_schema: KeySchema,
    // canonical key encoding -> row, iterated in key order for scans
    rows: BTreeMap<String, Row>,
}

#[derive(Default)]
struct Faults {
    backup_tables: HashSet<String>,
    delete_tables: HashSet<String>,
    put_tables: HashSet<String>,
    // fail a table's scan once this many pages have been served
    scan_after: HashMap<String, usize>,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, TableData>,
    backups: Vec<MemoryBackup>,
    ops: Vec<StoreOp>,
    scans_served: HashMap<String, usize>,
    faults: Faults,
}

/// In-memory table store.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(100)
    }

    /// A store whose scans return at most `page_size` raw rows per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            page_size: page_size.max(1),
        }
    }

    pub fn create_table<S: Into<String>>(&self, name: S, key_schema: KeySchema) {
        let mut inner = self.inner.lock().unwrap();
        inner.tables.insert(
            name.into(),
            TableData {
                key_schema,
                rows: BTreeMap::new(),
            },
        );
    }

    /// Seed a row directly, bypassing the capability interface.
    pub fn insert(&self, table: &str, row: Row) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let data = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let encoded = encode_row_key(&data.key_schema, &row)?;
        data.rows.insert(encoded, row);
        Ok(())
    }

    /// Current rows of a table, in scan order. `None` if the table does not exist.
    pub fn rows(&self, table: &str) -> Option<Vec<Row>> {
        let inner = self.inner.lock().unwrap();
        inner
            .tables
            .get(table)
            .map(|data| data.rows.values().cloned().collect())
    }

    pub fn backups(&self) -> Vec<MemoryBackup> {
        self.inner.lock().unwrap().backups.clone()
    }

    pub fn backup_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .backups
            .iter()
            .map(|b| b.name.clone())
            .collect()
    }

    /// Every store call issued so far, in order.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.inner.lock().unwrap().ops.clone()
    }

    pub fn fail_backups(&self, table: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.faults.backup_tables.insert(table.to_string());
    }

    pub fn fail_deletes(&self, table: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.faults.delete_tables.insert(table.to_string());
    }

    pub fn fail_puts(&self, table: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.faults.put_tables.insert(table.to_string());
    }

    /// Fail a table's scan once `pages` pages have been served.
    pub fn fail_scan_after(&self, table: &str, pages: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.faults.scan_after.insert(table.to_string(), pages);
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn describe_key_schema(&self, table: &str) -> Result<KeySchema, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(StoreOp::DescribeKeySchema {
            table: table.to_string(),
        });
        inner
            .tables
            .get(table)
            .map(|data| data.key_schema.clone())
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    async fn create_backup(
        &self,
        table: &str,
        backup_name: &str,
    ) -> Result<BackupHandle, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(StoreOp::CreateBackup {
            table: table.to_string(),
            name: backup_name.to_string(),
        });
        if inner.faults.backup_tables.contains(table) {
            return Err(StoreError::service("injected backup failure"));
        }
        let rows: Vec<Row> = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?
            .rows
            .values()
            .cloned()
            .collect();
        inner.backups.push(MemoryBackup {
            table: table.to_string(),
            name: backup_name.to_string(),
            rows,
        });
        Ok(BackupHandle {
            backup_id: Some(backup_name.to_string()),
        })
    }

    async fn scan_page(
        &self,
        table: &str,
        predicate: Option<&FilterPredicate>,
        token: Option<&ScanToken>,
    ) -> Result<ScanPage, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(StoreOp::ScanPage {
            table: table.to_string(),
        });

        let served = inner.scans_served.entry(table.to_string()).or_insert(0);
        let page_number = *served;
        *served += 1;
        if let Some(&limit) = inner.faults.scan_after.get(table) {
            if page_number >= limit {
                return Err(StoreError::service("injected scan failure"));
            }
        }

        let data = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let start = match token {
            Some(t) => Some(encode_row_key(&data.key_schema, &t.0)?),
            None => None,
        };
        let range = match &start {
            Some(after) => data.rows.range((Excluded(after.clone()), Unbounded)),
            None => data.rows.range::<String, _>(..),
        };

        // Take one extra element to decide whether a continuation token is due.
        let mut window: Vec<&Row> = range.map(|(_, row)| row).take(self.page_size + 1).collect();
        let has_more = window.len() > self.page_size;
        window.truncate(self.page_size);

        // The filter applies after pagination: a page can match nothing and
        // still carry a token.
        let rows: Vec<Row> = window
            .iter()
            .filter(|row| predicate.map_or(true, |p| p.matches(row)))
            .map(|row| (*row).clone())
            .collect();

        let next = if has_more {
            let last = window
                .last()
                .and_then(|row| data.key_schema.extract(row))
                .ok_or_else(|| StoreError::service("scanned row is missing a key attribute"))?;
            Some(ScanToken(last))
        } else {
            None
        };

        Ok(ScanPage { rows, next })
    }

    async fn delete_by_key(&self, table: &str, key: &Row) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(StoreOp::DeleteByKey {
            table: table.to_string(),
        });
        if inner.faults.delete_tables.contains(table) {
            return Err(StoreError::service("injected delete failure"));
        }
        let data = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let encoded = encode_row_key(&data.key_schema, key)?;
        // Deleting an absent row is not an error, matching the store's
        // idempotent delete semantics.
        data.rows.remove(&encoded);
        Ok(())
    }

    async fn put_row(&self, table: &str, row: &Row) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(StoreOp::PutRow {
            table: table.to_string(),
        });
        if inner.faults.put_tables.contains(table) {
            return Err(StoreError::service("injected put failure"));
        }
        let data = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let encoded = encode_row_key(&data.key_schema, row)?;
        data.rows.insert(encoded, row.clone());
        Ok(())
    }
}

/// Canonical, order-independent encoding of a row's key attributes.
fn encode_row_key(schema: &KeySchema, row: &Row) -> Result<String, StoreError> {
    let key = schema
        .extract(row)
        .ok_or_else(|| StoreError::service("row is missing a key schema attribute"))?;
    let sorted: BTreeMap<&String, &crate::value::AttrValue> = key.iter().collect();
    serde_json::to_string(&sorted).map_err(|e| StoreError::service(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttrValue;

    fn row(id: u32) -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), AttrValue::N(id.to_string()));
        row
    }

    fn seeded_store(page_size: usize, count: u32) -> MemoryStore {
        let store = MemoryStore::with_page_size(page_size);
        store.create_table("t", KeySchema::hash_key("id"));
        for i in 0..count {
            store.insert("t", row(i)).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_scan_paginates_with_tokens() {
        let store = seeded_store(2, 5);

        let first = store.scan_page("t", None, None).await.unwrap();
        assert_eq!(first.rows.len(), 2);
        let token = first.next.expect("more pages expected");

        let second = store.scan_page("t", None, Some(&token)).await.unwrap();
        assert_eq!(second.rows.len(), 2);

        let third = store
            .scan_page("t", None, second.next.as_ref())
            .await
            .unwrap();
        assert_eq!(third.rows.len(), 1);
        assert!(third.next.is_none());
    }

    #[tokio::test]
    async fn test_tokens_survive_deletes_between_pages() {
        let store = seeded_store(2, 4);

        let first = store.scan_page("t", None, None).await.unwrap();
        let token = first.next.clone().unwrap();
        for r in &first.rows {
            store.delete_by_key("t", r).await.unwrap();
        }

        let second = store.scan_page("t", None, Some(&token)).await.unwrap();
        assert_eq!(second.rows.len(), 2);

        let mut seen: Vec<Row> = first.rows;
        seen.extend(second.rows);
        assert_eq!(seen.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_table_errors() {
        let store = MemoryStore::new();
        let err = store.describe_key_schema("nope").await.unwrap_err();
        assert_eq!(err, StoreError::TableNotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn test_backup_freezes_rows() {
        let store = seeded_store(10, 3);
        store.create_backup("t", "t-123").await.unwrap();
        store.delete_by_key("t", &row(0)).await.unwrap();

        let backups = store.backups();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].rows.len(), 3);
        assert_eq!(store.rows("t").unwrap().len(), 2);
    }
}
