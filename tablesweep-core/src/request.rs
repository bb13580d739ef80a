/*!
Invocation surface: wire request forms and their validated plans.

Requests arrive the way the hosting surface delivers them: comma-separated,
positionally aligned lists, optionally as a JSON body with camelCase keys.
Validation turns them into typed plans before any store call is made;
anything wrong with the shape of the request is `MalformedRequest`.
*/

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::predicate::FilterPredicate;

/// Wire form of a purge request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeRequest {
    /// Comma-separated table names
    pub table_names: String,
    /// Comma-separated attribute names, aligned with types and values
    pub attribute_names: String,
    /// Comma-separated attribute type tags (S, N, B, BOOL)
    pub attribute_types: String,
    /// Comma-separated attribute literals
    pub attribute_values: String,
}

/// Validated purge plan: the tables to process, in order, and the shared
/// predicate.
#[derive(Debug, Clone)]
pub struct PurgePlan {
    pub tables: Vec<String>,
    pub predicate: FilterPredicate,
}

impl PurgeRequest {
    /// Parse the JSON body shape (`{"tableNames": "...", ...}`).
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| SweepError::malformed(format!("invalid purge request body: {e}")))
    }

    /// Validate the request and build the plan.
    ///
    /// # Errors
    /// `MalformedRequest` if no table is named, any list item is blank, or
    /// the three attribute lists fail the predicate invariants (unequal
    /// lengths, zero terms, duplicate names, unknown type tags).
    pub fn into_plan(self) -> Result<PurgePlan> {
        let mut tables = Vec::new();
        for name in split_csv(&self.table_names) {
            if name.is_empty() {
                return Err(SweepError::malformed("blank table name in tableNames"));
            }
            // A table backed up and purged twice in one invocation would
            // also collide on its backup name; keep first occurrence.
            if !tables.contains(&name) {
                tables.push(name);
            }
        }
        if tables.is_empty() {
            return Err(SweepError::malformed("at least one table name is required"));
        }

        let predicate = FilterPredicate::from_parallel(
            &split_csv(&self.attribute_names),
            &split_csv(&self.attribute_types),
            &split_csv(&self.attribute_values),
        )?;

        Ok(PurgePlan { tables, predicate })
    }
}

/// Wire form of a reconcile request.
///
/// Field naming follows the hosting surface: `table1` is the table that
/// receives rows it is missing, `table2` the reference source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub table1: String,
    pub table2: String,
    pub key: String,
}

/// Validated reconcile plan with explicit direction.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    pub source: String,
    pub target: String,
    pub key_attribute: String,
}

impl ReconcileRequest {
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| SweepError::malformed(format!("invalid reconcile request body: {e}")))
    }

    pub fn into_plan(self) -> Result<ReconcilePlan> {
        let table1 = self.table1.trim().to_string();
        let table2 = self.table2.trim().to_string();
        let key = self.key.trim().to_string();
        if table1.is_empty() || table2.is_empty() {
            return Err(SweepError::malformed("table1 and table2 are both required"));
        }
        if key.is_empty() {
            return Err(SweepError::malformed("key attribute is required"));
        }
        Ok(ReconcilePlan {
            source: table2,
            target: table1,
            key_attribute: key,
        })
    }
}

fn split_csv(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split(',').map(|s| s.trim().to_string()).collect()
}
