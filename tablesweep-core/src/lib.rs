/*!
# Tablesweep Core Engine

Bulk maintenance engine for DynamoDB-style table stores.

This crate implements two independently invocable operations over a narrow
store capability interface:

- **Purge**: conditionally delete rows matching an attribute predicate
  across one or more tables, after the store has accepted a full backup of
  each table.
- **Reconcile**: copy rows that exist in a source table but are missing
  (by key) from a target table.

## Architecture

The engines never talk to an SDK directly. A `StoreClient` trait captures
the five store operations the tool needs (describe key schema, create
backup, scan a page, delete by key, put a row); the DynamoDB adapter and an
in-memory store implement it, so every engine is testable without a
network.

## Usage

```rust,no_run
use tablesweep_core::{DynamoStore, PurgeEngine, PurgeRequest};

# async fn run() -> Result<(), Box<dyn std::error::Error>> {
let store = DynamoStore::from_env().await?;
let engine = PurgeEngine::new(store);

let plan = PurgeRequest {
    table_names: "Orders".to_string(),
    attribute_names: "status".to_string(),
    attribute_types: "S".to_string(),
    attribute_values: "cancelled".to_string(),
}
.into_plan()?;

let report = engine.purge(&plan.tables, &plan.predicate).await;
println!("{}", report.summary());
# Ok(())
# }
```
*/

pub mod backup;
pub mod error;
pub mod predicate;
pub mod purge;
pub mod reconcile;
pub mod report;
pub mod request;
pub mod scanner;
pub mod store;
pub mod value;

pub use backup::{BackupCoordinator, BackupRecord};
pub use error::{Result, StoreError, SweepError};
pub use predicate::{EqualityTerm, FilterPredicate};
pub use purge::PurgeEngine;
pub use reconcile::ReconcileEngine;
pub use report::{
    PurgeReport, ReconcileReport, RowFailure, RunStatus, TablePurgeOutcome, TableStatus,
};
pub use request::{PurgePlan, PurgeRequest, ReconcilePlan, ReconcileRequest};
#[cfg(feature = "dynamo")]
pub use store::DynamoStore;
pub use store::{MemoryStore, StoreClient};
pub use value::{AttrValue, KeyElement, KeyRole, KeySchema, Row};
