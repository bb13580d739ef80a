/*!
Error types for the tablesweep core engine.
*/

use thiserror::Error;

/// Result type used throughout the tablesweep core.
pub type Result<T> = std::result::Result<T, SweepError>;

/// Errors raised by the store capability interface.
///
/// Adapters map their native failures onto these two shapes; the engines
/// wrap them with table context before surfacing them to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The named table does not exist in the store
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Any other store-side failure (service error, throttling, transport)
    #[error("{0}")]
    Service(String),
}

impl StoreError {
    /// Create a new service error
    pub fn service<S: Into<String>>(msg: S) -> Self {
        Self::Service(msg.into())
    }
}

/// Errors that can occur during maintenance operations.
#[derive(Error, Debug)]
pub enum SweepError {
    /// Caller input violated a request invariant before any store call
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The named table does not exist
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// The store rejected or failed the backup request for a table
    #[error("backup failed for table '{table}': {cause}")]
    BackupFailed { table: String, cause: StoreError },

    /// A paginated scan broke mid-traversal; the sequence cannot be resumed
    #[error("scan failed for table '{table}': {cause}")]
    ScanFailed { table: String, cause: StoreError },

    /// A single delete-by-key call failed
    #[error("delete failed for table '{table}': {cause}")]
    DeleteFailed { table: String, cause: StoreError },

    /// A single put call failed
    #[error("put failed for table '{table}': {cause}")]
    PutFailed { table: String, cause: StoreError },

    /// A reconciliation run aborted before completing both table loads
    #[error("reconcile failed while loading table '{table}': {cause}")]
    ReconcileFailed { table: String, cause: StoreError },
}

impl SweepError {
    /// Create a new malformed-request error
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedRequest(msg.into())
    }

    /// Wrap a store error with table context for a failed backup
    pub fn backup_failed<S: Into<String>>(table: S, cause: StoreError) -> Self {
        Self::BackupFailed {
            table: table.into(),
            cause,
        }
    }

    /// Wrap a store error with table context for a broken scan
    pub fn scan_failed<S: Into<String>>(table: S, cause: StoreError) -> Self {
        Self::ScanFailed {
            table: table.into(),
            cause,
        }
    }
}
