//! Storage error model and SQLx error mapping.
//!
//! ## Error Mapping
//!
//! | SQLx error                          | StorageError  |
//! |-------------------------------------|---------------|
//! | Database (unique violation)         | `Conflict`    |
//! | Database (foreign key violation)    | `Conflict`    |
//! | Database (other)                    | `Database`    |
//! | ColumnDecode / ColumnNotFound / Decode | `CorruptRow` |
//! | Io / WorkerCrashed / PoolClosed     | `Connection`  |
//! | Other                               | `Database`    |

use thiserror::Error;

/// Failure while talking to the plan store.
///
/// These are **infrastructure errors** as opposed to domain errors: they are
/// fatal for the current operation and are never retried automatically.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No location plan row matched the passport id.
    #[error("location plan not found for passport {0}")]
    NotFound(String),

    /// A constraint rejected the write (duplicate plan, duplicate litera, ...).
    #[error("conflict in {operation}: {message}")]
    Conflict {
        operation: &'static str,
        message: String,
    },

    /// Statement execution failed.
    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// A stored row could not be turned back into a valid domain value.
    #[error("corrupt stored data: {0}")]
    CorruptRow(String),

    /// Opening or using the physical connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// The connection provider was closed.
    #[error("connection is closed")]
    Closed,

    /// The unit of work panicked; the transaction was rolled back.
    #[error("unit of work panicked: {0}")]
    Panicked(String),

    /// A unit of work failed and was rolled back.
    #[error("transaction `{operation}` rolled back: {source}")]
    Transaction {
        operation: &'static str,
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    /// Wrap a failure with the name of the unit of work it aborted.
    pub fn transaction(operation: &'static str, source: StorageError) -> Self {
        Self::Transaction {
            operation,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through `Transaction` wrappers.
    pub fn root_cause(&self) -> &StorageError {
        match self {
            Self::Transaction { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Name of the aborted unit of work, if this error came out of one.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Transaction { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.root_cause(), Self::Conflict { .. })
    }
}

/// Map SQLx errors to `StorageError`.
pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
                StorageError::Conflict { operation, message }
            } else {
                StorageError::Database { operation, message }
            }
        }
        e @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)) => StorageError::CorruptRow(format!("{operation}: {e}")),
        e @ (sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed | sqlx::Error::PoolClosed) => {
            StorageError::Connection(format!("{operation}: {e}"))
        }
        other => StorageError::Database {
            operation,
            message: other.to_string(),
        },
    }
}
