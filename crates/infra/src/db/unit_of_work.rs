//! Transactional unit of work.
//!
//! `execute` runs one closure inside one transaction on the shared connection:
//!
//! - begin
//! - run the work
//! - commit when it returns `Ok`
//! - roll back when it returns `Err` or panics, and report the failure
//!
//! Every failure is wrapped in `StorageError::Transaction` naming the unit of
//! work. A failed rollback is logged and does not replace the original error.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Connection, Sqlite, Transaction};
use tracing::{debug, warn};

use super::connection::ConnectionProvider;
use super::error::{map_sqlx_error, StorageError};

/// Runs closures atomically against the provider's connection.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    provider: Arc<ConnectionProvider>,
}

impl UnitOfWork {
    pub fn new(provider: Arc<ConnectionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<ConnectionProvider> {
        &self.provider
    }

    /// Run `work` in a transaction and return its value.
    ///
    /// The closure gets the transaction's connection. Either every statement it
    /// issued is committed or none is. Blocks the calling thread.
    pub fn execute<T, F>(&self, operation: &'static str, work: F) -> Result<T, StorageError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, StorageError>>,
    {
        self.provider
            .with_connection(|runtime, conn| {
                runtime.block_on(async move {
                    let mut tx = conn
                        .begin()
                        .await
                        .map_err(|e| map_sqlx_error("begin_transaction", e))?;

                    let outcome = AssertUnwindSafe(async { work(&mut *tx).await })
                        .catch_unwind()
                        .await;

                    match outcome {
                        Ok(Ok(value)) => {
                            tx.commit()
                                .await
                                .map_err(|e| map_sqlx_error("commit_transaction", e))?;
                            debug!(operation, "transaction committed");
                            Ok(value)
                        }
                        Ok(Err(err)) => {
                            rollback(tx, operation).await;
                            Err(err)
                        }
                        Err(payload) => {
                            rollback(tx, operation).await;
                            Err(StorageError::Panicked(panic_message(payload.as_ref())))
                        }
                    }
                })
            })
            .map_err(|err| StorageError::transaction(operation, err))
    }
}

async fn rollback(tx: Transaction<'_, Sqlite>, operation: &'static str) {
    match tx.rollback().await {
        Ok(()) => debug!(operation, "transaction rolled back"),
        Err(e) => warn!(operation, error = %e, "rollback failed"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
