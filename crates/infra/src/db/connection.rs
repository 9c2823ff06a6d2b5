//! The single shared SQLite connection.
//!
//! ## Thread Safety
//!
//! `ConnectionProvider` is `Send + Sync`. The connection sits behind a mutex, so
//! at most one unit of work uses it at a time; every other caller blocks until
//! the current one commits or rolls back.
//!
//! ## Blocking
//!
//! SQLx is async. The provider owns a private current-thread Tokio runtime and
//! drives each unit of work to completion with `block_on`, so every call blocks
//! the calling thread. Calls made from inside another Tokio runtime fail with
//! `StorageError::Connection` before touching the connection; use
//! `spawn_blocking` or a dedicated thread instead.

use std::str::FromStr;
use std::sync::Mutex;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use super::error::{map_sqlx_error, StorageError};
use super::schema;
use crate::config::{DatabaseLocation, StorageConfig};

/// Opens and holds the one physical connection used by the repository.
#[derive(Debug)]
pub struct ConnectionProvider {
    location: DatabaseLocation,
    runtime: Runtime,
    connection: Mutex<Option<SqliteConnection>>,
}

impl ConnectionProvider {
    /// Open the configured database and bring its schema up to date.
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        ensure_blocking_context("connect")?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::Connection(format!("failed to start storage runtime: {e}")))?;

        let options = match &config.location {
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StorageError::Connection(format!(
                            "failed to create database directory {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
            }
            DatabaseLocation::InMemory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| map_sqlx_error("configure_connection", e))?,
        }
        .foreign_keys(true);

        let connection = runtime.block_on(async {
            let mut conn = options
                .connect()
                .await
                .map_err(|e| map_sqlx_error("connect", e))?;
            schema::apply(&mut conn).await?;
            Ok::<_, StorageError>(conn)
        })?;

        info!(location = %config.location, "opened location plan database");

        Ok(Self {
            location: config.location.clone(),
            runtime,
            connection: Mutex::new(Some(connection)),
        })
    }

    /// Open a private in-memory database (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(&StorageConfig::in_memory())
    }

    /// Where the database lives, for diagnostics.
    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    pub fn is_open(&self) -> bool {
        self.connection
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Close the connection. Later calls fail with `StorageError::Closed`.
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<(), StorageError> {
        ensure_blocking_context("close_connection")?;
        let taken = self
            .connection
            .lock()
            .map_err(|_| StorageError::Connection("connection lock poisoned".to_string()))?
            .take();

        match taken {
            Some(conn) => {
                self.runtime
                    .block_on(conn.close())
                    .map_err(|e| map_sqlx_error("close_connection", e))?;
                info!(location = %self.location, "closed location plan database");
            }
            None => debug!(location = %self.location, "connection already closed"),
        }
        Ok(())
    }

    /// Run `f` with exclusive access to the connection and the runtime that drives it.
    pub(crate) fn with_connection<T>(
        &self,
        f: impl FnOnce(&Runtime, &mut SqliteConnection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        // Checked before locking so a misplaced call cannot wedge the mutex.
        ensure_blocking_context("use_connection")?;
        let mut guard = self.connection.lock().map_err(|_| {
            warn!("connection lock poisoned");
            StorageError::Connection("connection lock poisoned".to_string())
        })?;
        let conn = guard.as_mut().ok_or(StorageError::Closed)?;
        f(&self.runtime, conn)
    }
}

/// `block_on` panics when nested inside a runtime; fail with an error instead.
fn ensure_blocking_context(operation: &str) -> Result<(), StorageError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        warn!(operation, "blocking storage call made from inside an async runtime");
        return Err(StorageError::Connection(format!(
            "{operation}: blocking storage call made inside an async runtime; use spawn_blocking"
        )));
    }
    Ok(())
}
