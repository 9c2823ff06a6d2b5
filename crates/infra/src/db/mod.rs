//! SQLite plumbing: connection, schema, transactions and error mapping.

pub mod connection;
pub mod error;
mod schema;
pub mod unit_of_work;

pub use connection::ConnectionProvider;
pub use error::StorageError;
pub use unit_of_work::UnitOfWork;
