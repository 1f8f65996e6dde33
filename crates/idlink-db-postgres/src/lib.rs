//! PostgreSQL contact store backend.
//!
//! Implements the `idlink-storage` traits on top of `sqlx-postgres`: pooled
//! connections, embedded migrations, and native transactions for the
//! merge-and-create phase (row lock on the surviving primary, demotion and
//! re-linking committed as one unit).

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod queries;
pub mod store;
pub mod transaction;

pub use config::PostgresConfig;
pub use error::PostgresError;
pub use store::PostgresContactStore;
pub use transaction::PostgresTx;
