//! aggrel Store - relational persistence for aggregates
//!
//! Provides:
//! - The `Connection` abstraction with flattened nested transactions
//! - A SQLite backend built on rusqlite
//! - `TransactionalRepository`: atomic multi-table get / save / delete
//! - Schema bootstrap with fingerprint-based drift detection
//! - TOML-backed store configuration

pub mod bootstrap;
pub mod config;
pub mod connection;
pub mod errors;
pub mod repository;
pub mod sqlite;
mod statements;

pub use bootstrap::BootstrapOutcome;
pub use config::{ConfigError, JournalMode, StoreConfig};
pub use connection::{Connection, TxState};
pub use errors::Result;
pub use repository::{DynamicRepository, Repository, RepositorySession, TransactionalRepository};
pub use sqlite::SqliteConnection;
