//! # autopilot-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the [`DecisionStore`](autopilot_app::ports::DecisionStore) port
//! - Manage `SQLite` connection pool lifecycle (WAL, full sync)
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `autopilot-app` (for port traits) and `autopilot-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod decision_store;
pub mod error;
pub mod pool;

pub use decision_store::SqliteDecisionStore;
pub use error::StorageError;
pub use pool::{Config, Database};
