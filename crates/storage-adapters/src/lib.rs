//! # storage-adapters
//!
//! Implementations of the `domains` ports.
//!
//! - [`memory::InMemoryStore`]: concurrent maps, always compiled. Used by tests and
//!   the `memory` backend.
//! - [`sqlite::SqliteStore`]: SQLite through sqlx (feature `db-sqlite`).
//! - [`invalidation::StaleViewRegistry`]: records which page paths need re-rendering.

pub mod invalidation;
pub mod memory;

#[cfg(feature = "db-sqlite")]
pub mod sqlite;

pub use invalidation::StaleViewRegistry;
pub use memory::InMemoryStore;

#[cfg(feature = "db-sqlite")]
pub use sqlite::SqliteStore;
