//! Catalog mirror for source databases.
//!
//! The catalog holds the per-account view of known Postgres databases, their
//! tables and columns, and each database's replication-slot identity.

mod database;
mod mirror;
mod table;

pub use database::{PostgresDatabase, ReplicationSlot};
pub use mirror::{CatalogMirror, MemoryCatalog};
pub use table::{quote_ident, Column, Table};
