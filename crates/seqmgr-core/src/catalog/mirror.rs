//! Catalog mirror: the per-account view of source databases.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::database::PostgresDatabase;
use super::table::Table;
use crate::error::{EntityKind, Error, Result};

/// Source of database, table, and column metadata for an account.
#[async_trait]
pub trait CatalogMirror: Send + Sync {
    /// List every database the account owns.
    async fn list_databases(&self, account_id: Uuid) -> Result<Vec<PostgresDatabase>>;

    /// Get one database owned by the account.
    async fn get_database(&self, account_id: Uuid, database_id: Uuid) -> Result<PostgresDatabase>;

    /// Re-read one database's tables and return the updated database.
    async fn refresh_tables(&self, account_id: Uuid, database_id: Uuid)
        -> Result<PostgresDatabase>;
}

/// In-memory catalog mirror.
#[derive(Default)]
pub struct MemoryCatalog {
    databases: RwLock<HashMap<Uuid, PostgresDatabase>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog holding the given databases.
    pub fn with_databases(databases: impl IntoIterator<Item = PostgresDatabase>) -> Self {
        let catalog = Self::new();
        for database in databases {
            catalog.insert(database);
        }
        catalog
    }

    /// Insert or replace a database.
    pub fn insert(&self, database: PostgresDatabase) {
        self.databases.write().insert(database.id, database);
    }

    /// Remove a database.
    pub fn remove(&self, database_id: Uuid) -> Option<PostgresDatabase> {
        self.databases.write().remove(&database_id)
    }

    /// Replace one database's tables, as a schema change on the source would.
    pub fn set_tables(&self, database_id: Uuid, tables: Vec<Table>) -> Result<()> {
        let mut guard = self.databases.write();
        let database = guard
            .get_mut(&database_id)
            .ok_or(Error::NotFound(EntityKind::Database))?;
        database.replace_tables(tables);
        Ok(())
    }

    /// Number of databases across all accounts.
    pub fn len(&self) -> usize {
        self.databases.read().len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.databases.read().is_empty()
    }

    fn lookup(&self, account_id: Uuid, database_id: Uuid) -> Result<PostgresDatabase> {
        self.databases
            .read()
            .get(&database_id)
            .filter(|db| db.account_id == account_id)
            .cloned()
            .ok_or(Error::NotFound(EntityKind::Database))
    }
}

#[async_trait]
impl CatalogMirror for MemoryCatalog {
    async fn list_databases(&self, account_id: Uuid) -> Result<Vec<PostgresDatabase>> {
        let mut databases: Vec<PostgresDatabase> = self
            .databases
            .read()
            .values()
            .filter(|db| db.account_id == account_id)
            .cloned()
            .collect();
        databases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(databases)
    }

    async fn get_database(&self, account_id: Uuid, database_id: Uuid) -> Result<PostgresDatabase> {
        self.lookup(account_id, database_id)
    }

    async fn refresh_tables(
        &self,
        account_id: Uuid,
        database_id: Uuid,
    ) -> Result<PostgresDatabase> {
        self.lookup(account_id, database_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_is_account_scoped() {
        let account_a = Uuid::new_v4();
        let account_b = Uuid::new_v4();
        let catalog = MemoryCatalog::with_databases([
            PostgresDatabase::new(account_a, "beta"),
            PostgresDatabase::new(account_a, "alpha"),
            PostgresDatabase::new(account_b, "other"),
        ]);

        let names: Vec<String> = catalog
            .list_databases(account_a)
            .await
            .unwrap()
            .into_iter()
            .map(|db| db.name)
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(catalog.len(), 3);
    }

    #[tokio::test]
    async fn test_get_database_of_other_account() {
        let owner = Uuid::new_v4();
        let db = PostgresDatabase::new(owner, "primary");
        let id = db.id;
        let catalog = MemoryCatalog::with_databases([db]);

        assert!(catalog.get_database(owner, id).await.is_ok());
        let err = catalog.get_database(Uuid::new_v4(), id).await.unwrap_err();
        assert!(err.is_not_found(EntityKind::Database));
    }

    #[tokio::test]
    async fn test_refresh_tables_sees_schema_change() {
        let account = Uuid::new_v4();
        let db = PostgresDatabase::new(account, "primary").with_table(Table::new(1, "public", "a"));
        let id = db.id;
        let catalog = MemoryCatalog::with_databases([db]);

        catalog
            .set_tables(id, vec![Table::new(2, "public", "b")])
            .unwrap();

        let refreshed = catalog.refresh_tables(account, id).await.unwrap();
        assert!(refreshed.table(1).is_none());
        assert_eq!(refreshed.table(2).unwrap().name, "b");
    }

    #[test]
    fn test_set_tables_unknown_database() {
        let catalog = MemoryCatalog::new();
        let err = catalog.set_tables(Uuid::new_v4(), Vec::new()).unwrap_err();
        assert!(err.is_not_found(EntityKind::Database));
    }
}
