//! Source database definitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::table::Table;

/// Logical-replication identity of a source database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationSlot {
    /// Replication slot name.
    pub slot_name: String,
    /// Publication whose tables the slot streams.
    pub publication_name: String,
}

/// A source Postgres database known to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresDatabase {
    /// Database id.
    pub id: Uuid,
    /// Owning account.
    pub account_id: Uuid,
    /// Display name.
    pub name: String,
    /// Cached tables.
    #[serde(default)]
    pub tables: Vec<Table>,
    /// Replication slot, once one has been configured.
    #[serde(default)]
    pub replication_slot: Option<ReplicationSlot>,
}

impl ReplicationSlot {
    /// Create a new replication slot identity.
    pub fn new(slot_name: impl Into<String>, publication_name: impl Into<String>) -> Self {
        Self {
            slot_name: slot_name.into(),
            publication_name: publication_name.into(),
        }
    }
}

impl PostgresDatabase {
    /// Create a new database with a random id and no tables.
    pub fn new(account_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            name: name.into(),
            tables: Vec::new(),
            replication_slot: None,
        }
    }

    /// Set the database id.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Add a table.
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Set the replication slot.
    pub fn with_replication_slot(mut self, slot: ReplicationSlot) -> Self {
        self.replication_slot = Some(slot);
        self
    }

    /// Look up a cached table by oid.
    pub fn table(&self, oid: u32) -> Option<&Table> {
        self.tables.iter().find(|t| t.oid == oid)
    }

    /// Publication name of the replication slot, if configured.
    pub fn publication_name(&self) -> Option<&str> {
        self.replication_slot
            .as_ref()
            .map(|slot| slot.publication_name.as_str())
    }

    /// Replace the cached tables.
    pub fn replace_tables(&mut self, tables: Vec<Table>) {
        self.tables = tables;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Column;

    #[test]
    fn test_table_lookup() {
        let db = PostgresDatabase::new(Uuid::new_v4(), "primary")
            .with_table(Table::new(100, "public", "events"))
            .with_table(
                Table::new(200, "public", "orders").with_column(Column::new(1, "created_at", "timestamp")),
            );

        assert_eq!(db.table(200).unwrap().name, "orders");
        assert!(db.table(300).is_none());
    }

    #[test]
    fn test_publication_name() {
        let db = PostgresDatabase::new(Uuid::new_v4(), "primary");
        assert!(db.publication_name().is_none());

        let db = db.with_replication_slot(ReplicationSlot::new("slot1", "pub1"));
        assert_eq!(db.publication_name(), Some("pub1"));
    }

    #[test]
    fn test_deserialize_without_tables() {
        let account = Uuid::new_v4();
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "account_id": account,
            "name": "analytics",
        });
        let db: PostgresDatabase = serde_json::from_value(json).unwrap();
        assert_eq!(db.account_id, account);
        assert!(db.tables.is_empty());
        assert!(db.replication_slot.is_none());
    }
}
