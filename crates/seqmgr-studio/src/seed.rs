//! Seed data for the studio's in-memory catalog.
//!
//! A seed lists source databases with their tables, which tables each
//! database's publication contains, and the consumers reading sequences.
//! Without a seed file the studio loads a small demo account.

use std::path::Path;

use seqmgr_core::{
    Column, Consumer, MemoryCatalog, MemoryConsumers, PostgresDatabase, ReplicationSlot,
    StaticPublicationVerifier, Table,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StudioError};

/// Account that owns the demo data.
pub const DEMO_ACCOUNT_ID: Uuid = Uuid::from_u128(0x5e9_0000_0000_0000_0000_0000_0000_0001);

/// A seeded source database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDatabase {
    #[serde(flatten)]
    pub database: PostgresDatabase,
    /// Table oids contained in the database's publication.
    #[serde(default)]
    pub published: Vec<u32>,
    /// Connection URL for live checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Databases and consumers to load at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub databases: Vec<SeedDatabase>,
    #[serde(default)]
    pub consumers: Vec<Consumer>,
}

impl Seed {
    /// Read a seed from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse a seed from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| StudioError::Seed(e.to_string()))
    }

    /// Demo account with one warehouse database.
    ///
    /// `public.orders` and `public.customers` are published; `public.audit_log`
    /// is not, so creating a sequence for it shows the remediation message.
    pub fn demo() -> Self {
        let database = PostgresDatabase::new(DEMO_ACCOUNT_ID, "warehouse")
            .with_id(Uuid::from_u128(0xdb_0000_0000_0000_0000_0000_0000_0001))
            .with_replication_slot(ReplicationSlot::new("warehouse_slot", "warehouse_pub"))
            .with_table(Table::new(16384, "public", "orders").with_columns([
                Column::new(1, "id", "bigint"),
                Column::new(2, "customer_id", "bigint"),
                Column::new(3, "inserted_at", "timestamp with time zone"),
                Column::new(4, "updated_at", "timestamp with time zone"),
            ]))
            .with_table(Table::new(16390, "public", "customers").with_columns([
                Column::new(1, "id", "bigint"),
                Column::new(2, "email", "text"),
                Column::new(3, "updated_at", "timestamp with time zone"),
            ]))
            .with_table(Table::new(16402, "public", "audit_log").with_columns([
                Column::new(1, "id", "bigint"),
                Column::new(2, "recorded_at", "timestamp with time zone"),
            ]));

        Self {
            databases: vec![SeedDatabase {
                database,
                published: vec![16384, 16390],
                url: None,
            }],
            consumers: Vec::new(),
        }
    }

    /// Load the seed into the in-memory collaborators.
    pub fn apply(
        &self,
        catalog: &MemoryCatalog,
        verifier: &StaticPublicationVerifier,
        consumers: &MemoryConsumers,
    ) {
        for seeded in &self.databases {
            if let Some(publication) = seeded.database.publication_name() {
                for oid in &seeded.published {
                    verifier.add_table(publication, *oid);
                }
            }
            catalog.insert(seeded.database.clone());
        }
        for consumer in &self.consumers {
            consumers.insert(consumer.clone());
        }

        tracing::info!(
            databases = self.databases.len(),
            consumers = self.consumers.len(),
            "seed loaded"
        );
    }
}
