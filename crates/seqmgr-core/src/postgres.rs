//! Live checks against source Postgres databases.
//!
//! Requires a reachable source database per registered database id.
//! Enable with `--features postgres`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use uuid::Uuid;

use crate::catalog::{CatalogMirror, Column, PostgresDatabase, Table};
use crate::error::{EntityKind, Error, Result};
use crate::publication::{resolve_target, PublicationVerifier};

/// Connections opened per source database.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 2;

/// Publication membership, matched by table oid.
const MEMBERSHIP_SQL: &str = r#"
    SELECT EXISTS (
        SELECT 1
        FROM pg_publication_tables pt
        JOIN pg_namespace n ON n.nspname = pt.schemaname
        JOIN pg_class c ON c.relnamespace = n.oid AND c.relname = pt.tablename
        WHERE pt.pubname = $1 AND c.oid = $2
    )
"#;

/// User tables and their live columns, ordered for grouping.
const TABLES_SQL: &str = r#"
    SELECT c.oid AS oid,
           n.nspname::text AS schema,
           c.relname::text AS name,
           a.attnum AS attnum,
           a.attname::text AS column_name,
           format_type(a.atttypid, a.atttypmod) AS column_type
    FROM pg_class c
    JOIN pg_namespace n ON n.oid = c.relnamespace
    JOIN pg_attribute a ON a.attrelid = c.oid
    WHERE c.relkind IN ('r', 'p')
      AND a.attnum > 0
      AND NOT a.attisdropped
      AND n.nspname NOT IN ('pg_catalog', 'information_schema')
      AND n.nspname NOT LIKE 'pg_toast%'
    ORDER BY n.nspname, c.relname, a.attnum
"#;

/// Connection pools keyed by database id.
#[derive(Default)]
pub struct SourcePools {
    pools: RwLock<HashMap<Uuid, PgPool>>,
}

impl SourcePools {
    /// Create an empty pool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lazily connecting pool for a database.
    pub fn connect_lazy(&self, database_id: Uuid, url: &str) -> Result<()> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect_lazy(url)?;
        self.insert(database_id, pool);
        Ok(())
    }

    /// Register an existing pool.
    pub fn insert(&self, database_id: Uuid, pool: PgPool) {
        self.pools.write().insert(database_id, pool);
    }

    /// Get the pool of a database.
    pub fn get(&self, database_id: Uuid) -> Result<PgPool> {
        self.pools
            .read()
            .get(&database_id)
            .cloned()
            .ok_or(Error::NotFound(EntityKind::Database))
    }
}

/// Verifier that asks the source database's publication catalog.
pub struct PgPublicationVerifier {
    pools: Arc<SourcePools>,
}

impl PgPublicationVerifier {
    /// Create a verifier over the given pools.
    pub fn new(pools: Arc<SourcePools>) -> Self {
        Self { pools }
    }
}

#[async_trait]
impl PublicationVerifier for PgPublicationVerifier {
    async fn verify_table_in_publication(
        &self,
        database: &PostgresDatabase,
        table_oid: u32,
    ) -> Result<()> {
        let (publication, _) = resolve_target(database, table_oid)?;
        let pool = self.pools.get(database.id)?;

        let member: bool = sqlx::query_scalar(MEMBERSHIP_SQL)
            .bind(publication)
            .bind(Oid(table_oid))
            .fetch_one(&pool)
            .await?;

        if member {
            Ok(())
        } else {
            tracing::debug!(database_id = %database.id, publication, table_oid, "table not in publication");
            Err(Error::NotFound(EntityKind::PublicationMembership))
        }
    }
}

/// Read every user table and its columns from a source database.
pub async fn introspect_tables(pool: &PgPool) -> Result<Vec<Table>> {
    let rows = sqlx::query(TABLES_SQL).fetch_all(pool).await?;

    let mut tables: Vec<Table> = Vec::new();
    for row in rows {
        let oid: Oid = row.try_get("oid")?;
        let column = Column::new(
            row.try_get::<i16, _>("attnum")?,
            row.try_get::<String, _>("column_name")?,
            row.try_get::<String, _>("column_type")?,
        );

        match tables.last_mut() {
            Some(table) if table.oid == oid.0 => table.columns.push(column),
            _ => {
                let schema: String = row.try_get("schema")?;
                let name: String = row.try_get("name")?;
                tables.push(Table::new(oid.0, schema, name).with_column(column));
            }
        }
    }
    Ok(tables)
}

/// Catalog mirror that introspects registered source databases.
pub struct PgCatalogMirror {
    databases: RwLock<HashMap<Uuid, PostgresDatabase>>,
    pools: Arc<SourcePools>,
}

impl PgCatalogMirror {
    /// Create a mirror over the given pools.
    pub fn new(pools: Arc<SourcePools>) -> Self {
        Self {
            databases: RwLock::new(HashMap::new()),
            pools,
        }
    }

    /// Register a database's identity; its tables are read on demand.
    pub fn register(&self, database: PostgresDatabase) {
        self.databases.write().insert(database.id, database);
    }

    fn registered(&self, account_id: Uuid, database_id: Uuid) -> Result<PostgresDatabase> {
        self.databases
            .read()
            .get(&database_id)
            .filter(|db| db.account_id == account_id)
            .cloned()
            .ok_or(Error::NotFound(EntityKind::Database))
    }

    async fn introspect(&self, mut database: PostgresDatabase) -> Result<PostgresDatabase> {
        let pool = self.pools.get(database.id)?;
        let tables = introspect_tables(&pool).await?;
        tracing::debug!(database_id = %database.id, tables = tables.len(), "introspected source tables");
        database.replace_tables(tables);
        Ok(database)
    }
}

#[async_trait]
impl CatalogMirror for PgCatalogMirror {
    async fn list_databases(&self, account_id: Uuid) -> Result<Vec<PostgresDatabase>> {
        let mut registered: Vec<PostgresDatabase> = self
            .databases
            .read()
            .values()
            .filter(|db| db.account_id == account_id)
            .cloned()
            .collect();
        registered.sort_by(|a, b| a.name.cmp(&b.name));

        let mut databases = Vec::with_capacity(registered.len());
        for database in registered {
            databases.push(self.introspect(database).await?);
        }
        Ok(databases)
    }

    async fn get_database(&self, account_id: Uuid, database_id: Uuid) -> Result<PostgresDatabase> {
        let database = self.registered(account_id, database_id)?;
        self.introspect(database).await
    }

    async fn refresh_tables(
        &self,
        account_id: Uuid,
        database_id: Uuid,
    ) -> Result<PostgresDatabase> {
        self.get_database(account_id, database_id).await
    }
}
