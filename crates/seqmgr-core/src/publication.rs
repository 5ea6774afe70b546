//! Publication membership checks.
//!
//! A sequence may only bind a table that the source database exposes through
//! its logical-replication publication. Verifiers report a missing membership
//! as `NotFound(PublicationMembership)`, distinct from a table that does not
//! exist at all (`NotFound(Table)`).

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::catalog::{quote_ident, PostgresDatabase, Table};
use crate::error::{EntityKind, Error, Result};

/// Confirms a table is a member of a database's publication.
#[async_trait]
pub trait PublicationVerifier: Send + Sync {
    /// Check that `table_oid` belongs to the publication of `database`.
    async fn verify_table_in_publication(
        &self,
        database: &PostgresDatabase,
        table_oid: u32,
    ) -> Result<()>;
}

/// Resolve the publication name and cached table a check applies to.
///
/// Fails with `CallerInvariant` when the database has no publication and
/// `NotFound(Table)` when the oid is not among the cached tables.
pub fn resolve_target(database: &PostgresDatabase, table_oid: u32) -> Result<(&str, &Table)> {
    let publication = database.publication_name().ok_or_else(|| {
        Error::CallerInvariant(format!(
            "database {} has no replication slot publication",
            database.id
        ))
    })?;
    let table = database
        .table(table_oid)
        .ok_or(Error::NotFound(EntityKind::Table))?;
    Ok((publication, table))
}

/// Message shown when a table is missing from a publication.
pub fn remediation_message(publication: &str, table: &Table) -> String {
    format!(
        "Table {} is not in publication {}. Add it with: {}",
        table.qualified_name(),
        quote_ident(publication),
        alter_publication_sql(publication, table),
    )
}

/// SQL that adds a table to a publication.
pub fn alter_publication_sql(publication: &str, table: &Table) -> String {
    format!(
        "ALTER PUBLICATION {} ADD TABLE {};",
        quote_ident(publication),
        table.qualified_name()
    )
}

/// Verifier backed by a fixed membership table.
#[derive(Default)]
pub struct StaticPublicationVerifier {
    members: RwLock<HashMap<String, HashSet<u32>>>,
}

impl StaticPublicationVerifier {
    /// Create a verifier with no members.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to a publication.
    pub fn add_table(&self, publication: impl Into<String>, table_oid: u32) {
        self.members
            .write()
            .entry(publication.into())
            .or_default()
            .insert(table_oid);
    }

    /// Remove a table from a publication.
    pub fn remove_table(&self, publication: &str, table_oid: u32) -> bool {
        self.members
            .write()
            .get_mut(publication)
            .map(|tables| tables.remove(&table_oid))
            .unwrap_or(false)
    }

    /// Check membership without a database.
    pub fn contains(&self, publication: &str, table_oid: u32) -> bool {
        self.members
            .read()
            .get(publication)
            .is_some_and(|tables| tables.contains(&table_oid))
    }
}

#[async_trait]
impl PublicationVerifier for StaticPublicationVerifier {
    async fn verify_table_in_publication(
        &self,
        database: &PostgresDatabase,
        table_oid: u32,
    ) -> Result<()> {
        let (publication, _) = resolve_target(database, table_oid)?;
        if self.contains(publication, table_oid) {
            Ok(())
        } else {
            tracing::debug!(publication, table_oid, "table not in publication");
            Err(Error::NotFound(EntityKind::PublicationMembership))
        }
    }
}
