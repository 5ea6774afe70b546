//! Sequence enrichment from the live catalog.
//!
//! The creation form only carries identifiers. After a sequence is stored,
//! its table schema, table name and sort column name are resolved from the
//! database's cached tables and written back.

use crate::catalog::PostgresDatabase;
use crate::error::{Error, Result};
use crate::sequence::{Sequence, SequenceRepository};

/// Resolve a sequence's display fields against a database, without persisting.
///
/// A table or column missing from the cache is a `CallerInvariant` error: the
/// caller selected both from that same cache.
pub fn enrich(sequence: &Sequence, database: &PostgresDatabase) -> Result<Sequence> {
    if sequence.postgres_database_id != database.id {
        return Err(Error::CallerInvariant(format!(
            "sequence {} belongs to database {}, not {}",
            sequence.id, sequence.postgres_database_id, database.id
        )));
    }

    let table = database.table(sequence.table_oid).ok_or_else(|| {
        Error::CallerInvariant(format!(
            "table {} not found in database {}",
            sequence.table_oid, database.id
        ))
    })?;
    let column = table.column(sequence.sort_column_attnum).ok_or_else(|| {
        Error::CallerInvariant(format!(
            "column {} not found in table {}",
            sequence.sort_column_attnum,
            table.qualified_name()
        ))
    })?;

    let mut enriched = sequence.clone();
    enriched.table_schema = Some(table.schema.clone());
    enriched.table_name = Some(table.name.clone());
    enriched.sort_column_name = Some(column.name.clone());
    Ok(enriched)
}

/// Enrich a stored sequence and persist the resolved names.
pub async fn update_sequence_from_db(
    repository: &dyn SequenceRepository,
    sequence: &Sequence,
    database: &PostgresDatabase,
) -> Result<Sequence> {
    let enriched = enrich(sequence, database)?;
    let updated = repository.update(&enriched).await?;
    tracing::debug!(
        sequence_id = %updated.id,
        table_schema = ?updated.table_schema,
        table_name = ?updated.table_name,
        sort_column = ?updated.sort_column_name,
        "sequence enriched"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, Table};
    use crate::sequence::{CreateSequence, SequenceStore};
    use uuid::Uuid;

    fn database(account: Uuid) -> PostgresDatabase {
        PostgresDatabase::new(account, "primary").with_table(
            Table::new(200, "public", "orders")
                .with_column(Column::new(1, "created_at", "timestamp"))
                .with_column(Column::new(2, "id", "bigint")),
        )
    }

    #[tokio::test]
    async fn test_update_sequence_from_db() {
        let account = Uuid::new_v4();
        let db = database(account);
        let store = SequenceStore::temporary().unwrap();
        let draft = store
            .create(account, &CreateSequence::new(db.id, 200, 1))
            .await
            .unwrap();

        let enriched = update_sequence_from_db(&store, &draft, &db).await.unwrap();
        assert_eq!(enriched.table_schema.as_deref(), Some("public"));
        assert_eq!(enriched.table_name.as_deref(), Some("orders"));
        assert_eq!(enriched.sort_column_name.as_deref(), Some("created_at"));
        assert_eq!(store.get(account, draft.id).await.unwrap(), enriched);
    }

    #[tokio::test]
    async fn test_reenrich_follows_rename() {
        let account = Uuid::new_v4();
        let mut db = database(account);
        let store = SequenceStore::temporary().unwrap();
        let draft = store
            .create(account, &CreateSequence::new(db.id, 200, 1))
            .await
            .unwrap();
        update_sequence_from_db(&store, &draft, &db).await.unwrap();

        db.replace_tables(vec![Table::new(200, "sales", "purchases")
            .with_column(Column::new(1, "inserted_at", "timestamp"))]);
        let current = store.get(account, draft.id).await.unwrap();
        let renamed = update_sequence_from_db(&store, &current, &db).await.unwrap();

        assert_eq!(renamed.table_schema.as_deref(), Some("sales"));
        assert_eq!(renamed.table_name.as_deref(), Some("purchases"));
        assert_eq!(renamed.sort_column_name.as_deref(), Some("inserted_at"));
    }

    #[test]
    fn test_missing_table_is_fatal() {
        let account = Uuid::new_v4();
        let db = database(account);
        let store_sequence = Sequence {
            id: Uuid::new_v4(),
            account_id: account,
            postgres_database_id: db.id,
            table_oid: 999,
            sort_column_attnum: 1,
            table_schema: None,
            table_name: None,
            sort_column_name: None,
            inserted_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        assert!(enrich(&store_sequence, &db).unwrap_err().is_fatal());

        let wrong_column = Sequence {
            table_oid: 200,
            sort_column_attnum: 7,
            ..store_sequence
        };
        assert!(enrich(&wrong_column, &db).unwrap_err().is_fatal());
    }
}
