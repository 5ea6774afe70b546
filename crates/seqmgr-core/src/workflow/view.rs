//! View models produced for the UI boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{PostgresDatabase, Table};
use crate::error::FieldErrors;
use crate::sequence::{Sequence, SequenceForm};

use super::state::Phase;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
}

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    /// Create an info notification.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
        }
    }

    /// Create a warning notification.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Warning,
            message: message.into(),
        }
    }

    /// Create an error notification.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

/// Database reference embedded in a sequence row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseRef {
    pub id: Uuid,
    pub name: String,
}

/// One row of the sequence listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceView {
    pub id: Uuid,
    pub table_name: Option<String>,
    pub table_schema: Option<String>,
    pub sort_column_name: Option<String>,
    pub inserted_at: DateTime<Utc>,
    pub consumer_count: usize,
    pub postgres_database: DatabaseRef,
}

impl SequenceView {
    /// Build a row, resolving the database name from the cache.
    pub fn new(sequence: &Sequence, consumer_count: usize, databases: &[PostgresDatabase]) -> Self {
        let name = databases
            .iter()
            .find(|db| db.id == sequence.postgres_database_id)
            .map(|db| db.name.clone())
            .unwrap_or_else(|| sequence.postgres_database_id.to_string());

        Self {
            id: sequence.id,
            table_name: sequence.table_name.clone(),
            table_schema: sequence.table_schema.clone(),
            sort_column_name: sequence.sort_column_name.clone(),
            inserted_at: sequence.inserted_at,
            consumer_count,
            postgres_database: DatabaseRef {
                id: sequence.postgres_database_id,
                name,
            },
        }
    }
}

/// A database as offered to the selection UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseView {
    pub id: Uuid,
    pub name: String,
    pub publication_name: Option<String>,
    pub tables: Vec<Table>,
}

impl From<&PostgresDatabase> for DatabaseView {
    fn from(db: &PostgresDatabase) -> Self {
        Self {
            id: db.id,
            name: db.name.clone(),
            publication_name: db.publication_name().map(String::from),
            tables: db.tables.clone(),
        }
    }
}

/// The open creation form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub fields: SequenceForm,
    /// Errors attached to individual fields.
    pub errors: FieldErrors,
    /// Error not attached to any field (publication membership).
    pub submit_error: Option<String>,
}

/// Full snapshot of a workflow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowView {
    pub account_id: Uuid,
    pub phase: Phase,
    pub sequences: Vec<SequenceView>,
    pub databases: Vec<DatabaseView>,
    pub form: Option<FormView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_view_shape() {
        let account = Uuid::new_v4();
        let db = PostgresDatabase::new(account, "primary");
        let sequence = Sequence {
            id: Uuid::new_v4(),
            account_id: account,
            postgres_database_id: db.id,
            table_oid: 200,
            sort_column_attnum: 1,
            table_schema: Some("public".into()),
            table_name: Some("orders".into()),
            sort_column_name: Some("created_at".into()),
            inserted_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let view = SequenceView::new(&sequence, 3, std::slice::from_ref(&db));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["table_name"], "orders");
        assert_eq!(json["consumer_count"], 3);
        assert_eq!(json["postgres_database"]["name"], "primary");
        assert!(json.get("table_oid").is_none());

        let orphan = SequenceView::new(&sequence, 0, &[]);
        assert_eq!(orphan.postgres_database.name, db.id.to_string());
    }

    #[test]
    fn test_database_view_shape() {
        let db = PostgresDatabase::new(Uuid::new_v4(), "primary").with_table(
            Table::new(200, "public", "orders")
                .with_column(crate::catalog::Column::new(1, "created_at", "timestamp")),
        );
        let json = serde_json::to_value(DatabaseView::from(&db)).unwrap();
        assert_eq!(json["tables"][0]["oid"], 200);
        assert_eq!(json["tables"][0]["columns"][0]["type"], "timestamp");
        assert!(json["publication_name"].is_null());
    }
}
