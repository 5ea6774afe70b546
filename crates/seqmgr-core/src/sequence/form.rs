//! Sequence creation form as submitted by the UI.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::model::{
    CreateSequence, FIELD_DATABASE_ID, FIELD_SORT_COLUMN, FIELD_TABLE_OID, MSG_INVALID,
};
use crate::error::FieldErrors;

/// Raw form fields. Every field may be absent or blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceForm {
    #[serde(default, deserialize_with = "text_or_number")]
    pub postgres_database_id: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub table_oid: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub sort_column_attnum: Option<String>,
}

impl SequenceForm {
    /// Build a form from identifiers.
    pub fn new(postgres_database_id: Uuid, table_oid: u32, sort_column_attnum: i16) -> Self {
        Self {
            postgres_database_id: Some(postgres_database_id.to_string()),
            table_oid: Some(table_oid.to_string()),
            sort_column_attnum: Some(sort_column_attnum.to_string()),
        }
    }

    /// Set the database id field.
    pub fn with_database_id(mut self, value: Option<String>) -> Self {
        self.postgres_database_id = value;
        self
    }

    /// Whether a database has been selected.
    pub fn has_database(&self) -> bool {
        present(&self.postgres_database_id).is_some()
    }

    /// Cast the raw fields into creation parameters.
    ///
    /// Blank fields become `None`; fields that fail to parse also become `None`
    /// and get an `"is invalid"` error.
    pub fn cast(&self) -> (CreateSequence, FieldErrors) {
        let mut errors = FieldErrors::new();

        let postgres_database_id = present(&self.postgres_database_id).and_then(|raw| {
            raw.parse::<Uuid>()
                .map_err(|_| errors.add(FIELD_DATABASE_ID, MSG_INVALID))
                .ok()
        });
        let table_oid = present(&self.table_oid).and_then(|raw| {
            raw.parse::<u32>()
                .ok()
                .filter(|oid| *oid > 0)
                .or_else(|| {
                    errors.add(FIELD_TABLE_OID, MSG_INVALID);
                    None
                })
        });
        let sort_column_attnum = present(&self.sort_column_attnum).and_then(|raw| {
            raw.parse::<i16>()
                .ok()
                .filter(|attnum| *attnum > 0)
                .or_else(|| {
                    errors.add(FIELD_SORT_COLUMN, MSG_INVALID);
                    None
                })
        });

        (
            CreateSequence {
                postgres_database_id,
                table_oid,
                sort_column_attnum,
            },
            errors,
        )
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Accept form values sent either as strings or as JSON numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Input {
        Text(String),
        Int(i64),
    }

    Ok(Option::<Input>::deserialize(deserializer)?.map(|input| match input {
        Input::Text(text) => text,
        Input::Int(n) => n.to_string(),
    }))
}
