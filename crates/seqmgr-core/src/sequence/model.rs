//! Sequence records and creation parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, FieldErrors, Result};

/// Form field holding the database id.
pub const FIELD_DATABASE_ID: &str = "postgres_database_id";
/// Form field holding the table oid.
pub const FIELD_TABLE_OID: &str = "table_oid";
/// Form field holding the sort column attnum.
pub const FIELD_SORT_COLUMN: &str = "sort_column_attnum";

pub(crate) const MSG_BLANK: &str = "can't be blank";
pub(crate) const MSG_INVALID: &str = "is invalid";
pub(crate) const MSG_TAKEN: &str = "already has a sequence";

/// A persisted binding from a source table to its ordering column.
///
/// `table_schema`, `table_name` and `sort_column_name` mirror the catalog
/// entry for `(postgres_database_id, table_oid)` as of the last enrichment and
/// are `None` until the first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: Uuid,
    pub account_id: Uuid,
    pub postgres_database_id: Uuid,
    pub table_oid: u32,
    pub sort_column_attnum: i16,
    pub table_schema: Option<String>,
    pub table_name: Option<String>,
    pub sort_column_name: Option<String>,
    pub inserted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sequence {
    /// Whether display fields have been filled from the catalog.
    pub fn is_enriched(&self) -> bool {
        self.table_schema.is_some() && self.table_name.is_some() && self.sort_column_name.is_some()
    }
}

/// Identifier-only parameters for a new sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSequence {
    pub postgres_database_id: Option<Uuid>,
    pub table_oid: Option<u32>,
    pub sort_column_attnum: Option<i16>,
}

/// Creation parameters with every required field present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredFields {
    pub postgres_database_id: Uuid,
    pub table_oid: u32,
    pub sort_column_attnum: i16,
}

impl CreateSequence {
    /// Create parameters from identifiers.
    pub fn new(postgres_database_id: Uuid, table_oid: u32, sort_column_attnum: i16) -> Self {
        Self {
            postgres_database_id: Some(postgres_database_id),
            table_oid: Some(table_oid),
            sort_column_attnum: Some(sort_column_attnum),
        }
    }

    /// Check required fields, collecting an error per missing field.
    pub fn check_required(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.postgres_database_id.is_none() {
            errors.add(FIELD_DATABASE_ID, MSG_BLANK);
        }
        if self.table_oid.is_none() {
            errors.add(FIELD_TABLE_OID, MSG_BLANK);
        }
        if self.sort_column_attnum.is_none() {
            errors.add(FIELD_SORT_COLUMN, MSG_BLANK);
        }
        errors
    }

    /// Return the required fields, or field errors for the missing ones.
    pub fn require(&self) -> Result<RequiredFields> {
        if let (Some(postgres_database_id), Some(table_oid), Some(sort_column_attnum)) = (
            self.postgres_database_id,
            self.table_oid,
            self.sort_column_attnum,
        ) {
            return Ok(RequiredFields {
                postgres_database_id,
                table_oid,
                sort_column_attnum,
            });
        }
        Err(Error::FieldValidation(self.check_required()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_complete() {
        let db = Uuid::new_v4();
        let fields = CreateSequence::new(db, 200, 1).require().unwrap();
        assert_eq!(fields.postgres_database_id, db);
        assert_eq!(fields.table_oid, 200);
        assert_eq!(fields.sort_column_attnum, 1);
    }

    #[test]
    fn test_require_reports_each_missing_field() {
        let params = CreateSequence {
            table_oid: Some(200),
            ..Default::default()
        };
        match params.require() {
            Err(Error::FieldValidation(errors)) => {
                assert_eq!(errors.get(FIELD_DATABASE_ID).unwrap(), &[MSG_BLANK.to_string()]);
                assert!(errors.has(FIELD_SORT_COLUMN));
                assert!(!errors.has(FIELD_TABLE_OID));
            }
            other => panic!("expected field validation, got {:?}", other),
        }
    }
}
