//! Core error types.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of entity a not-found failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A persisted sequence.
    Sequence,
    /// A source Postgres database.
    Database,
    /// A table in a source database's catalog.
    Table,
    /// A column of a source table.
    Column,
    /// Membership of a table in a logical-replication publication.
    PublicationMembership,
}

impl EntityKind {
    /// Stable snake_case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Sequence => "sequence",
            EntityKind::Database => "database",
            EntityKind::Table => "table",
            EntityKind::Column => "column",
            EntityKind::PublicationMembership => "publication_membership",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-scoped validation errors, keyed by form field name.
///
/// Fields keep the order of the `BTreeMap` so rendered output is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error set holding a single message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Attach a message to a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Merge another error set into this one.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Messages attached to a field.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Check whether a field has any message.
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Check if there are no errors.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over fields and their messages.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Turn a non-empty set into an error, or `Ok(())` when empty.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::FieldValidation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{} {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more submitted fields failed validation.
    #[error("validation failed: {0}")]
    FieldValidation(FieldErrors),

    /// An entity does not exist (or is not visible to the account).
    #[error("{0} not found")]
    NotFound(EntityKind),

    /// A caller broke a guarantee the core relies on. Fatal for the workflow.
    #[error("invariant violated: {0}")]
    CallerInvariant(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Record (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Source database error.
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Any other failure reported by a collaborator.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error must terminate the workflow instance.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::CallerInvariant(_))
    }

    /// Whether this is a not-found error for the given kind.
    pub fn is_not_found(&self, kind: EntityKind) -> bool {
        matches!(self, Error::NotFound(k) if *k == kind)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
