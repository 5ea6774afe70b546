//! Workflow phases, draft state, and inbound events.

use serde::{Deserialize, Serialize};

use crate::error::FieldErrors;
use crate::sequence::SequenceForm;

/// Phase of a workflow instance.
///
/// `Validating`, `Submitting` and `Enriching` are only held while the
/// corresponding step runs; between events an instance rests in `Listing`
/// or `Drafting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Listing,
    Drafting,
    Validating,
    Submitting,
    Enriching,
}

/// The in-progress creation form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub form: SequenceForm,
    pub errors: FieldErrors,
    pub submit_error: Option<String>,
}

impl Draft {
    /// Replace the form fields, keeping errors until revalidation.
    pub fn set_form(&mut self, form: SequenceForm) {
        self.form = form;
    }

    /// Clear field and submit errors.
    pub fn clear_errors(&mut self) {
        self.errors = FieldErrors::new();
        self.submit_error = None;
    }
}

/// Inbound events from the UI boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Open an empty creation form.
    NewSequence,
    /// A form field changed.
    FormUpdated { form: SequenceForm },
    /// The form was dismissed.
    FormClosed,
    /// The form was submitted.
    FormSubmitted { form: SequenceForm },
    /// Delete a sequence by id.
    DeleteSequence { id: String },
    /// Reload the database cache.
    RefreshDatabases,
    /// Reload one database's tables.
    RefreshTables { database_id: String },
}

/// Result of handling an event that did not terminate the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum EventOutcome {
    Applied,
    /// A best-effort refresh failed and left the cache untouched.
    RefreshFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserialize() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "event": "form_submitted",
            "form": { "postgres_database_id": null, "table_oid": 100 }
        }))
        .unwrap();
        match event {
            Event::FormSubmitted { form } => {
                assert!(!form.has_database());
                assert_eq!(form.table_oid.as_deref(), Some("100"));
            }
            other => panic!("unexpected event {:?}", other),
        }

        let event: Event =
            serde_json::from_str(r#"{"event":"refresh_tables","database_id":"abc"}"#).unwrap();
        assert_eq!(
            event,
            Event::RefreshTables {
                database_id: "abc".into()
            }
        );
    }

    #[test]
    fn test_outcome_serialize() {
        let json = serde_json::to_value(EventOutcome::RefreshFailed("boom".into())).unwrap();
        assert_eq!(json["outcome"], "refresh_failed");
        assert_eq!(json["reason"], "boom");
    }
}
