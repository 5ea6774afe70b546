//! Sequence workflow controller.
//!
//! One instance serves one UI session. It owns the session's database cache,
//! the sequence listing, the open creation form and a notification queue, and
//! processes one user intent at a time.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::catalog::{CatalogMirror, PostgresDatabase};
use crate::enrichment::update_sequence_from_db;
use crate::error::{EntityKind, Error, FieldErrors, Result};
use crate::publication::{remediation_message, PublicationVerifier};
use crate::sequence::{
    Sequence, SequenceForm, SequenceRepository, FIELD_SORT_COLUMN, FIELD_TABLE_OID,
};
use crate::usage::{frequencies, ConsumerSource};

use super::config::WorkflowConfig;
use super::state::{Draft, Event, EventOutcome, Phase};
use super::view::{DatabaseView, FormView, Notification, SequenceView, WorkflowView};

/// Collaborators a workflow instance calls into.
#[derive(Clone)]
pub struct Services {
    pub repository: Arc<dyn SequenceRepository>,
    pub catalog: Arc<dyn CatalogMirror>,
    pub verifier: Arc<dyn PublicationVerifier>,
    pub consumers: Arc<dyn ConsumerSource>,
}

/// Workflow state machine for listing, creating and deleting sequences.
pub struct SequenceWorkflow {
    account_id: Uuid,
    services: Services,
    config: WorkflowConfig,
    phase: Phase,
    databases: Vec<PostgresDatabase>,
    sequences: Vec<Sequence>,
    frequencies: HashMap<Uuid, usize>,
    draft: Option<Draft>,
    notifications: Vec<Notification>,
}

impl SequenceWorkflow {
    /// Create an instance for an account and load its databases and sequences.
    pub async fn mount(account_id: Uuid, services: Services, config: WorkflowConfig) -> Result<Self> {
        let databases = services.catalog.list_databases(account_id).await?;

        let mut workflow = Self {
            account_id,
            services,
            config,
            phase: Phase::Listing,
            databases,
            sequences: Vec::new(),
            frequencies: HashMap::new(),
            draft: None,
            notifications: Vec::new(),
        };
        workflow.load_sequences().await?;

        tracing::debug!(
            account_id = %account_id,
            databases = workflow.databases.len(),
            sequences = workflow.sequences.len(),
            "sequence workflow mounted"
        );
        Ok(workflow)
    }

    /// Account this instance is scoped to.
    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Cached databases.
    pub fn databases(&self) -> &[PostgresDatabase] {
        &self.databases
    }

    /// Sequences as of the last listing refresh.
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// The open creation form, if any.
    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// Consumer count of a sequence as of the last listing refresh.
    pub fn consumer_count(&self, sequence_id: Uuid) -> usize {
        self.frequencies.get(&sequence_id).copied().unwrap_or(0)
    }

    /// Drain queued notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Dispatch an inbound event.
    ///
    /// Only `CallerInvariant` errors escape; they terminate the instance.
    pub async fn handle(&mut self, event: Event) -> Result<EventOutcome> {
        match event {
            Event::NewSequence => self.new_sequence(),
            Event::FormUpdated { form } => self.form_updated(form).await,
            Event::FormClosed => self.form_closed(),
            Event::FormSubmitted { form } => self.form_submitted(form).await?,
            Event::DeleteSequence { id } => self.delete_sequence(&id).await,
            Event::RefreshDatabases => {
                if let Err(e) = self.refresh_databases().await {
                    return Ok(EventOutcome::RefreshFailed(e.to_string()));
                }
            }
            Event::RefreshTables { database_id } => {
                if let Err(e) = self.refresh_tables(&database_id).await {
                    return Ok(EventOutcome::RefreshFailed(e.to_string()));
                }
            }
        }
        Ok(EventOutcome::Applied)
    }

    /// Open an empty creation form.
    pub fn new_sequence(&mut self) {
        self.draft = Some(Draft::default());
        self.transition(Phase::Drafting);
    }

    /// Discard the form without persisting anything.
    pub fn form_closed(&mut self) {
        self.draft = None;
        self.transition(Phase::Listing);
    }

    /// Revalidate the form after a field edit.
    pub async fn form_updated(&mut self, form: SequenceForm) {
        self.transition(Phase::Validating);
        let errors = self.live_errors(&form).await;

        let draft = self.draft.get_or_insert_with(Draft::default);
        draft.set_form(form);
        draft.errors = errors;
        self.transition(Phase::Drafting);
    }

    /// Submit the form: verify publication membership, create, then enrich.
    pub async fn form_submitted(&mut self, form: SequenceForm) -> Result<()> {
        let draft = self.draft.get_or_insert_with(Draft::default);
        draft.set_form(form.clone());
        draft.clear_errors();

        let (params, mut errors) = form.cast();
        if !form.has_database() || !errors.is_empty() {
            merge_new_fields(&mut errors, params.check_required());
            self.reject(errors);
            return Ok(());
        }

        self.transition(Phase::Submitting);
        let database = self.cached_database(params.postgres_database_id)?;

        if let Some(table_oid) = params.table_oid {
            if let Err(e) = self
                .services
                .verifier
                .verify_table_in_publication(&database, table_oid)
                .await
            {
                return self.verification_failed(e, &database, table_oid);
            }

            if let Some(attnum) = params.sort_column_attnum {
                let column = database.table(table_oid).and_then(|t| t.column(attnum));
                if column.is_none() {
                    self.reject(FieldErrors::single(FIELD_SORT_COLUMN, "column not found"));
                    return Ok(());
                }
            }
        }

        let sequence = match self.services.repository.create(self.account_id, &params).await {
            Ok(sequence) => sequence,
            Err(Error::FieldValidation(errors)) => {
                self.reject(errors);
                return Ok(());
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(account_id = %self.account_id, error = %e, "failed to create sequence");
                self.notify(Notification::error(format!("Failed to create sequence: {}", e)));
                self.transition(Phase::Drafting);
                return Ok(());
            }
        };

        self.transition(Phase::Enriching);
        match update_sequence_from_db(self.services.repository.as_ref(), &sequence, &database).await {
            Ok(enriched) => {
                tracing::info!(
                    account_id = %self.account_id,
                    sequence_id = %enriched.id,
                    database_id = %database.id,
                    table_oid = enriched.table_oid,
                    "sequence created"
                );
                self.notify(Notification::info("Sequence created successfully"));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(sequence_id = %sequence.id, error = %e, "failed to store enrichment");
                self.notify(Notification::warning(format!(
                    "Sequence created, but its table details could not be saved: {}",
                    e
                )));
            }
        }

        self.draft = None;
        self.transition(Phase::Listing);
        self.reload_listing().await;
        Ok(())
    }

    /// Delete a sequence owned by the account.
    pub async fn delete_sequence(&mut self, id: &str) {
        let sequence = match self.lookup_sequence(id).await {
            Ok(sequence) => sequence,
            Err(Error::NotFound(_)) => {
                self.notify(Notification::error("Sequence not found"));
                return;
            }
            Err(e) => {
                tracing::warn!(sequence_id = id, error = %e, "failed to load sequence");
                self.notify(Notification::error(format!("Failed to delete sequence: {}", e)));
                return;
            }
        };

        let consumer_count = self.current_consumer_count(sequence.id).await;
        if consumer_count > 0 && self.config.blocks_in_use_delete() {
            self.notify(Notification::error(format!(
                "Cannot delete sequence: {} consumer(s) depend on it",
                consumer_count
            )));
            return;
        }

        match self.services.repository.delete(&sequence).await {
            Ok(deleted) => {
                tracing::info!(
                    account_id = %self.account_id,
                    sequence_id = %deleted.id,
                    consumer_count,
                    "sequence deleted"
                );
                self.notify(Notification::info("Sequence deleted successfully"));
                if consumer_count > 0 {
                    self.notify(Notification::warning(format!(
                        "{} consumer(s) referenced the deleted sequence",
                        consumer_count
                    )));
                }
                self.reload_listing().await;
            }
            Err(e) => {
                tracing::warn!(sequence_id = %sequence.id, error = %e, "failed to delete sequence");
                self.notify(Notification::error(format!("Failed to delete sequence: {}", e)));
            }
        }
    }

    /// Reload the database cache from the catalog mirror.
    ///
    /// On failure the cache is left as it was and the error is returned.
    pub async fn refresh_databases(&mut self) -> Result<()> {
        match self.services.catalog.list_databases(self.account_id).await {
            Ok(databases) => {
                self.databases = databases;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(account_id = %self.account_id, error = %e, "database refresh failed");
                Err(e)
            }
        }
    }

    /// Reload one cached database's tables.
    ///
    /// Unknown ids and reload failures leave the cache untouched.
    pub async fn refresh_tables(&mut self, database_id: &str) -> Result<()> {
        let result = self.reload_tables(database_id).await;
        if let Err(e) = &result {
            tracing::warn!(database_id, error = %e, "table refresh failed");
        }
        result
    }

    /// Snapshot for the UI.
    pub fn view(&self) -> WorkflowView {
        WorkflowView {
            account_id: self.account_id,
            phase: self.phase,
            sequences: self
                .sequences
                .iter()
                .map(|s| SequenceView::new(s, self.consumer_count(s.id), &self.databases))
                .collect(),
            databases: self.databases.iter().map(DatabaseView::from).collect(),
            form: self.draft.as_ref().map(|draft| FormView {
                fields: draft.form.clone(),
                errors: draft.errors.clone(),
                submit_error: draft.submit_error.clone(),
            }),
        }
    }

    /// Reload sequences and recompute consumer counts.
    pub async fn load_sequences(&mut self) -> Result<()> {
        let sequences = self.services.repository.list(self.account_id).await?;
        let consumers = self.services.consumers.list_consumers(self.account_id).await?;
        self.frequencies = frequencies(&consumers);
        self.sequences = sequences;
        Ok(())
    }

    async fn reload_listing(&mut self) {
        if let Err(e) = self.load_sequences().await {
            tracing::warn!(account_id = %self.account_id, error = %e, "failed to reload sequences");
            self.notify(Notification::error(format!("Failed to load sequences: {}", e)));
        }
    }

    async fn reload_tables(&mut self, database_id: &str) -> Result<()> {
        let id = database_id
            .parse::<Uuid>()
            .map_err(|_| Error::NotFound(EntityKind::Database))?;
        let position = self
            .databases
            .iter()
            .position(|db| db.id == id)
            .ok_or(Error::NotFound(EntityKind::Database))?;

        let refreshed = self.services.catalog.refresh_tables(self.account_id, id).await?;
        self.databases[position] = refreshed;
        Ok(())
    }

    async fn live_errors(&self, form: &SequenceForm) -> FieldErrors {
        let (params, mut errors) = form.cast();
        match self.services.repository.validate(self.account_id, &params).await {
            Ok(()) => {}
            Err(Error::FieldValidation(repository_errors)) => {
                merge_new_fields(&mut errors, repository_errors);
            }
            Err(e) => {
                tracing::warn!(account_id = %self.account_id, error = %e, "live validation failed");
            }
        }
        errors
    }

    async fn lookup_sequence(&self, id: &str) -> Result<Sequence> {
        let id = id
            .parse::<Uuid>()
            .map_err(|_| Error::NotFound(EntityKind::Sequence))?;
        self.services.repository.get(self.account_id, id).await
    }

    async fn current_consumer_count(&mut self, sequence_id: Uuid) -> usize {
        match self.services.consumers.list_consumers(self.account_id).await {
            Ok(consumers) => {
                self.frequencies = frequencies(&consumers);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to list consumers, using cached counts");
            }
        }
        self.consumer_count(sequence_id)
    }

    fn cached_database(&self, database_id: Option<Uuid>) -> Result<PostgresDatabase> {
        let id = database_id.ok_or_else(|| {
            Error::CallerInvariant("submitted form has no database id".to_string())
        })?;
        self.databases
            .iter()
            .find(|db| db.id == id)
            .cloned()
            .ok_or_else(|| {
                Error::CallerInvariant(format!("database {} is not among the known databases", id))
            })
    }

    fn verification_failed(
        &mut self,
        error: Error,
        database: &PostgresDatabase,
        table_oid: u32,
    ) -> Result<()> {
        match error {
            Error::NotFound(EntityKind::PublicationMembership) => {
                let message = match (database.publication_name(), database.table(table_oid)) {
                    (Some(publication), Some(table)) => remediation_message(publication, table),
                    _ => "Table is not in the database's publication".to_string(),
                };
                self.fail_submit(message);
                Ok(())
            }
            Error::NotFound(EntityKind::Table) => {
                self.reject(FieldErrors::single(FIELD_TABLE_OID, "table not found"));
                Ok(())
            }
            e if e.is_fatal() => Err(e),
            e => {
                tracing::warn!(database_id = %database.id, table_oid, error = %e, "publication check failed");
                self.fail_submit(format!("Could not verify publication membership: {}", e));
                Ok(())
            }
        }
    }

    /// Return to the form with field-level errors.
    fn reject(&mut self, errors: FieldErrors) {
        tracing::debug!(account_id = %self.account_id, %errors, "sequence form rejected");
        let draft = self.draft.get_or_insert_with(Draft::default);
        draft.errors = errors;
        self.transition(Phase::Drafting);
    }

    /// Return to the form with a message not tied to any field.
    fn fail_submit(&mut self, message: String) {
        let draft = self.draft.get_or_insert_with(Draft::default);
        draft.submit_error = Some(message);
        self.transition(Phase::Drafting);
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn transition(&mut self, to: Phase) {
        if self.phase != to {
            tracing::debug!(account_id = %self.account_id, from = ?self.phase, to = ?to, "workflow transition");
            self.phase = to;
        }
    }
}

/// Add errors for fields that have none yet, so a field that failed to parse
/// is not also reported as blank.
fn merge_new_fields(errors: &mut FieldErrors, other: FieldErrors) {
    for (field, messages) in other.iter() {
        if !errors.has(field) {
            for message in messages {
                errors.add(field, message.clone());
            }
        }
    }
}
