//! seqmgr core - sequence bindings between Postgres tables and change capture.
//!
//! This crate manages the metadata and validity of sequences: which source
//! table and sort column a sequence binds, whether that table is exposed by
//! the source's publication, and how many consumers depend on it.

pub mod catalog;
pub mod enrichment;
pub mod error;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod publication;
pub mod sequence;
pub mod usage;
pub mod workflow;

pub use catalog::{CatalogMirror, Column, MemoryCatalog, PostgresDatabase, ReplicationSlot, Table};
pub use enrichment::{enrich, update_sequence_from_db};
pub use error::{EntityKind, Error, FieldErrors, Result};
pub use publication::{PublicationVerifier, StaticPublicationVerifier};
pub use sequence::{CreateSequence, Sequence, SequenceForm, SequenceRepository, SequenceStore};
pub use usage::{frequencies, Consumer, ConsumerSource, MemoryConsumers};
pub use workflow::{
    DeletePolicy, Event, EventOutcome, Notification, NotificationKind, Phase, SequenceWorkflow,
    Services, WorkflowConfig, WorkflowView,
};
