//! Sequence records and their persistence.
//!
//! A sequence is created in two phases: a draft keyed only by identifiers
//! (database id, table oid, sort column attnum) is validated and stored, then
//! enrichment fills the cached display names from the catalog.

mod form;
mod model;
mod repository;
mod store;

pub use form::SequenceForm;
pub use model::{
    CreateSequence, RequiredFields, Sequence, FIELD_DATABASE_ID, FIELD_SORT_COLUMN,
    FIELD_TABLE_OID,
};
pub use repository::SequenceRepository;
pub use store::SequenceStore;
