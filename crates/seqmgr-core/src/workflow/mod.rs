//! Sequence workflow controller.
//!
//! Orchestrates the catalog mirror, publication verifier, sequence repository,
//! enrichment and usage index for one UI session's create, list and delete
//! interactions.

mod config;
mod controller;
mod state;
mod view;

pub use config::{DeletePolicy, WorkflowConfig};
pub use controller::{SequenceWorkflow, Services};
pub use state::{Draft, Event, EventOutcome, Phase};
pub use view::{
    DatabaseRef, DatabaseView, FormView, Notification, NotificationKind, SequenceView,
    WorkflowView,
};
