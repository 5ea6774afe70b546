//! Sequence repository contract.

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{CreateSequence, Sequence};
use crate::error::Result;

/// Account-scoped persistence of sequence records.
///
/// Each call is atomic from the caller's point of view.
#[async_trait]
pub trait SequenceRepository: Send + Sync {
    /// Run creation validation without persisting anything.
    async fn validate(&self, account_id: Uuid, params: &CreateSequence) -> Result<()>;

    /// Validate and persist a new, unenriched sequence.
    async fn create(&self, account_id: Uuid, params: &CreateSequence) -> Result<Sequence>;

    /// Get a sequence owned by the account.
    async fn get(&self, account_id: Uuid, sequence_id: Uuid) -> Result<Sequence>;

    /// List the account's sequences, oldest first.
    async fn list(&self, account_id: Uuid) -> Result<Vec<Sequence>>;

    /// Overwrite an existing sequence's cached display fields.
    async fn update(&self, sequence: &Sequence) -> Result<Sequence>;

    /// Delete a sequence, returning the removed record.
    async fn delete(&self, sequence: &Sequence) -> Result<Sequence>;
}
