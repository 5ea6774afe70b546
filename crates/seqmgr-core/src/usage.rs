//! Consumer usage index.
//!
//! Counts how many consumers reference each sequence. The map is derived on
//! demand and never persisted.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// A downstream consumer, reduced to what usage counting needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    /// Sequence the consumer reads from, if any.
    #[serde(default)]
    pub sequence_id: Option<Uuid>,
}

impl Consumer {
    /// Create a consumer bound to an optional sequence.
    pub fn new(account_id: Uuid, name: impl Into<String>, sequence_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            name: name.into(),
            sequence_id,
        }
    }
}

/// Count consumers per referenced sequence.
///
/// Consumers without a sequence are not counted; sequences nobody references
/// are absent from the map.
pub fn frequencies<'a, I>(consumers: I) -> HashMap<Uuid, usize>
where
    I: IntoIterator<Item = &'a Consumer>,
{
    let mut counts = HashMap::new();
    for sequence_id in consumers.into_iter().filter_map(|c| c.sequence_id) {
        *counts.entry(sequence_id).or_insert(0) += 1;
    }
    counts
}

/// The consumer subsystem, as seen by this crate.
#[async_trait]
pub trait ConsumerSource: Send + Sync {
    /// List every consumer the account owns.
    async fn list_consumers(&self, account_id: Uuid) -> Result<Vec<Consumer>>;
}

/// In-memory consumer source.
#[derive(Default)]
pub struct MemoryConsumers {
    consumers: RwLock<Vec<Consumer>>,
}

impl MemoryConsumers {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source holding the given consumers.
    pub fn with_consumers(consumers: impl IntoIterator<Item = Consumer>) -> Self {
        Self {
            consumers: RwLock::new(consumers.into_iter().collect()),
        }
    }

    /// Add a consumer.
    pub fn insert(&self, consumer: Consumer) {
        self.consumers.write().push(consumer);
    }

    /// Remove a consumer by id.
    pub fn remove(&self, consumer_id: Uuid) -> bool {
        let mut guard = self.consumers.write();
        let before = guard.len();
        guard.retain(|c| c.id != consumer_id);
        guard.len() != before
    }
}

#[async_trait]
impl ConsumerSource for MemoryConsumers {
    async fn list_consumers(&self, account_id: Uuid) -> Result<Vec<Consumer>> {
        Ok(self
            .consumers
            .read()
            .iter()
            .filter(|c| c.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequencies_counts_per_sequence() {
        let account = Uuid::new_v4();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        let consumers = vec![
            Consumer::new(account, "a", Some(s1)),
            Consumer::new(account, "b", Some(s1)),
            Consumer::new(account, "c", Some(s2)),
            Consumer::new(account, "d", None),
        ];

        let counts = frequencies(&consumers);
        assert_eq!(counts.get(&s1), Some(&2));
        assert_eq!(counts.get(&s2), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_frequencies_empty() {
        assert!(frequencies(&Vec::new()).is_empty());
    }

    #[test]
    fn test_frequencies_match_filter_count() {
        let account = Uuid::new_v4();
        let sequences: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let consumers: Vec<Consumer> = (0..23)
            .map(|i| {
                let sequence = if i % 5 == 0 { None } else { Some(sequences[i % 3]) };
                Consumer::new(account, format!("c{}", i), sequence)
            })
            .collect();

        let counts = frequencies(&consumers);
        for sequence in &sequences {
            let expected = consumers
                .iter()
                .filter(|c| c.sequence_id == Some(*sequence))
                .count();
            assert_eq!(counts.get(sequence).copied().unwrap_or(0), expected);
        }
    }

    #[tokio::test]
    async fn test_memory_consumers_account_scoped() {
        let account = Uuid::new_v4();
        let source = MemoryConsumers::with_consumers([
            Consumer::new(account, "mine", None),
            Consumer::new(Uuid::new_v4(), "theirs", None),
        ]);
        let extra = Consumer::new(account, "extra", None);
        let extra_id = extra.id;
        source.insert(extra);

        assert_eq!(source.list_consumers(account).await.unwrap().len(), 2);
        assert!(source.remove(extra_id));
        assert!(!source.remove(extra_id));
        assert_eq!(source.list_consumers(account).await.unwrap().len(), 1);
    }
}
