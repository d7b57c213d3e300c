//! In-memory result store for embedding and tests.

use super::ResultSink;
use crate::core::CheckpointResult;
use crate::prelude::*;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Keeps every submitted result in submission order.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResultStore {
    results: Arc<RwLock<Vec<CheckpointResult>>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored results.
    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }

    /// Returns a copy of all stored results.
    pub async fn results(&self) -> Vec<CheckpointResult> {
        self.results.read().await.clone()
    }

    /// Returns the most recently stored result.
    pub async fn latest(&self) -> Option<CheckpointResult> {
        self.results.read().await.last().cloned()
    }

    /// Returns the results of one checkpoint, oldest first.
    pub async fn for_checkpoint(&self, name: &str) -> Vec<CheckpointResult> {
        self.results
            .read()
            .await
            .iter()
            .filter(|r| r.name() == name)
            .cloned()
            .collect()
    }

    /// Clears all stored results.
    pub async fn clear(&self) {
        self.results.write().await.clear();
    }
}

#[async_trait]
impl ResultSink for InMemoryResultStore {
    fn name(&self) -> &str {
        "in_memory_store"
    }

    #[instrument(skip(self, result), fields(run_id = %result.run_id()))]
    async fn submit(&self, result: &CheckpointResult) -> Result<()> {
        let mut results = self.results.write().await;
        results.push(result.clone());
        debug!(stored = results.len(), "Stored checkpoint result");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_store_and_query() {
        let store = InMemoryResultStore::new();
        assert!(store.is_empty().await);

        let start = Utc::now();
        let first = CheckpointResult::new("nightly", start, start, true, vec![]);
        let later = start + Duration::seconds(1);
        let second = CheckpointResult::new("nightly", later, later, false, vec![]);
        let other = CheckpointResult::new("hourly", later, later, true, vec![]);

        let shared = store.clone();
        shared.submit(&first).await.unwrap();
        shared.submit(&second).await.unwrap();
        shared.submit(&other).await.unwrap();

        assert_eq!(store.len().await, 3);
        assert_eq!(store.latest().await.unwrap().name(), "hourly");
        let nightly = store.for_checkpoint("nightly").await;
        assert_eq!(nightly.len(), 2);
        assert_eq!(nightly[0], first);

        store.clear().await;
        assert!(store.is_empty().await);
    }
}
