use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::finding::FindingSet;

/// Persisted findings, one set per configuration.
#[async_trait]
pub trait FindingStore: Send + Sync {
    /// Replaces the stored set as a whole. On error the previous set must still be intact.
    async fn replace(&self, configuration: &str, findings: &FindingSet) -> anyhow::Result<()>;
    async fn load(&self, configuration: &str) -> anyhow::Result<Option<FindingSet>>;
}

#[derive(Default)]
pub struct MemoryFindingStore {
    inner: RwLock<BTreeMap<String, FindingSet>>,
}

impl MemoryFindingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FindingStore for MemoryFindingStore {
    async fn replace(&self, configuration: &str, findings: &FindingSet) -> anyhow::Result<()> {
        self.inner
            .write()
            .await
            .insert(configuration.to_string(), findings.clone());
        Ok(())
    }

    async fn load(&self, configuration: &str) -> anyhow::Result<Option<FindingSet>> {
        Ok(self.inner.read().await.get(configuration).cloned())
    }
}
