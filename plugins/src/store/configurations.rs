use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::Mutex;
use windup_core::launch::ConfigurationStore;
use windup_core::model::Configuration;

use super::write_atomic;

pub const CONFIGURATIONS_FILE: &str = "configurations.json";

/// All configurations in one JSON array under the data dir.
pub struct JsonConfigurationStore {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl JsonConfigurationStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(CONFIGURATIONS_FILE),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> anyhow::Result<Vec<Configuration>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parse {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("read {}", self.path.display())),
        }
    }
}

#[async_trait]
impl ConfigurationStore for JsonConfigurationStore {
    async fn find(&self, name: &str) -> anyhow::Result<Option<Configuration>> {
        let _g = self.lock.lock().await;
        Ok(self.read_all().await?.into_iter().find(|c| c.name == name))
    }

    async fn save(&self, configuration: &Configuration) -> anyhow::Result<()> {
        let _g = self.lock.lock().await;
        let mut all = self.read_all().await?;
        match all.iter_mut().find(|c| c.name == configuration.name) {
            Some(existing) => *existing = configuration.clone(),
            None => all.push(configuration.clone()),
        }
        all.sort_by(|a, b| a.name.cmp(&b.name));
        let bytes = serde_json::to_vec_pretty(&all)?;
        write_atomic(&self.path, &bytes).await
    }

    async fn list(&self) -> anyhow::Result<Vec<Configuration>> {
        let _g = self.lock.lock().await;
        self.read_all().await
    }
}
