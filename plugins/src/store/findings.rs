use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use windup_core::ingest::{FindingSet, FindingStore};

use super::{file_stem, write_atomic};

/// One JSON document per configuration under `<data_dir>/findings`.
pub struct JsonFindingStore {
    dir: PathBuf,
}

impl JsonFindingStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: data_dir.into().join("findings"),
        }
    }

    fn path_for(&self, configuration: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(configuration)))
    }
}

#[async_trait]
impl FindingStore for JsonFindingStore {
    async fn replace(&self, configuration: &str, findings: &FindingSet) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(findings)?;
        write_atomic(&self.path_for(configuration), &bytes).await
    }

    async fn load(&self, configuration: &str) -> anyhow::Result<Option<FindingSet>> {
        let path = self.path_for(configuration);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?,
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
        }
    }
}
