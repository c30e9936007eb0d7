//! Problem markers persisted as JSON, the headless stand-in for IDE annotations.
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use windup_core::ingest::{FindingSet, Severity};
use windup_core::launch::MarkerService;
use windup_core::model::Configuration;

use crate::store::{file_stem, write_atomic};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub configuration: String,
    pub file: String,
    pub line: Option<u32>,
    pub severity: Severity,
    pub rule_id: String,
    pub title: String,
}

/// Markers of every configuration under `<data_dir>/markers`.
pub struct JsonMarkerService {
    dir: PathBuf,
}

impl JsonMarkerService {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: data_dir.into().join("markers"),
        }
    }

    pub async fn load(&self, configuration: &str) -> anyhow::Result<Vec<Marker>> {
        let path = self.dir.join(format!("{}.json", file_stem(configuration)));
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
        }
    }
}

#[async_trait]
impl MarkerService for JsonMarkerService {
    async fn delete_all(&self) -> anyhow::Result<()> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).with_context(|| format!("list {}", self.dir.display())),
        };
        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                tokio::fs::remove_file(&path)
                    .await
                    .with_context(|| format!("remove {}", path.display()))?;
                removed += 1;
            }
        }
        tracing::debug!(removed, "markers cleared");
        Ok(())
    }

    async fn generate(
        &self,
        configuration: &Configuration,
        findings: &FindingSet,
    ) -> anyhow::Result<usize> {
        let markers: Vec<Marker> = findings
            .iter()
            .map(|f| Marker {
                configuration: configuration.name.clone(),
                file: f.location.file.clone(),
                line: f.location.line,
                severity: f.severity,
                rule_id: f.rule_id.clone(),
                title: f.title.clone(),
            })
            .collect();
        let path = self
            .dir
            .join(format!("{}.json", file_stem(&configuration.name)));
        write_atomic(&path, &serde_json::to_vec_pretty(&markers)?).await?;
        Ok(markers.len())
    }
}
