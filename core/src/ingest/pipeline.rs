use std::sync::Arc;

use crate::error::IngestError;
use crate::model::Configuration;

use super::finding::FindingSet;
use super::parse::parse_output;
use super::store::FindingStore;

/// Name of the findings document kantra writes into the output directory.
pub const OUTPUT_FILE: &str = "output.yaml";

pub struct ResultIngestionPipeline {
    store: Arc<dyn FindingStore>,
}

impl ResultIngestionPipeline {
    pub fn new(store: Arc<dyn FindingStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn FindingStore> {
        &self.store
    }

    /// Parses the run's output and replaces the stored findings for this configuration.
    ///
    /// Any error leaves the previously stored findings untouched.
    pub async fn ingest(&self, configuration: &Configuration) -> Result<FindingSet, IngestError> {
        let path = configuration.output_dir().join(OUTPUT_FILE);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IngestError::Missing(path))
            }
            Err(source) => return Err(IngestError::Read { path, source }),
        };

        let findings = parse_output(&text, &configuration.input_paths())?;
        self.store.replace(&configuration.name, &findings).await?;

        tracing::info!(
            configuration = %configuration.name,
            findings = findings.len(),
            path = %path.display(),
            "ingested analysis results"
        );
        Ok(findings)
    }

    pub async fn load(&self, configuration: &str) -> anyhow::Result<Option<FindingSet>> {
        self.store.load(configuration).await
    }
}
