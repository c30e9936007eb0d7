//! Outbound collaborators of the coordinator: user notices, markers, reports, persistence.
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::ingest::{FindingSet, ResultIngestionPipeline};
use crate::model::Configuration;
use crate::runner::LineSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Something the user has to see, the equivalent of a message dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice);
}

#[async_trait]
pub trait MarkerService: Send + Sync {
    /// Drops every marker left by previous runs.
    async fn delete_all(&self) -> anyhow::Result<()>;
    /// Returns the number of markers created.
    async fn generate(
        &self,
        configuration: &Configuration,
        findings: &FindingSet,
    ) -> anyhow::Result<usize>;
}

#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, configuration: &Configuration, findings: &FindingSet)
        -> anyhow::Result<()>;
}

#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn find(&self, name: &str) -> anyhow::Result<Option<Configuration>>;
    /// Inserts or replaces by name.
    async fn save(&self, configuration: &Configuration) -> anyhow::Result<()>;
    async fn list(&self) -> anyhow::Result<Vec<Configuration>>;
}

#[derive(Clone)]
pub struct LaunchServices {
    pub notifier: Arc<dyn Notifier>,
    pub markers: Arc<dyn MarkerService>,
    pub reports: Arc<dyn ReportRenderer>,
    pub configurations: Arc<dyn ConfigurationStore>,
    pub ingestion: Arc<ResultIngestionPipeline>,
    pub console: Arc<dyn LineSink>,
}

/// Sends notices to the log only.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(title = %notice.title, "{}", notice.message),
            NoticeLevel::Error => tracing::error!(title = %notice.title, "{}", notice.message),
        }
    }
}

pub struct NoopMarkerService;

#[async_trait]
impl MarkerService for NoopMarkerService {
    async fn delete_all(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn generate(&self, _: &Configuration, findings: &FindingSet) -> anyhow::Result<usize> {
        Ok(findings.len())
    }
}

pub struct NoopReportRenderer;

#[async_trait]
impl ReportRenderer for NoopReportRenderer {
    async fn render(&self, _: &Configuration, _: &FindingSet) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryConfigurationStore {
    inner: RwLock<BTreeMap<String, Configuration>>,
}

impl MemoryConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigurationStore for MemoryConfigurationStore {
    async fn find(&self, name: &str) -> anyhow::Result<Option<Configuration>> {
        Ok(self.inner.read().await.get(name).cloned())
    }

    async fn save(&self, configuration: &Configuration) -> anyhow::Result<()> {
        self.inner
            .write()
            .await
            .insert(configuration.name.clone(), configuration.clone());
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<Vec<Configuration>> {
        Ok(self.inner.read().await.values().cloned().collect())
    }
}
