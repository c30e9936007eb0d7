use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use windup_core::config::{get_windup_data_dir, AppConfig};
use windup_core::console::{ConsoleSink, CONSOLE_LOG_FILE};
use windup_core::ingest::{FindingStore, ResultIngestionPipeline};
use windup_core::launch::{LaunchServices, Notifier};
use windup_core::launcher::ServerLauncher;
use windup_core::runner::{LineSink, ProcessRunner, RunnerPlugin};

use crate::markers::JsonMarkerService;
use crate::report::TextReportRenderer;
use crate::runner::KantraRunnerPlugin;
use crate::server::ProcessAnalysisServer;
use crate::store::{JsonConfigurationStore, JsonFindingStore};

pub fn data_dir(cfg: &AppConfig) -> Result<PathBuf> {
    match cfg.store.data_dir.as_deref().map(str::trim) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => get_windup_data_dir(),
    }
}

pub fn build_runner(cfg: &AppConfig) -> ProcessRunner {
    let plugin: Arc<dyn RunnerPlugin> = Arc::new(KantraRunnerPlugin::new());
    ProcessRunner::new(plugin, &cfg.runner)
}

pub fn build_finding_store(cfg: &AppConfig) -> Result<Arc<dyn FindingStore>> {
    Ok(Arc::new(JsonFindingStore::new(data_dir(cfg)?)))
}

/// Must be called inside a tokio runtime: the console log writer is spawned here.
pub fn build_console(cfg: &AppConfig) -> Result<Arc<dyn LineSink>> {
    let log_path = if cfg.console.log_file {
        Some(data_dir(cfg)?.join(CONSOLE_LOG_FILE))
    } else {
        None
    };
    Ok(Arc::new(ConsoleSink::start(&cfg.console, log_path)))
}

pub fn build_services(cfg: &AppConfig, notifier: Arc<dyn Notifier>) -> Result<LaunchServices> {
    let dir = data_dir(cfg)?;
    tracing::debug!(data_dir = %dir.display(), "building launch services");
    Ok(LaunchServices {
        notifier,
        markers: Arc::new(JsonMarkerService::new(&dir)),
        reports: Arc::new(TextReportRenderer),
        configurations: Arc::new(JsonConfigurationStore::new(&dir)),
        ingestion: Arc::new(ResultIngestionPipeline::new(build_finding_store(cfg)?)),
        console: build_console(cfg)?,
    })
}

/// Launcher for the configured analysis server, if one is configured.
pub fn build_server_launcher(cfg: &AppConfig, services: &LaunchServices) -> Option<ServerLauncher> {
    let server = ProcessAnalysisServer::from_config(&cfg.launcher)?;
    Some(ServerLauncher::new(
        Arc::new(server),
        services.markers.clone(),
        services.notifier.clone(),
        services.console.clone(),
        cfg.launcher.clone(),
    ))
}
