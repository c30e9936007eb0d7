//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `windup_core::api` instead of reaching into internal modules.

pub use crate::catalog::{catalog, OptionDescription, OptionIssue, OptionType, UiType};
pub use crate::config::{load_default, load_from_path, AppConfig, LoggingConfig, RunnerConfig};
pub use crate::console::ConsoleSink;
pub use crate::error::{
    CliError, IngestError, LaunchError, LauncherError, RunnerError, EMPTY_INPUT_MESSAGE,
    LAUNCH_ERROR_TITLE, OUTPUT_EXISTS_MESSAGE,
};
pub use crate::ingest::{
    Finding, FindingSet, FindingStore, MemoryFindingStore, ResultIngestionPipeline, Severity,
    SourceLocation,
};
pub use crate::launch::{
    ConfigurationStore, LaunchCoordinator, LaunchEvent, LaunchServices, LauncherSettings,
    MarkerService, Notice, NoticeLevel, Notifier, ProgressMonitor, ReportRenderer, RunPhase,
    RunStateSnapshot,
};
pub use crate::launcher::{AnalysisServer, ServerLauncher, StartupCallback, StartupProgress};
pub use crate::model::{AnalysisOptions, Configuration, InputLocation, OptionPair};
pub use crate::runner::{
    LineSink, ProcessRunner, RunHandle, RunLine, RunOutcome, RunTermination, RunnerPlugin,
    RunnerSession, RunnerStartArgs, Signal,
};
