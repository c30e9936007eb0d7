mod coordinator;
mod events;
mod monitor;
mod run_state;
mod services;
mod transitions;

pub use coordinator::{LaunchCoordinator, LauncherSettings};
pub use events::LaunchEvent;
pub use monitor::ProgressMonitor;
pub use run_state::{RunState, RunStateSnapshot};
pub use services::{
    ConfigurationStore, LaunchServices, MarkerService, MemoryConfigurationStore,
    NoopMarkerService, NoopReportRenderer, Notice, NoticeLevel, Notifier, ReportRenderer,
    TracingNotifier,
};
pub use transitions::{RunPhase, RunTransition, TransitionError};
