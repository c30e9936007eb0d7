mod load;
mod types;

pub use load::{expand_path, get_windup_data_dir, load_default, load_from_path};
pub use types::{
    AppConfig, ConsoleConfig, LauncherConfig, LoggingConfig, RunnerConfig, StoreConfig,
    DEFAULT_KANTRA_HOME,
};
