use serde::{Deserialize, Serialize};

/// Used when no kantra home has been configured.
pub const DEFAULT_KANTRA_HOME: &str = "/usr/local/bin/kantra";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub launcher: LauncherConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "windup_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Path to the kantra executable. Empty means [`DEFAULT_KANTRA_HOME`].
    #[serde(default)]
    pub kantra_home: String,

    #[serde(default = "default_line_channel_capacity")]
    pub line_channel_capacity: usize,

    /// Bytes of stderr kept for failure messages.
    #[serde(default = "default_capture_bytes")]
    pub capture_bytes: usize,
}

fn default_line_channel_capacity() -> usize {
    1024
}

fn default_capture_bytes() -> usize {
    16 * 1024
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            kantra_home: String::new(),
            line_channel_capacity: default_line_channel_capacity(),
            capture_bytes: default_capture_bytes(),
        }
    }
}

impl RunnerConfig {
    pub fn executable(&self) -> String {
        let home = self.kantra_home.trim();
        if home.is_empty() {
            DEFAULT_KANTRA_HOME.to_string()
        } else {
            home.to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Long-lived analysis server to bring up before each launch. Unset means kantra runs alone.
    #[serde(default)]
    pub server: Option<String>,

    #[serde(default)]
    pub server_args: Vec<String>,

    /// Output line by which the server reports readiness.
    #[serde(default = "default_ready_marker")]
    pub ready_marker: String,

    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,

    #[serde(default = "default_startup_polls")]
    pub startup_polls: u32,
}

fn default_ready_marker() -> String {
    "server started".to_string()
}

fn default_startup_timeout_ms() -> u64 {
    15_000
}

fn default_startup_polls() -> u32 {
    7
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            server: None,
            server_args: Vec::new(),
            ready_marker: default_ready_marker(),
            startup_timeout_ms: default_startup_timeout_ms(),
            startup_polls: default_startup_polls(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Where configurations, findings and markers are persisted. Defaults to ~/.windup.
    #[serde(default)]
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Echo analysis output to stdout.
    #[serde(default = "default_console_echo")]
    pub echo: bool,

    /// Also append analysis output to `<data_dir>/console.log`.
    #[serde(default)]
    pub log_file: bool,

    #[serde(default = "default_console_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_console_echo() -> bool {
    true
}

fn default_console_channel_capacity() -> usize {
    2048
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            echo: default_console_echo(),
            log_file: false,
            channel_capacity: default_console_channel_capacity(),
        }
    }
}
