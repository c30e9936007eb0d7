use std::path::PathBuf;

use thiserror::Error;

pub const LAUNCH_ERROR_TITLE: &str = "Windup launch error";
pub const EMPTY_INPUT_MESSAGE: &str =
    "Unable to launch. Input is empty. Please add at least one project or folder to analyze.";
pub const OUTPUT_EXISTS_MESSAGE: &str =
    "Output location already exists. `--overwrite` option is required.";

#[derive(Error, Debug)]
pub enum CliError {
    #[error("runner failed: {0}")]
    Runner(#[from] RunnerError),
    #[error("launch rejected: {0}")]
    Launch(#[from] LaunchError),
    #[error("ingestion failed: {0}")]
    Ingest(#[from] IngestError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("config error: {0}")]
    Config(String),
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        source: std::io::Error,
    },
    #[error("plugin error: {0}")]
    Plugin(#[from] anyhow::Error),
}

/// Reasons a launch never reaches `Running`.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("{}", EMPTY_INPUT_MESSAGE)]
    EmptyInput,
    #[error("{}", OUTPUT_EXISTS_MESSAGE)]
    OutputExists { path: PathBuf },
    #[error("invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },
    #[error("unable to create output location {}: {source}", .path.display())]
    Preparation {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to start analysis: {0}")]
    HostFailure(#[from] RunnerError),
}

impl LaunchError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput | Self::OutputExists { .. } | Self::InvalidOption { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("analysis output not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("unable to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed analysis output: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("finding store error: {0}")]
    Store(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("analysis server is not executable - {}", .0.display())]
    NotExecutable(PathBuf),
    #[error("analysis server did not start within {0} ms")]
    StartupTimeout(u64),
    #[error("analysis server failed to start: {0}")]
    Start(String),
}
