use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use crate::model::{AnalysisOptions, Configuration};

use super::io_pump::LineStream;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Signal {
    Kill,
    Term,
}

#[derive(Debug, Clone)]
pub struct RunnerStartArgs {
    pub cmd: String,
    pub args: Vec<String>,
    pub envs: HashMap<String, String>,
}

/// Everything needed to build one kantra invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KantraRequest {
    pub executable: String,
    pub inputs: BTreeSet<String>,
    pub output_dir: PathBuf,
    pub options: AnalysisOptions,
}

impl KantraRequest {
    pub fn from_configuration(executable: impl Into<String>, configuration: &Configuration) -> Self {
        Self {
            executable: executable.into(),
            inputs: configuration.input_paths(),
            output_dir: configuration.output_location.clone(),
            options: AnalysisOptions::from_configuration(configuration),
        }
    }
}

/// One line of process output, without its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLine {
    pub line: String,
    pub stream: LineStream,
}

/// How a run ended. Delivered exactly once per spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTermination {
    Completed,
    Failed {
        exit_code: Option<i32>,
        message: String,
    },
}

impl RunTermination {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}
