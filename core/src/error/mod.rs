#[allow(clippy::module_inception)]
pub mod error;

pub use error::{
    CliError, IngestError, LaunchError, LauncherError, RunnerError, EMPTY_INPUT_MESSAGE,
    LAUNCH_ERROR_TITLE, OUTPUT_EXISTS_MESSAGE,
};
