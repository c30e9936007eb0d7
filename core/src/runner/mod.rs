mod args;
mod handle;
mod io_pump;
mod process;
mod traits;
pub mod types;

pub use args::build_kantra_args;
pub use handle::RunHandle;
pub use io_pump::LineStream;
pub use process::{ProcessRunner, TerminalCallback};
pub use traits::{LineSink, RunnerPlugin, RunnerSession};
pub use types::{KantraRequest, RunLine, RunOutcome, RunTermination, RunnerStartArgs, Signal};
