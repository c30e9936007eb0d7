use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::types::{RunLine, RunOutcome, RunnerStartArgs, Signal};

#[async_trait]
pub trait RunnerSession: Send {
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    async fn signal(&mut self, signal: Signal) -> anyhow::Result<()>;
    /// Must be cancel-safe: the runner drops a pending `wait` to deliver a signal.
    async fn wait(&mut self) -> anyhow::Result<RunOutcome>;
}

#[async_trait]
pub trait RunnerPlugin: Send + Sync {
    fn name(&self) -> &str;
    async fn start_session(&self, args: &RunnerStartArgs)
        -> anyhow::Result<Box<dyn RunnerSession>>;
}

/// Receives process output. Calls for one run are serialized and arrive in emission order.
pub trait LineSink: Send + Sync {
    fn on_line(&self, line: &RunLine);
}
