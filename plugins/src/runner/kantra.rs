use anyhow::Result;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use windup_core::runner::{RunOutcome, RunnerPlugin, RunnerSession, RunnerStartArgs, Signal};

/// Spawns kantra as a local child process.
pub struct KantraRunnerPlugin {}

impl KantraRunnerPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for KantraRunnerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunnerPlugin for KantraRunnerPlugin {
    fn name(&self) -> &str {
        "kantra"
    }

    async fn start_session(&self, args: &RunnerStartArgs) -> Result<Box<dyn RunnerSession>> {
        let child = Command::new(&args.cmd)
            .args(&args.args)
            .envs(&args.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        tracing::debug!(pid = ?child.id(), cmd = %args.cmd, "kantra spawned");

        Ok(Box::new(KantraRunnerSession {
            child,
            started: Instant::now(),
        }))
    }
}

struct KantraRunnerSession {
    child: Child,
    started: Instant,
}

#[async_trait]
impl RunnerSession for KantraRunnerSession {
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn signal(&mut self, signal: Signal) -> Result<()> {
        // tokio only exposes SIGKILL; both signals end the process.
        tracing::debug!(?signal, pid = ?self.child.id(), "signalling kantra");
        match self.child.start_kill() {
            Ok(()) => Ok(()),
            // Already reaped.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn wait(&mut self) -> Result<RunOutcome> {
        let status = self.child.wait().await?;
        Ok(RunOutcome {
            exit_code: status.code().unwrap_or(-1),
            duration_ms: Some(self.started.elapsed().as_millis() as u64),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::io::AsyncReadExt;

    fn sh(script: &str) -> RunnerStartArgs {
        RunnerStartArgs {
            cmd: "/bin/sh".into(),
            args: vec!["-c".into(), script.into()],
            envs: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let plugin = KantraRunnerPlugin::new();
        let mut session = plugin
            .start_session(&sh("echo out; echo err 1>&2; exit 3"))
            .await
            .unwrap();
        let mut out = String::new();
        session.stdout().unwrap().read_to_string(&mut out).await.unwrap();
        let mut err = String::new();
        session.stderr().unwrap().read_to_string(&mut err).await.unwrap();
        let outcome = session.wait().await.unwrap();

        assert_eq!(out, "out\n");
        assert_eq!(err, "err\n");
        assert_eq!(outcome.exit_code, 3);
        assert!(session.stdout().is_none());
    }

    #[tokio::test]
    async fn kill_ends_a_long_running_process() {
        let plugin = KantraRunnerPlugin::new();
        let mut session = plugin.start_session(&sh("sleep 30")).await.unwrap();
        session.signal(Signal::Kill).await.unwrap();
        let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), session.wait())
            .await
            .unwrap()
            .unwrap();
        assert_ne!(outcome.exit_code, 0);
        // A second kill after exit is harmless.
        session.signal(Signal::Kill).await.unwrap();
    }

    #[tokio::test]
    async fn missing_executable_fails_to_start() {
        let plugin = KantraRunnerPlugin::new();
        let args = RunnerStartArgs {
            cmd: "/nonexistent/kantra".into(),
            args: vec![],
            envs: HashMap::new(),
        };
        assert!(plugin.start_session(&args).await.is_err());
    }
}
