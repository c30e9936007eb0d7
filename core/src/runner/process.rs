//! Drives one kantra process: line pumping, kill delivery, exit detection and the single
//! terminal callback.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, watch};

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::util::RingBytes;

use super::args::build_kantra_args;
use super::handle::RunHandle;
use super::io_pump::{self, LineStream};
use super::traits::{LineSink, RunnerPlugin, RunnerSession};
use super::types::{KantraRequest, RunLine, RunOutcome, RunTermination, RunnerStartArgs, Signal};

/// Invoked exactly once when the process exits; the runner awaits the returned future.
pub type TerminalCallback = Box<dyn FnOnce(RunTermination) -> BoxFuture<'static, ()> + Send>;

/// After exit, how long to wait for the output pipes to close before giving up on them.
const DRAIN_GRACE: Duration = Duration::from_secs(5);
const FAILURE_TAIL_LINES: usize = 5;

#[derive(Clone)]
pub struct ProcessRunner {
    plugin: Arc<dyn RunnerPlugin>,
    line_channel_capacity: usize,
    capture_bytes: usize,
}

impl ProcessRunner {
    pub fn new(plugin: Arc<dyn RunnerPlugin>, cfg: &RunnerConfig) -> Self {
        Self {
            plugin,
            line_channel_capacity: cfg.line_channel_capacity.max(1),
            capture_bytes: cfg.capture_bytes,
        }
    }

    pub fn plugin_name(&self) -> &str {
        self.plugin.name()
    }

    /// Spawns kantra and returns as soon as the process is running.
    ///
    /// A spawn failure is returned as `RunnerError::Spawn` and no callback fires.
    pub async fn run(
        &self,
        run_id: &str,
        request: &KantraRequest,
        sink: Arc<dyn LineSink>,
        on_terminal: TerminalCallback,
    ) -> Result<RunHandle, RunnerError> {
        let start = RunnerStartArgs {
            cmd: request.executable.clone(),
            args: build_kantra_args(request),
            envs: HashMap::new(),
        };
        tracing::info!(
            run_id = %run_id,
            plugin = %self.plugin.name(),
            cmd = %start.cmd,
            args = ?start.args,
            "starting analysis process"
        );

        let mut session = self
            .plugin
            .start_session(&start)
            .await
            .map_err(|e| RunnerError::Spawn(format!("{}: {e}", start.cmd)))?;

        let stdout = session.stdout();
        let stderr = session.stderr();
        let (Some(stdout), Some(stderr)) = (stdout, stderr) else {
            let _ = session.signal(Signal::Kill).await;
            return Err(RunnerError::Spawn("process has no output pipes".into()));
        };

        let (kill_tx, kill_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);

        let driver = RunDriver {
            run_id: run_id.to_string(),
            session,
            kill_rx,
            sink,
            line_channel_capacity: self.line_channel_capacity,
            stderr_ring: RingBytes::new(self.capture_bytes),
        };
        tokio::spawn(async move {
            let termination = driver.drive(stdout, stderr).await;
            on_terminal(termination).await;
            let _ = done_tx.send(true);
        });

        Ok(RunHandle::new(run_id.to_string(), kill_tx, done_rx))
    }
}

struct RunDriver {
    run_id: String,
    session: Box<dyn RunnerSession>,
    kill_rx: watch::Receiver<bool>,
    sink: Arc<dyn LineSink>,
    line_channel_capacity: usize,
    stderr_ring: Arc<RingBytes>,
}

impl RunDriver {
    async fn drive(
        mut self,
        stdout: Box<dyn AsyncRead + Unpin + Send>,
        stderr: Box<dyn AsyncRead + Unpin + Send>,
    ) -> RunTermination {
        let started_at = Instant::now();
        let (line_tx, mut line_rx) = mpsc::channel::<RunLine>(self.line_channel_capacity);
        let out_task = io_pump::pump_lines(stdout, LineStream::Stdout, None, line_tx.clone());
        let err_task = io_pump::pump_lines(
            stderr,
            LineStream::Stderr,
            Some(self.stderr_ring.clone()),
            line_tx,
        );

        let mut delivered = 0u64;
        let mut kill_sent = false;
        let mut watch_kill = true;

        let waited = loop {
            let status = {
                let wait_fut = self.session.wait();
                tokio::pin!(wait_fut);
                loop {
                    tokio::select! {
                        res = &mut wait_fut => break Some(res),

                        changed = self.kill_rx.changed(), if watch_kill && !kill_sent => {
                            match changed {
                                Ok(()) if *self.kill_rx.borrow_and_update() => break None,
                                Ok(()) => {}
                                // Every handle dropped: nobody can ask for a kill any more.
                                Err(_) => watch_kill = false,
                            }
                        }

                        Some(line) = line_rx.recv() => {
                            self.sink.on_line(&line);
                            delivered += 1;
                        }
                    }
                }
            };

            match status {
                Some(res) => break res,
                None => {
                    kill_sent = true;
                    tracing::warn!(run_id = %self.run_id, "killing analysis process");
                    if let Err(e) = self.session.signal(Signal::Kill).await {
                        tracing::warn!(run_id = %self.run_id, error = %e, "kill failed");
                    }
                }
            }
        };

        // Flush whatever the pipes still hold before reporting the exit.
        let sink = self.sink.clone();
        let drain = async {
            while let Some(line) = line_rx.recv().await {
                sink.on_line(&line);
                delivered += 1;
            }
        };
        if tokio::time::timeout(DRAIN_GRACE, drain).await.is_err() {
            tracing::warn!(
                run_id = %self.run_id,
                "output pipes still open after exit, dropping remaining output"
            );
            out_task.abort();
            err_task.abort();
        }
        for (label, task) in [("stdout", out_task), ("stderr", err_task)] {
            match task.await {
                Ok(Err(e)) => tracing::warn!(run_id = %self.run_id, stream = label, error = %e),
                Ok(Ok(_)) | Err(_) => {}
            }
        }

        let duration_ms = started_at.elapsed().as_millis() as u64;
        let termination = self.classify(waited);
        tracing::info!(
            run_id = %self.run_id,
            lines = delivered,
            duration_ms = duration_ms,
            success = termination.is_success(),
            "analysis process finished"
        );
        termination
    }

    fn classify(&self, waited: anyhow::Result<RunOutcome>) -> RunTermination {
        match waited {
            Ok(outcome) if outcome.exit_code == 0 => RunTermination::Completed,
            Ok(outcome) => {
                let mut message = format!("kantra exited with code {}", outcome.exit_code);
                let tail = self.stderr_ring.tail_lines(FAILURE_TAIL_LINES);
                if !tail.is_empty() {
                    message.push_str(": ");
                    message.push_str(&tail.join("\n"));
                }
                RunTermination::Failed {
                    exit_code: Some(outcome.exit_code),
                    message,
                }
            }
            Err(e) => RunTermination::Failed {
                exit_code: None,
                message: format!("waiting for kantra failed: {e}"),
            },
        }
    }
}
