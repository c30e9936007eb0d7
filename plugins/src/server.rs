use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use windup_core::config::LauncherConfig;
use windup_core::launcher::{AnalysisServer, StartupCallback};

/// Analysis server run as a child process that announces readiness on its output.
pub struct ProcessAnalysisServer {
    home: PathBuf,
    args: Vec<String>,
    ready_marker: String,
    child: Mutex<Option<Child>>,
}

impl ProcessAnalysisServer {
    pub fn new(home: impl Into<PathBuf>, args: Vec<String>, ready_marker: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            args,
            ready_marker: ready_marker.into(),
            child: Mutex::new(None),
        }
    }

    pub fn from_config(cfg: &LauncherConfig) -> Option<Self> {
        let home = cfg.server.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        let home = shellexpand::tilde(home).to_string();
        Some(Self::new(home, cfg.server_args.clone(), cfg.ready_marker.clone()))
    }
}

#[async_trait]
impl AnalysisServer for ProcessAnalysisServer {
    async fn is_running(&self) -> bool {
        match self.child.lock().await.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn home(&self) -> PathBuf {
        self.home.clone()
    }

    async fn start(&self, progress: Arc<dyn StartupCallback>) -> Result<()> {
        let mut child = Command::new(&self.home)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        tracing::debug!(pid = ?child.id(), home = %self.home.display(), "analysis server spawned");

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(follow(stderr, progress.clone(), None));
        }
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(follow(stdout, progress, Some(self.ready_marker.clone())));
        }
        *self.child.lock().await = Some(child);
        Ok(())
    }
}

// Forwards server output. The stream carrying the ready marker also reports an exit before readiness.
async fn follow<R>(reader: R, progress: Arc<dyn StartupCallback>, ready_marker: Option<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        progress.log(&line);
        if let Some(marker) = &ready_marker {
            if !progress.is_server_started() && line.contains(marker.as_str()) {
                progress.server_started();
            }
        }
    }
    if ready_marker.is_some() && !progress.is_server_started() {
        progress.process_failed("analysis server exited before it was ready");
    }
}
