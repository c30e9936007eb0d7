//! Startup handshake for the long-lived analysis server variant.
//!
//! The server is started once and then reused: every launch first checks whether it is
//! already up, starts it otherwise, and waits a bounded time for it to report readiness.
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::LauncherConfig;
use crate::error::LauncherError;
use crate::launch::{MarkerService, Notice, Notifier};
use crate::model::Configuration;
use crate::runner::{LineSink, LineStream, RunLine};

pub const SERVER_ERROR_TITLE: &str = "Windup server error";

#[async_trait]
pub trait AnalysisServer: Send + Sync {
    async fn is_running(&self) -> bool;
    fn home(&self) -> PathBuf;
    /// Begins startup. Readiness is reported through `progress`, possibly after returning.
    async fn start(&self, progress: Arc<dyn StartupCallback>) -> anyhow::Result<()>;
}

pub trait StartupCallback: Send + Sync {
    fn server_started(&self);
    fn is_server_started(&self) -> bool;
    fn log(&self, line: &str);
    fn process_failed(&self, message: &str);
}

/// Startup progress of one server start.
pub struct StartupProgress {
    started: AtomicBool,
    console: Arc<dyn LineSink>,
    notifier: Arc<dyn Notifier>,
}

impl StartupProgress {
    pub fn new(console: Arc<dyn LineSink>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            started: AtomicBool::new(false),
            console,
            notifier,
        }
    }
}

impl StartupCallback for StartupProgress {
    fn server_started(&self) {
        self.started.store(true, Ordering::Release);
    }

    fn is_server_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn log(&self, line: &str) {
        self.console.on_line(&RunLine {
            line: line.to_string(),
            stream: LineStream::Stdout,
        });
    }

    fn process_failed(&self, message: &str) {
        tracing::error!(error.kind = "server.process_failed", error.message = %message);
        let notifier = self.notifier.clone();
        let notice = Notice::error(SERVER_ERROR_TITLE, message);
        tokio::spawn(async move { notifier.notify(notice).await });
    }
}

pub struct ServerLauncher {
    server: Arc<dyn AnalysisServer>,
    markers: Arc<dyn MarkerService>,
    notifier: Arc<dyn Notifier>,
    console: Arc<dyn LineSink>,
    cfg: LauncherConfig,
}

impl ServerLauncher {
    pub fn new(
        server: Arc<dyn AnalysisServer>,
        markers: Arc<dyn MarkerService>,
        notifier: Arc<dyn Notifier>,
        console: Arc<dyn LineSink>,
        cfg: LauncherConfig,
    ) -> Self {
        Self {
            server,
            markers,
            notifier,
            console,
            cfg,
        }
    }

    /// Makes sure the server is up, then hands `configuration` to `on_started`.
    ///
    /// `on_started` is not called when the server cannot be brought up; the error has
    /// already been sent to the notifier by then.
    pub async fn launch<F, Fut, T>(
        &self,
        configuration: Configuration,
        on_started: F,
    ) -> Result<T, LauncherError>
    where
        F: FnOnce(Configuration) -> Fut,
        Fut: Future<Output = T>,
    {
        if let Err(e) = self.markers.delete_all().await {
            tracing::warn!(error = %e, "unable to clear markers of previous runs");
        }

        if !self.server.is_running().await {
            if let Err(err) = self.bring_up().await {
                tracing::error!(error.kind = "server.startup", error.message = %err);
                self.notifier
                    .notify(Notice::error(SERVER_ERROR_TITLE, err.to_string()))
                    .await;
                return Err(err);
            }
        }

        Ok(on_started(configuration).await)
    }

    async fn bring_up(&self) -> Result<(), LauncherError> {
        let home = self.server.home();
        ensure_executable(&home).await?;

        let progress = Arc::new(StartupProgress::new(
            self.console.clone(),
            self.notifier.clone(),
        ));
        tracing::info!(home = %home.display(), "starting analysis server");
        self.server
            .start(progress.clone())
            .await
            .map_err(|e| LauncherError::Start(e.to_string()))?;

        let polls = self.cfg.startup_polls.max(1);
        let interval = Duration::from_millis(self.cfg.startup_timeout_ms / u64::from(polls));
        for _ in 0..polls {
            if progress.is_server_started() {
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }
        if progress.is_server_started() {
            return Ok(());
        }
        Err(LauncherError::StartupTimeout(self.cfg.startup_timeout_ms))
    }
}

async fn ensure_executable(home: &Path) -> Result<(), LauncherError> {
    let meta = tokio::fs::metadata(home)
        .await
        .map_err(|_| LauncherError::NotExecutable(home.to_path_buf()))?;
    if !meta.is_file() {
        return Err(LauncherError::NotExecutable(home.to_path_buf()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = meta.permissions();
        if perms.mode() & 0o111 != 0o111 {
            perms.set_mode(perms.mode() | 0o111);
            tokio::fs::set_permissions(home, perms)
                .await
                .map_err(|_| LauncherError::NotExecutable(home.to_path_buf()))?;
        }
    }
    Ok(())
}
