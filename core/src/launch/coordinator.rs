//! Single-flight launch orchestration: preempt, validate, prepare, spawn, and the one
//! terminal transition that hands a finished run over to ingestion.
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use crate::catalog;
use crate::error::{LaunchError, LAUNCH_ERROR_TITLE};
use crate::model::{AnalysisOptions, Configuration};
use crate::runner::{KantraRequest, ProcessRunner, RunHandle, RunTermination, TerminalCallback};

use super::events::LaunchEvent;
use super::monitor::ProgressMonitor;
use super::run_state::{RunState, RunStateSnapshot};
use super::services::{LaunchServices, Notice};
use super::transitions::RunPhase;

#[derive(Debug, Clone)]
pub struct LauncherSettings {
    /// Resolved kantra executable.
    pub executable: String,
}

struct ActiveRun {
    state: Arc<RunState>,
    handle: RunHandle,
    monitor: ProgressMonitor,
    monitor_task: JoinHandle<()>,
}

struct Inner {
    runner: ProcessRunner,
    services: LaunchServices,
    settings: LauncherSettings,
    // The only shared mutable resource: at most one active run lives here.
    slot: Mutex<Option<ActiveRun>>,
    active_tx: watch::Sender<Option<String>>,
    event_tx: broadcast::Sender<LaunchEvent>,
}

/// Owns the single active-run slot. Clones share it.
#[derive(Clone)]
pub struct LaunchCoordinator {
    inner: Arc<Inner>,
}

impl LaunchCoordinator {
    pub fn new(runner: ProcessRunner, services: LaunchServices, settings: LauncherSettings) -> Self {
        let (active_tx, _) = watch::channel(None);
        let (event_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                runner,
                services,
                settings,
                slot: Mutex::new(None),
                active_tx,
                event_tx,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LaunchEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Starts an analysis for `configuration`, retiring any run still in flight.
    ///
    /// Returns once the process is spawned (`Running`) or the launch was refused
    /// (`Rejected`). Failures have already been logged and, where the user must act,
    /// sent to the notifier.
    pub async fn launch(&self, configuration: Configuration) -> RunPhase {
        let inner = &self.inner;
        let (phase, notice) = self.launch_locked(configuration).await;
        // Sent without the slot lock; a notifier may block until the user dismisses it.
        if let Some(notice) = notice {
            inner.services.notifier.notify(notice).await;
        }
        phase
    }

    async fn launch_locked(&self, configuration: Configuration) -> (RunPhase, Option<Notice>) {
        let inner = &self.inner;
        let mut slot = inner.slot.lock().await;

        if let Some(previous) = slot.take() {
            inner.preempt(previous);
        }

        let state = Arc::new(RunState::new(&configuration.name));
        inner.emit(LaunchEvent::RunAccepted {
            run_id: state.run_id().to_string(),
            configuration: configuration.name.clone(),
            timestamp: Utc::now(),
        });
        inner.move_to(&state, RunPhase::Validating);

        match inner.start(&state, &configuration).await {
            Ok(handle) => {
                inner.move_to(&state, RunPhase::Running);
                let monitor = ProgressMonitor::new();
                let monitor_task = spawn_monitor(state.clone(), handle.clone(), monitor.clone());
                *slot = Some(ActiveRun {
                    state: state.clone(),
                    handle,
                    monitor,
                    monitor_task,
                });
                inner
                    .active_tx
                    .send_replace(Some(state.run_id().to_string()));
                (RunPhase::Running, None)
            }
            Err(err) => {
                let notice = inner.reject(&state, err);
                inner.active_tx.send_replace(None);
                (RunPhase::Rejected, notice)
            }
        }
    }

    /// Cancels the active run, if any. The process is killed; ingestion is skipped.
    pub async fn cancel(&self) {
        if let Some(active) = self.inner.slot.lock().await.as_ref() {
            active.monitor.cancel();
        }
    }

    /// Cancellation handle of the active run.
    pub async fn monitor(&self) -> Option<ProgressMonitor> {
        self.inner
            .slot
            .lock()
            .await
            .as_ref()
            .map(|a| a.monitor.clone())
    }

    pub async fn phase(&self) -> RunPhase {
        match self.inner.slot.lock().await.as_ref() {
            Some(active) => active.state.phase(),
            None => RunPhase::Idle,
        }
    }

    pub async fn active_run(&self) -> Option<RunStateSnapshot> {
        self.inner
            .slot
            .lock()
            .await
            .as_ref()
            .map(|a| a.state.snapshot())
    }

    /// Resolves once no run is active, including its ingestion and rendering.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.active_tx.subscribe();
        let _ = rx.wait_for(|active| active.is_none()).await;
    }
}

fn spawn_monitor(state: Arc<RunState>, handle: RunHandle, monitor: ProgressMonitor) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = monitor.cancelled() => {
                tracing::info!(run_id = %state.run_id(), "cancellation requested");
                state.mark_cancelled();
                handle.kill();
            }
            _ = handle.finished() => {}
        }
    })
}

impl Inner {
    fn emit(&self, event: LaunchEvent) {
        let _ = self.event_tx.send(event);
    }

    fn move_to(&self, state: &RunState, to: RunPhase) {
        match state.transition(to) {
            Ok(from) => self.emit(LaunchEvent::PhaseChanged {
                run_id: state.run_id().to_string(),
                old_phase: from,
                new_phase: to,
                timestamp: Utc::now(),
            }),
            Err(e) => tracing::warn!(run_id = %state.run_id(), error = %e, "ignored phase change"),
        }
    }

    // No grace period: the old process gets its kill and the new run proceeds at once.
    fn preempt(&self, previous: ActiveRun) {
        tracing::info!(run_id = %previous.state.run_id(), "preempting previous run");
        previous.state.mark_cancelled();
        previous.monitor_task.abort();
        previous.handle.kill();
    }

    async fn start(
        self: &Arc<Self>,
        state: &Arc<RunState>,
        configuration: &Configuration,
    ) -> Result<RunHandle, LaunchError> {
        if !configuration.has_inputs() {
            return Err(LaunchError::EmptyInput);
        }

        if let Err(e) = self.services.markers.delete_all().await {
            tracing::warn!(error = %e, "unable to clear markers of previous runs");
        }

        for issue in catalog::validate(configuration) {
            tracing::warn!(
                configuration = %configuration.name,
                option = %issue.key,
                value = %issue.value,
                "{}",
                issue.reason
            );
        }
        let options = AnalysisOptions::from_configuration(configuration);
        for pair in &options.passthrough {
            catalog::check_passthrough_key(&pair.key)?;
        }

        let output = configuration.output_dir();
        let exists = tokio::fs::try_exists(output).await.unwrap_or(false);
        if exists && !options.overwrite {
            return Err(LaunchError::OutputExists {
                path: output.to_path_buf(),
            });
        }
        if !exists {
            tokio::fs::create_dir_all(output)
                .await
                .map_err(|source| LaunchError::Preparation {
                    path: output.to_path_buf(),
                    source,
                })?;
        }
        let created = !exists;

        let request = KantraRequest {
            executable: self.settings.executable.clone(),
            inputs: configuration.input_paths(),
            output_dir: output.to_path_buf(),
            options,
        };
        let callback = self.terminal_callback(state.clone(), configuration.clone());
        match self
            .runner
            .run(
                state.run_id(),
                &request,
                self.services.console.clone(),
                callback,
            )
            .await
        {
            Ok(handle) => Ok(handle),
            Err(e) => {
                // Nothing ran, so a directory made by this launch must not block the next one.
                if created {
                    if let Err(rm) = tokio::fs::remove_dir(output).await {
                        tracing::warn!(path = %output.display(), error = %rm, "unable to remove output directory");
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Records the refusal; returns the notice the user should see, if any.
    fn reject(&self, state: &RunState, err: LaunchError) -> Option<Notice> {
        state.mark_invalid();
        self.move_to(state, RunPhase::Rejected);

        let message = err.to_string();
        let notice = match &err {
            e if e.is_validation() => {
                tracing::error!(
                    run_id = %state.run_id(),
                    error.kind = "launch.validation",
                    error.message = %message
                );
                Some(Notice::info(LAUNCH_ERROR_TITLE, message.clone()))
            }
            LaunchError::Preparation { .. } => {
                tracing::error!(
                    run_id = %state.run_id(),
                    error.kind = "launch.preparation",
                    error.message = %message
                );
                None
            }
            _ => {
                tracing::error!(
                    run_id = %state.run_id(),
                    error.kind = "launch.host_failure",
                    error.message = %message
                );
                Some(Notice::error(LAUNCH_ERROR_TITLE, message.clone()))
            }
        };

        self.emit(LaunchEvent::RunRejected {
            run_id: state.run_id().to_string(),
            reason: message,
            timestamp: Utc::now(),
        });
        notice
    }

    fn terminal_callback(
        self: &Arc<Self>,
        state: Arc<RunState>,
        configuration: Configuration,
    ) -> TerminalCallback {
        let inner = self.clone();
        Box::new(move |termination| {
            async move { inner.on_terminal(state, configuration, termination).await }.boxed()
        })
    }

    async fn on_terminal(
        &self,
        state: Arc<RunState>,
        mut configuration: Configuration,
        termination: RunTermination,
    ) {
        let run_id = state.run_id().to_string();

        // Taking the lock orders this after `launch` has registered the run.
        let phase = {
            let _slot = self.slot.lock().await;
            state.finish(&termination)
        };
        let Some(phase) = phase else {
            tracing::debug!(run_id = %run_id, "run already terminal");
            self.release(&run_id).await;
            return;
        };
        self.emit(LaunchEvent::PhaseChanged {
            run_id: run_id.clone(),
            old_phase: RunPhase::Running,
            new_phase: phase,
            timestamp: Utc::now(),
        });

        match (&termination, phase) {
            (_, RunPhase::Cancelled) => {
                tracing::info!(run_id = %run_id, configuration = %configuration.name, "analysis cancelled")
            }
            (RunTermination::Failed { message, exit_code }, _) => tracing::error!(
                run_id = %run_id,
                error.kind = "process.failed",
                exit_code = ?exit_code,
                error.message = %message
            ),
            _ => tracing::info!(run_id = %run_id, configuration = %configuration.name, "analysis completed"),
        }

        configuration.stamp(Utc::now());
        if let Err(e) = self.services.configurations.save(&configuration).await {
            tracing::error!(run_id = %run_id, error.kind = "store.save", error.message = %e);
        }

        let mut findings = None;
        if phase == RunPhase::Completed && !state.is_invalid() {
            findings = self.hand_off(&run_id, &configuration).await;
        }

        self.release(&run_id).await;
        self.emit(LaunchEvent::RunFinished {
            run_id,
            phase,
            findings,
            duration_ms: (Utc::now() - state.started_at()).num_milliseconds().max(0) as u64,
            timestamp: Utc::now(),
        });
    }

    async fn hand_off(&self, run_id: &str, configuration: &Configuration) -> Option<usize> {
        let findings = match self.services.ingestion.ingest(configuration).await {
            Ok(findings) => findings,
            Err(e) => {
                tracing::error!(run_id = %run_id, error.kind = "ingest.failed", error.message = %e);
                self.emit(LaunchEvent::IngestFailed {
                    run_id: run_id.to_string(),
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                return None;
            }
        };

        match self.services.markers.generate(configuration, &findings).await {
            Ok(n) => tracing::debug!(run_id = %run_id, markers = n, "markers generated"),
            Err(e) => tracing::error!(run_id = %run_id, error.kind = "markers.failed", error.message = %e),
        }
        if let Err(e) = self.services.reports.render(configuration, &findings).await {
            tracing::error!(run_id = %run_id, error.kind = "report.failed", error.message = %e);
        }
        Some(findings.len())
    }

    // Clears the slot only if it still holds this run; a preempting launch may own it now.
    async fn release(&self, run_id: &str) {
        let mut slot = self.slot.lock().await;
        let ours = slot
            .as_ref()
            .map(|a| a.state.run_id() == run_id)
            .unwrap_or(false);
        if ours {
            if let Some(active) = slot.take() {
                active.monitor_task.abort();
            }
            self.active_tx.send_replace(None);
        }
    }
}
