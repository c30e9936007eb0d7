#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream};
use tokio::sync::{broadcast, watch};

use windup_core::config::RunnerConfig;
use windup_core::ingest::{FindingSet, MemoryFindingStore, ResultIngestionPipeline};
use windup_core::launch::{
    LaunchCoordinator, LaunchEvent, LaunchServices, LauncherSettings, MarkerService,
    MemoryConfigurationStore, Notice, Notifier, ReportRenderer, RunPhase,
};
use windup_core::model::Configuration;
use windup_core::runner::{
    LineSink, LineStream, ProcessRunner, RunLine, RunOutcome, RunnerPlugin, RunnerSession,
    RunnerStartArgs, Signal,
};

pub const KILLED_EXIT_CODE: i32 = 137;

/// What one fake kantra process does.
#[derive(Clone, Default)]
pub struct Script {
    pub lines: Vec<(LineStream, String)>,
    pub exit_code: i32,
    /// Keep running until killed.
    pub hang: bool,
    /// Written to `<output>/output.yaml` before exiting.
    pub output_yaml: Option<String>,
    /// Pause after each line so the two pipes are read in emission order.
    pub pace: Option<Duration>,
}

impl Script {
    pub fn exits(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    pub fn hangs() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn stdout(mut self, line: &str) -> Self {
        self.lines.push((LineStream::Stdout, line.to_string()));
        self
    }

    pub fn stderr(mut self, line: &str) -> Self {
        self.lines.push((LineStream::Stderr, line.to_string()));
        self
    }

    pub fn paced(mut self, millis: u64) -> Self {
        self.pace = Some(Duration::from_millis(millis));
        self
    }

    pub fn writes_output(mut self, yaml: &str) -> Self {
        self.output_yaml = Some(yaml.to_string());
        self
    }
}

/// Runner plugin that plays back one script per started session.
#[derive(Default)]
pub struct FakeRunner {
    scripts: Mutex<VecDeque<Script>>,
    pub fail_spawn: AtomicBool,
    pub starts: AtomicUsize,
    pub kills: Arc<AtomicUsize>,
    pub argv: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            ..Self::default()
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    pub fn last_args(&self) -> Vec<String> {
        self.argv.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

fn output_dir(args: &[String]) -> Option<PathBuf> {
    args.iter()
        .position(|a| a == "--output")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

#[async_trait]
impl RunnerPlugin for FakeRunner {
    fn name(&self) -> &str {
        "fake"
    }

    async fn start_session(
        &self,
        args: &RunnerStartArgs,
    ) -> anyhow::Result<Box<dyn RunnerSession>> {
        if self.fail_spawn.load(Ordering::SeqCst) {
            anyhow::bail!("No such file or directory (os error 2)");
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.argv.lock().unwrap().push(args.args.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::exits(0));

        let (mut out_w, out_r) = tokio::io::duplex(64 * 1024);
        let (mut err_w, err_r) = tokio::io::duplex(64 * 1024);
        let (exit_tx, exit_rx) = watch::channel(None::<i32>);
        let exit_tx = Arc::new(exit_tx);

        let output = output_dir(&args.args);
        let writer_exit = exit_tx.clone();
        tokio::spawn(async move {
            for (stream, line) in &script.lines {
                let w = match stream {
                    LineStream::Stdout => &mut out_w,
                    LineStream::Stderr => &mut err_w,
                };
                let _ = w.write_all(format!("{line}\n").as_bytes()).await;
                if let Some(pace) = script.pace {
                    tokio::time::sleep(pace).await;
                }
            }
            if let (Some(yaml), Some(dir)) = (&script.output_yaml, &output) {
                let _ = tokio::fs::write(dir.join("output.yaml"), yaml).await;
            }
            drop(out_w);
            drop(err_w);
            if !script.hang {
                tokio::time::sleep(Duration::from_millis(5)).await;
                writer_exit.send_if_modified(|code| {
                    if code.is_none() {
                        *code = Some(script.exit_code);
                        true
                    } else {
                        false
                    }
                });
            }
        });

        Ok(Box::new(FakeSession {
            stdout: Some(out_r),
            stderr: Some(err_r),
            exit_tx,
            exit_rx,
            kills: self.kills.clone(),
        }))
    }
}

struct FakeSession {
    stdout: Option<DuplexStream>,
    stderr: Option<DuplexStream>,
    exit_tx: Arc<watch::Sender<Option<i32>>>,
    exit_rx: watch::Receiver<Option<i32>>,
    kills: Arc<AtomicUsize>,
}

#[async_trait]
impl RunnerSession for FakeSession {
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn signal(&mut self, _signal: Signal) -> anyhow::Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.exit_tx.send_if_modified(|code| {
            if code.is_none() {
                *code = Some(KILLED_EXIT_CODE);
                true
            } else {
                false
            }
        });
        Ok(())
    }

    async fn wait(&mut self) -> anyhow::Result<RunOutcome> {
        let code = *self.exit_rx.wait_for(|c| c.is_some()).await?;
        Ok(RunOutcome {
            exit_code: code.unwrap_or(-1),
            duration_ms: None,
        })
    }
}

/// Notifier, marker service, report renderer and console in one.
#[derive(Default)]
pub struct Recorder {
    pub notices: Mutex<Vec<Notice>>,
    pub lines: Mutex<Vec<RunLine>>,
    pub marker_clears: AtomicUsize,
    pub markers: Mutex<Vec<(String, usize)>>,
    pub reports: AtomicUsize,
}

impl Recorder {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|l| l.line.clone())
            .collect()
    }

    pub fn tagged_lines(&self) -> Vec<(LineStream, String)> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|l| (l.stream, l.line.clone()))
            .collect()
    }
}

#[async_trait]
impl Notifier for Recorder {
    async fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[async_trait]
impl MarkerService for Recorder {
    async fn delete_all(&self) -> anyhow::Result<()> {
        self.marker_clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn generate(
        &self,
        configuration: &Configuration,
        findings: &FindingSet,
    ) -> anyhow::Result<usize> {
        self.markers
            .lock()
            .unwrap()
            .push((configuration.name.clone(), findings.len()));
        Ok(findings.len())
    }
}

#[async_trait]
impl ReportRenderer for Recorder {
    async fn render(&self, _: &Configuration, _: &FindingSet) -> anyhow::Result<()> {
        self.reports.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl LineSink for Recorder {
    fn on_line(&self, line: &RunLine) {
        self.lines.lock().unwrap().push(line.clone());
    }
}

pub struct Harness {
    pub coordinator: LaunchCoordinator,
    pub runner: Arc<FakeRunner>,
    pub recorder: Arc<Recorder>,
    pub configurations: Arc<MemoryConfigurationStore>,
    pub findings: Arc<MemoryFindingStore>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn harness(scripts: Vec<Script>) -> Harness {
    let recorder = Arc::new(Recorder::default());
    harness_with(scripts, recorder.clone(), recorder)
}

/// Like [`harness`], with notices going to `notifier` instead of the recorder.
pub fn harness_with(
    scripts: Vec<Script>,
    recorder: Arc<Recorder>,
    notifier: Arc<dyn Notifier>,
) -> Harness {
    init_tracing();
    let runner = Arc::new(FakeRunner::new(scripts));
    let configurations = Arc::new(MemoryConfigurationStore::new());
    let findings = Arc::new(MemoryFindingStore::new());

    let services = LaunchServices {
        notifier,
        markers: recorder.clone(),
        reports: recorder.clone(),
        configurations: configurations.clone(),
        ingestion: Arc::new(ResultIngestionPipeline::new(findings.clone())),
        console: recorder.clone(),
    };
    let process = ProcessRunner::new(runner.clone(), &RunnerConfig::default());
    let coordinator = LaunchCoordinator::new(
        process,
        services,
        LauncherSettings {
            executable: "/usr/local/bin/kantra".to_string(),
        },
    );

    Harness {
        coordinator,
        runner,
        recorder,
        configurations,
        findings,
    }
}

/// Collects `RunFinished` events until `n` have arrived.
pub async fn finished_runs(
    rx: &mut broadcast::Receiver<LaunchEvent>,
    n: usize,
) -> Vec<(String, RunPhase, Option<usize>)> {
    let mut out = Vec::new();
    let collect = async {
        while out.len() < n {
            match rx.recv().await {
                Ok(LaunchEvent::RunFinished {
                    run_id,
                    phase,
                    findings,
                    ..
                }) => out.push((run_id, phase, findings)),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), collect)
        .await
        .expect("timed out waiting for runs to finish");
    out
}

pub async fn idle(coordinator: &LaunchCoordinator) {
    tokio::time::timeout(Duration::from_secs(5), coordinator.wait_idle())
        .await
        .expect("coordinator did not go idle");
}

pub const OUTPUT_YAML: &str = r#"
- name: eap7/weblogic
  violations:
    weblogic-eap7-00001:
      description: WebLogic ApplicationLifecycleListener
      category: mandatory
      incidents:
      - uri: file:///opt/input/source/src/Startup.java
        message: "Replace ApplicationLifecycleListener with a @Startup bean."
        lineNumber: 12
      - uri: file:///opt/input/source/src/Shutdown.java
        message: "Replace ApplicationLifecycleListener with a @Startup bean."
        lineNumber: 3
  insights:
    java-technology-usage-0001:
      description: Embedded JPA
      incidents:
      - uri: file:///opt/input/source/pom.xml
        message: JPA
"#;
