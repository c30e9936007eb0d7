mod common;

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use common::{finished_runs, harness, harness_with, idle, Recorder, Script, OUTPUT_YAML};
use pretty_assertions::assert_eq;
use windup_core::error::{EMPTY_INPUT_MESSAGE, LAUNCH_ERROR_TITLE, OUTPUT_EXISTS_MESSAGE};
use windup_core::ingest::{FindingStore, Severity};
use windup_core::launch::{
    ConfigurationStore, LaunchEvent, Notice, NoticeLevel, Notifier, RunPhase,
};
use windup_core::model::Configuration;
use windup_core::runner::LineStream;

fn configuration(dir: &tempfile::TempDir) -> Configuration {
    Configuration::new("app", dir.path().join("out")).with_input("/src/app")
}

#[tokio::test]
async fn empty_input_is_rejected_before_anything_runs() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(vec![]);
    let mut events = h.coordinator.subscribe();

    let phase = h
        .coordinator
        .launch(Configuration::new("app", dir.path().join("out")))
        .await;

    assert_eq!(phase, RunPhase::Rejected);
    assert_eq!(h.runner.starts(), 0);
    assert_eq!(h.recorder.marker_clears.load(std::sync::atomic::Ordering::SeqCst), 0);
    let notices = h.recorder.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Info);
    assert_eq!(notices[0].title, LAUNCH_ERROR_TITLE);
    assert_eq!(notices[0].message, EMPTY_INPUT_MESSAGE);
    assert!(!dir.path().join("out").exists());

    let mut saw_rejected = false;
    while let Ok(event) = events.try_recv() {
        if let LaunchEvent::RunRejected { reason, .. } = event {
            assert_eq!(reason, EMPTY_INPUT_MESSAGE);
            saw_rejected = true;
        }
    }
    assert!(saw_rejected);
    assert_eq!(h.coordinator.phase().await, RunPhase::Idle);
}

#[tokio::test]
async fn blank_inputs_count_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(vec![]);
    let cfg = Configuration::new("app", dir.path().join("out"))
        .with_input("  ")
        .with_input("");
    assert_eq!(h.coordinator.launch(cfg).await, RunPhase::Rejected);
    assert_eq!(h.runner.starts(), 0);
}

#[tokio::test]
async fn existing_output_requires_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    let h = harness(vec![]);

    let phase = h.coordinator.launch(configuration(&dir)).await;

    assert_eq!(phase, RunPhase::Rejected);
    assert_eq!(h.runner.starts(), 0);
    let notices = h.recorder.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, LAUNCH_ERROR_TITLE);
    assert_eq!(notices[0].message, OUTPUT_EXISTS_MESSAGE);
}

#[tokio::test]
async fn overwrite_reuses_existing_output_and_passes_flag() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    let h = harness(vec![Script::exits(0)]);

    let cfg = configuration(&dir).with_option("overwrite", "TRUE");
    assert_eq!(h.coordinator.launch(cfg).await, RunPhase::Running);
    idle(&h.coordinator).await;

    let args = h.runner.last_args();
    assert!(args.contains(&"--overwrite".to_string()));
    assert!(h.recorder.notices().is_empty());
}

#[tokio::test]
async fn overwrite_false_still_refuses_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    let h = harness(vec![]);

    let cfg = configuration(&dir).with_option("overwrite", "false");
    assert_eq!(h.coordinator.launch(cfg).await, RunPhase::Rejected);
    assert_eq!(h.runner.starts(), 0);
    assert_eq!(h.recorder.notices()[0].message, OUTPUT_EXISTS_MESSAGE);
}

#[tokio::test]
async fn uncreatable_output_is_rejected_without_notice() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let h = harness(vec![]);
    let mut events = h.coordinator.subscribe();

    let cfg = Configuration::new("app", blocker.join("out")).with_input("/src/app");
    assert_eq!(h.coordinator.launch(cfg).await, RunPhase::Rejected);

    assert_eq!(h.runner.starts(), 0);
    assert!(h.recorder.notices().is_empty());
    let mut rejected = false;
    while let Ok(event) = events.try_recv() {
        rejected |= matches!(event, LaunchEvent::RunRejected { .. });
    }
    assert!(rejected);
    assert_eq!(h.coordinator.phase().await, RunPhase::Idle);
}

#[tokio::test]
async fn missing_output_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("out");
    let h = harness(vec![Script::exits(0)]);

    let cfg = Configuration::new("app", &out).with_input("/src/app");
    assert_eq!(h.coordinator.launch(cfg).await, RunPhase::Running);
    assert!(out.is_dir());
    idle(&h.coordinator).await;
}

#[tokio::test]
async fn options_become_kantra_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(vec![Script::exits(0)]);

    let cfg = Configuration::new("app", dir.path().join("out"))
        .with_input("/src/b")
        .with_input("/src/a")
        .with_option("source", "weblogic")
        .with_option("target", "eap7")
        .with_option("target", "cloud")
        .with_option("mode", "source-only");
    assert_eq!(h.coordinator.launch(cfg).await, RunPhase::Running);
    idle(&h.coordinator).await;

    let out = dir.path().join("out").to_string_lossy().to_string();
    assert_eq!(
        h.runner.last_args(),
        vec![
            "analyze", "--input", "/src/a", "--input", "/src/b", "--output", &out, "--source",
            "weblogic", "--target", "eap7", "--target", "cloud", "--mode", "source-only",
        ]
    );
}

#[tokio::test]
async fn malformed_passthrough_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(vec![]);

    let cfg = configuration(&dir).with_option("--rm -rf", "x");
    assert_eq!(h.coordinator.launch(cfg).await, RunPhase::Rejected);
    assert_eq!(h.runner.starts(), 0);
    assert_eq!(h.recorder.notices()[0].level, NoticeLevel::Info);
}

#[tokio::test]
async fn completed_run_is_ingested_and_configuration_stamped() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script::exits(0)
        .stdout("loading rules")
        .stdout("analyzing")
        .stdout("done")
        .writes_output(OUTPUT_YAML);
    let h = harness(vec![script]);
    let mut events = h.coordinator.subscribe();

    assert_eq!(h.coordinator.launch(configuration(&dir)).await, RunPhase::Running);
    let runs = finished_runs(&mut events, 1).await;
    idle(&h.coordinator).await;

    assert_eq!(runs[0].1, RunPhase::Completed);
    assert_eq!(runs[0].2, Some(3));
    assert_eq!(h.recorder.lines(), vec!["loading rules", "analyzing", "done"]);

    let stored = h.findings.load("app").await.unwrap().unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored.count_by_severity(Severity::Error), 2);
    assert_eq!(stored.count_by_severity(Severity::Info), 1);
    assert!(stored
        .iter()
        .any(|f| f.location.file == "/src/app/src/Startup.java" && f.location.line == Some(12)));

    assert_eq!(*h.recorder.markers.lock().unwrap(), vec![("app".to_string(), 3)]);
    assert_eq!(h.recorder.reports.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(h.recorder.marker_clears.load(std::sync::atomic::Ordering::SeqCst), 1);

    let saved = h.configurations.find("app").await.unwrap().unwrap();
    assert!(saved.timestamp.is_some());
    assert_eq!(h.coordinator.phase().await, RunPhase::Idle);
}

#[tokio::test]
async fn all_lines_are_delivered_before_the_terminal_event() {
    let dir = tempfile::tempdir().unwrap();
    let mut script = Script::exits(0);
    for i in 0..500 {
        script = script.stdout(&format!("line {i}"));
    }
    let h = harness(vec![script]);
    let mut events = h.coordinator.subscribe();

    h.coordinator.launch(configuration(&dir)).await;
    finished_runs(&mut events, 1).await;

    let lines = h.recorder.lines();
    assert_eq!(lines.len(), 500);
    assert_eq!(lines.first().map(String::as_str), Some("line 0"));
    assert_eq!(lines.last().map(String::as_str), Some("line 499"));
}

#[tokio::test]
async fn interleaved_streams_keep_emission_order() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script::exits(0)
        .stdout("out 1")
        .stderr("err 1")
        .stdout("out 2")
        .stderr("err 2")
        .paced(20);
    let h = harness(vec![script]);
    let mut events = h.coordinator.subscribe();

    h.coordinator.launch(configuration(&dir)).await;
    finished_runs(&mut events, 1).await;

    assert_eq!(
        h.recorder.tagged_lines(),
        vec![
            (LineStream::Stdout, "out 1".to_string()),
            (LineStream::Stderr, "err 1".to_string()),
            (LineStream::Stdout, "out 2".to_string()),
            (LineStream::Stderr, "err 2".to_string()),
        ]
    );
}

#[tokio::test]
async fn finished_run_reports_time_since_launch() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(vec![Script::hangs()]);
    let mut events = h.coordinator.subscribe();

    h.coordinator.launch(configuration(&dir)).await;
    tokio::time::sleep(std::time::Duration::from_millis(60)).await;
    h.coordinator.cancel().await;
    idle(&h.coordinator).await;

    let mut duration = None;
    while let Ok(event) = events.try_recv() {
        if let LaunchEvent::RunFinished { duration_ms, .. } = event {
            duration = Some(duration_ms);
        }
    }
    assert!(duration.unwrap() >= 60);
}

#[tokio::test]
async fn failed_run_is_stamped_but_not_ingested() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script::exits(2)
        .stderr("error: unable to pull provider image")
        .writes_output(OUTPUT_YAML);
    let h = harness(vec![script]);
    let mut events = h.coordinator.subscribe();

    h.coordinator.launch(configuration(&dir)).await;
    let runs = finished_runs(&mut events, 1).await;
    idle(&h.coordinator).await;

    assert_eq!(runs[0].1, RunPhase::Failed);
    assert_eq!(runs[0].2, None);
    assert!(h.findings.load("app").await.unwrap().is_none());
    assert_eq!(h.recorder.reports.load(std::sync::atomic::Ordering::SeqCst), 0);
    let saved = h.configurations.find("app").await.unwrap().unwrap();
    assert!(saved.timestamp.is_some());
}

#[tokio::test]
async fn missing_output_yaml_reports_ingest_failure() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(vec![Script::exits(0)]);
    let mut events = h.coordinator.subscribe();

    h.coordinator.launch(configuration(&dir)).await;
    idle(&h.coordinator).await;

    let mut ingest_failed = false;
    let mut finished = None;
    while let Ok(event) = events.try_recv() {
        match event {
            LaunchEvent::IngestFailed { .. } => ingest_failed = true,
            LaunchEvent::RunFinished {
                phase, findings, ..
            } => finished = Some((phase, findings)),
            _ => {}
        }
    }
    assert!(ingest_failed);
    assert_eq!(finished, Some((RunPhase::Completed, None)));
}

#[tokio::test]
async fn relaunch_preempts_with_exactly_one_kill() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(vec![Script::hangs().stdout("first"), Script::exits(0)]);
    let mut events = h.coordinator.subscribe();

    assert_eq!(h.coordinator.launch(configuration(&dir)).await, RunPhase::Running);
    let first = h.coordinator.active_run().await.unwrap().run_id;

    let again = configuration(&dir).with_option("overwrite", "true");
    assert_eq!(h.coordinator.launch(again).await, RunPhase::Running);
    let second = h.coordinator.active_run().await.unwrap().run_id;
    assert_ne!(first, second);

    let runs = finished_runs(&mut events, 2).await;
    idle(&h.coordinator).await;

    let by_id: HashMap<_, _> = runs.iter().map(|(id, phase, _)| (id.clone(), *phase)).collect();
    assert_eq!(by_id.len(), 2);
    assert_eq!(by_id[&first], RunPhase::Cancelled);
    assert_eq!(by_id[&second], RunPhase::Completed);
    assert_eq!(h.runner.kills(), 1);
    assert_eq!(h.runner.starts(), 2);
}

#[tokio::test]
async fn cancel_kills_once_and_skips_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(vec![Script::hangs().writes_output(OUTPUT_YAML)]);
    let mut events = h.coordinator.subscribe();

    assert_eq!(h.coordinator.launch(configuration(&dir)).await, RunPhase::Running);
    let monitor = h.coordinator.monitor().await.unwrap();
    h.coordinator.cancel().await;
    h.coordinator.cancel().await;
    assert!(monitor.is_cancelled());

    let runs = finished_runs(&mut events, 1).await;
    idle(&h.coordinator).await;

    assert_eq!(runs[0].1, RunPhase::Cancelled);
    assert_eq!(h.runner.kills(), 1);
    assert!(h.findings.load("app").await.unwrap().is_none());
    assert!(h.recorder.markers.lock().unwrap().is_empty());
}

#[tokio::test]
async fn spawn_failure_is_a_host_failure() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(vec![]);
    h.runner
        .fail_spawn
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let mut events = h.coordinator.subscribe();

    assert_eq!(h.coordinator.launch(configuration(&dir)).await, RunPhase::Rejected);
    let notices = h.recorder.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(notices[0].message.contains("/usr/local/bin/kantra"));

    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, LaunchEvent::RunFinished { .. }));
    }
    idle(&h.coordinator).await;
    assert!(!dir.path().join("out").exists());
}

#[tokio::test]
async fn spawn_failure_does_not_block_the_next_launch() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(vec![Script::exits(0)]);

    h.runner
        .fail_spawn
        .store(true, std::sync::atomic::Ordering::SeqCst);
    assert_eq!(h.coordinator.launch(configuration(&dir)).await, RunPhase::Rejected);

    h.runner
        .fail_spawn
        .store(false, std::sync::atomic::Ordering::SeqCst);
    assert_eq!(h.coordinator.launch(configuration(&dir)).await, RunPhase::Running);
    idle(&h.coordinator).await;
    assert_eq!(h.recorder.notices().len(), 1);
}

struct BlockingNotifier {
    release: tokio::sync::Notify,
    seen: AtomicUsize,
}

#[async_trait::async_trait]
impl Notifier for BlockingNotifier {
    async fn notify(&self, _notice: Notice) {
        self.seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.release.notified().await;
    }
}

#[tokio::test]
async fn pending_notice_does_not_hold_the_coordinator() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = Arc::new(BlockingNotifier {
        release: tokio::sync::Notify::new(),
        seen: AtomicUsize::new(0),
    });
    let h = harness_with(vec![], Arc::new(Recorder::default()), notifier.clone());

    let coordinator = h.coordinator.clone();
    let refused = tokio::spawn(async move {
        coordinator
            .launch(Configuration::new("app", dir.path().join("out")))
            .await
    });
    while notifier.seen.load(std::sync::atomic::Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    let phase = tokio::time::timeout(std::time::Duration::from_secs(1), h.coordinator.phase())
        .await
        .expect("slot stayed locked while the notice was pending");
    assert_eq!(phase, RunPhase::Idle);

    notifier.release.notify_one();
    assert_eq!(refused.await.unwrap(), RunPhase::Rejected);
}

#[tokio::test]
async fn idle_coordinator_reports_idle() {
    let h = harness(vec![]);
    idle(&h.coordinator).await;
    assert_eq!(h.coordinator.phase().await, RunPhase::Idle);
    assert!(h.coordinator.active_run().await.is_none());
    assert!(h.coordinator.monitor().await.is_none());
    h.coordinator.cancel().await;
}
