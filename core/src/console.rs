//! Analysis console: echoes run output and optionally mirrors it to a log file.
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::config::ConsoleConfig;
use crate::runner::{LineSink, LineStream, RunLine};

pub const CONSOLE_LOG_FILE: &str = "console.log";

pub struct ConsoleSink {
    echo: bool,
    file_tx: Option<mpsc::Sender<String>>,
    dropped: Arc<AtomicU64>,
}

impl ConsoleSink {
    /// Must be called inside a tokio runtime when `log_path` is set.
    pub fn start(cfg: &ConsoleConfig, log_path: Option<PathBuf>) -> Self {
        let dropped = Arc::new(AtomicU64::new(0));
        let file_tx = match log_path {
            Some(path) if cfg.log_file => Some(spawn_writer(path, cfg.channel_capacity.max(1))),
            _ => None,
        };
        Self {
            echo: cfg.echo,
            file_tx,
            dropped,
        }
    }

    /// Lines not mirrored to the log file because the writer fell behind.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl LineSink for ConsoleSink {
    fn on_line(&self, line: &RunLine) {
        if self.echo {
            let _ = match line.stream {
                LineStream::Stdout => writeln!(std::io::stdout().lock(), "{}", line.line),
                LineStream::Stderr => writeln!(std::io::stderr().lock(), "{}", line.line),
            };
        }
        if let Some(tx) = &self.file_tx {
            if tx.try_send(line.line.clone()).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

fn spawn_writer(path: PathBuf, capacity: usize) -> mpsc::Sender<String> {
    let (tx, mut rx) = mpsc::channel::<String>(capacity);
    tokio::spawn(async move {
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        let mut file = match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "console log unavailable");
                return;
            }
        };

        while let Some(mut line) = rx.recv().await {
            line.push('\n');
            if file.write_all(line.as_bytes()).await.is_err() {
                return;
            }
            let _ = file.flush().await;
        }
        let _ = file.flush().await;
    });
    tx
}
