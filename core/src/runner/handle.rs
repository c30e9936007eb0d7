use std::sync::Arc;

use tokio::sync::watch;

/// Control handle for one spawned analysis process.
///
/// Clones share the same process. Killing never fires the terminal callback on its own;
/// that only happens once the process actually exits.
#[derive(Clone)]
pub struct RunHandle {
    run_id: String,
    kill_tx: Arc<watch::Sender<bool>>,
    done_rx: watch::Receiver<bool>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: String,
        kill_tx: watch::Sender<bool>,
        done_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            run_id,
            kill_tx: Arc::new(kill_tx),
            done_rx,
        }
    }

    /// A handle with no process behind it; already finished.
    pub fn detached(run_id: impl Into<String>) -> Self {
        let (kill_tx, _) = watch::channel(false);
        let (_, done_rx) = watch::channel(true);
        Self::new(run_id.into(), kill_tx, done_rx)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Requests termination. Safe to call any number of times, before or after exit.
    pub fn kill(&self) {
        let first = self.kill_tx.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                true
            }
        });
        if first {
            tracing::debug!(run_id = %self.run_id, "kill requested");
        }
    }

    pub fn kill_requested(&self) -> bool {
        *self.kill_tx.borrow()
    }

    /// True once the terminal callback has returned.
    pub fn is_finished(&self) -> bool {
        *self.done_rx.borrow()
    }

    pub async fn finished(&self) {
        let mut rx = self.done_rx.clone();
        // A dropped sender means the driving task is gone, which is as finished as it gets.
        let _ = rx.wait_for(|done| *done).await;
    }
}
