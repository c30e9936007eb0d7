use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::runner::RunTermination;

use super::transitions::{RunPhase, RunTransition, TransitionError};

#[derive(Debug, Clone, Serialize)]
pub struct RunStateSnapshot {
    pub run_id: String,
    pub configuration: String,
    pub phase: RunPhase,
    pub cancelled: bool,
    pub invalid: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

struct Inner {
    phase: RunPhase,
    cancelled: bool,
    invalid: bool,
    finished_at: Option<DateTime<Utc>>,
}

/// Bookkeeping for one launch. Owned and mutated by the coordinator only.
pub struct RunState {
    run_id: String,
    configuration: String,
    started_at: DateTime<Utc>,
    inner: Mutex<Inner>,
}

impl RunState {
    pub fn new(configuration: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            configuration: configuration.into(),
            started_at: Utc::now(),
            inner: Mutex::new(Inner {
                phase: RunPhase::Idle,
                cancelled: false,
                invalid: false,
                finished_at: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn phase(&self) -> RunPhase {
        self.lock().phase
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    pub fn is_invalid(&self) -> bool {
        self.lock().invalid
    }

    pub fn is_active(&self) -> bool {
        RunTransition::is_active(self.phase())
    }

    pub fn mark_cancelled(&self) {
        self.lock().cancelled = true;
    }

    pub fn mark_invalid(&self) {
        self.lock().invalid = true;
    }

    /// Moves to `to`, returning the previous phase.
    pub fn transition(&self, to: RunPhase) -> Result<RunPhase, TransitionError> {
        let mut g = self.lock();
        RunTransition::validate(g.phase, to)?;
        let from = g.phase;
        g.phase = to;
        if RunTransition::is_terminal(to) {
            g.finished_at = Some(Utc::now());
        }
        Ok(from)
    }

    /// Applies the process outcome. A cancelled run ends `Cancelled` whatever the exit code.
    ///
    /// Returns `None` if the run already reached a terminal phase.
    pub fn finish(&self, termination: &RunTermination) -> Option<RunPhase> {
        let mut g = self.lock();
        if RunTransition::is_terminal(g.phase) {
            return None;
        }
        let to = if g.cancelled {
            RunPhase::Cancelled
        } else if termination.is_success() {
            RunPhase::Completed
        } else {
            RunPhase::Failed
        };
        RunTransition::validate(g.phase, to).ok()?;
        g.phase = to;
        g.finished_at = Some(Utc::now());
        Some(to)
    }

    pub fn snapshot(&self) -> RunStateSnapshot {
        let g = self.lock();
        RunStateSnapshot {
            run_id: self.run_id.clone(),
            configuration: self.configuration.clone(),
            phase: g.phase,
            cancelled: g.cancelled,
            invalid: g.invalid,
            started_at: self.started_at,
            finished_at: g.finished_at,
        }
    }
}
