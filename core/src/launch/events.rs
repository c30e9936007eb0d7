use chrono::{DateTime, Utc};
use serde::Serialize;

use super::transitions::RunPhase;

/// Broadcast to subscribers as runs move through their lifecycle.
#[derive(Debug, Clone, Serialize)]
pub enum LaunchEvent {
    RunAccepted {
        run_id: String,
        configuration: String,
        timestamp: DateTime<Utc>,
    },
    PhaseChanged {
        run_id: String,
        old_phase: RunPhase,
        new_phase: RunPhase,
        timestamp: DateTime<Utc>,
    },
    RunRejected {
        run_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    RunFinished {
        run_id: String,
        phase: RunPhase,
        findings: Option<usize>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    IngestFailed {
        run_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl LaunchEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::RunAccepted { timestamp, .. }
            | Self::PhaseChanged { timestamp, .. }
            | Self::RunRejected { timestamp, .. }
            | Self::RunFinished { timestamp, .. }
            | Self::IngestFailed { timestamp, .. } => *timestamp,
        }
    }

    /// One JSON object, suitable for a line-oriented event log.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn run_id(&self) -> &str {
        match self {
            Self::RunAccepted { run_id, .. }
            | Self::PhaseChanged { run_id, .. }
            | Self::RunRejected { run_id, .. }
            | Self::RunFinished { run_id, .. }
            | Self::IngestFailed { run_id, .. } => run_id,
        }
    }
}
