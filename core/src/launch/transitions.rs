//! Legal phase transitions for a single run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of one launch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    Idle,
    Validating,
    Rejected,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: RunPhase, to: RunPhase },
    #[error("Cannot transition from terminal state {state:?}")]
    FromTerminalState { state: RunPhase },
}

pub struct RunTransition;

impl RunTransition {
    pub fn validate(from: RunPhase, to: RunPhase) -> Result<(), TransitionError> {
        if Self::is_terminal(from) {
            return Err(TransitionError::FromTerminalState { state: from });
        }

        let is_valid = matches!(
            (from, to),
            (RunPhase::Idle, RunPhase::Validating)
                | (RunPhase::Validating, RunPhase::Rejected)
                | (RunPhase::Validating, RunPhase::Running)
                // preempted before the process was spawned
                | (RunPhase::Validating, RunPhase::Cancelled)
                | (RunPhase::Running, RunPhase::Completed)
                | (RunPhase::Running, RunPhase::Failed)
                | (RunPhase::Running, RunPhase::Cancelled)
        );

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    pub fn is_terminal(phase: RunPhase) -> bool {
        matches!(
            phase,
            RunPhase::Rejected | RunPhase::Completed | RunPhase::Failed | RunPhase::Cancelled
        )
    }

    pub fn is_active(phase: RunPhase) -> bool {
        matches!(phase, RunPhase::Validating | RunPhase::Running)
    }

    pub fn phase_description(phase: RunPhase) -> &'static str {
        match phase {
            RunPhase::Idle => "idle",
            RunPhase::Validating => "validating",
            RunPhase::Rejected => "rejected",
            RunPhase::Running => "running",
            RunPhase::Completed => "completed",
            RunPhase::Failed => "failed",
            RunPhase::Cancelled => "cancelled",
        }
    }
}
