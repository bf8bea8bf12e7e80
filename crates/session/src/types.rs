//! Session-level types and events.

use serde::{Deserialize, Serialize};
use threshold_worldgen::{NormalizedWorldAsset, ProgressUpdate};

use crate::presentation::PresentationMode;

/// State of one generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Idle,
    Submitting,
    Polling,
    /// A recoverable failure happened; a single fallback is being tried.
    Degrading,
    Succeeded,
    Failed,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Events emitted by the generation orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    StateChanged {
        attempt_id: String,
        state: AttemptState,
    },
    /// Human-readable stage text ("Imagining 2D concept...").
    Status { attempt_id: String, message: String },
    /// One per poll.
    Progress {
        attempt_id: String,
        update: ProgressUpdate,
    },
}

/// Top-level phase of the experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Lobby,
    Staging,
    Generating,
    Exploring,
    Error,
}

/// What the user can do to recover from a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Return to staging and try again.
    Restart,
}

/// Events emitted by [`crate::WorldSession`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    StatusChanged(String),
    Generation(GenerationEvent),
    WorldReady {
        asset: NormalizedWorldAsset,
        /// `None` when only the degraded preview is shown.
        mode: Option<PresentationMode>,
    },
    Failed {
        message: String,
        recovery: RecoveryAction,
    },
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub status_message: String,
    pub current_world: Option<NormalizedWorldAsset>,
    pub mode: Option<PresentationMode>,
    pub history: Vec<NormalizedWorldAsset>,
}
