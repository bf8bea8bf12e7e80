//! Session error types.

use threshold_worldgen::WorldgenError;

use crate::types::SessionPhase;

/// Why a generation attempt ended without a world.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Worldgen(#[from] WorldgenError),

    /// The operation completed but no renderable asset could be found.
    #[error("operation {operation_id} completed without a usable asset")]
    ResolutionEmpty { operation_id: String },
}

impl GenerationError {
    /// Short, sanitized text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Worldgen(e) => e.user_message(),
            Self::ResolutionEmpty { .. } => {
                "The world came back empty. Nothing in it could be displayed.".into()
            }
        }
    }

    /// Failures the single text-only fallback may recover from.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::Worldgen(WorldgenError::Poll(_))
                | Self::Worldgen(WorldgenError::Timeout { .. })
                | Self::ResolutionEmpty { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Worldgen(WorldgenError::Cancelled))
    }
}

/// Errors from [`crate::WorldSession`] operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A generation is already running.
    #[error("a generation is already in progress")]
    Busy,

    #[error("operation not allowed in phase {0:?}")]
    InvalidPhase(SessionPhase),

    /// The session was reset while this attempt ran; its result was dropped.
    #[error("generation result discarded")]
    Discarded,

    #[error(transparent)]
    Generation(#[from] GenerationError),
}
