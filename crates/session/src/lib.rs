//! World generation session: orchestration of attempts, presentation mode
//! selection, and the session state machine around them.

pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod presentation;
pub mod session;
pub mod themes;
pub mod types;

pub use error::{GenerationError, SessionError};
pub use orchestrator::{
    FallbackStrategy, GenerationOrchestrator, ImageDelivery, OrchestratorConfig,
};
pub use pipeline::PipelineConfig;
pub use presentation::{
    LoadedAsset, Presentation, PresentationMode, PresentationSelector, SelectorConfig,
};
pub use session::{ActiveWorld, HISTORY_LIMIT, WorldSession};
pub use themes::{WORLD_THEMES, random_theme};
pub use types::{
    AttemptState, GenerationEvent, RecoveryAction, SessionEvent, SessionPhase, SessionSnapshot,
};
