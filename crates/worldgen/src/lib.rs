//! Client for the remote world generation service.
//!
//! # Flow
//!
//! 1. **Concept** (optional) : a [`ConceptImageSource`] renders a 2D concept
//!    image for the theme, returned inline as base64.
//! 2. **Start** : [`GenerationClient::start_generation`] submits a themed
//!    prompt (image- or text-conditioned) and receives an [`Operation`].
//! 3. **Poll** : [`GenerationClient::poll_operation`] queries the operation
//!    until it completes, fails, or the deadline passes.
//! 4. **Resolve** : [`AssetResolver`] digs asset URLs out of the untyped
//!    completion payload into a [`NormalizedWorldAsset`].

pub mod assets;
pub mod client;
pub mod concept;
pub mod error;
pub mod payload;
pub mod types;

pub use assets::{AssetCategory, AssetResolver, AssetRules, CategoryRule, NormalizedWorldAsset};
pub use client::{ClientConfig, GenerationClient};
pub use concept::{ConceptConfig, ConceptImageSource, GeminiConceptClient};
pub use error::{WorldgenError, sanitize_message};
pub use types::{
    GenerationRequest, ImagePrompt, Operation, OperationState, PreparedImage, ProgressUpdate,
    WorldPrompt,
};
