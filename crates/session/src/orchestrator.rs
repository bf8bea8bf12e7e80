//! Generation orchestrator.
//!
//! Drives one attempt through `Idle -> Submitting -> Polling` and on to
//! `Succeeded`, `Failed`, or a single `Degrading` fallback. Progress and
//! state changes are reported on an event channel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use threshold_worldgen::{
    AssetResolver, ConceptImageSource, GenerationClient, GenerationRequest, NormalizedWorldAsset,
    PreparedImage, ProgressUpdate, WorldgenError,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::GenerationError;
use crate::types::{AttemptState, GenerationEvent};

/// What to do after a recoverable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    None,
    /// Resubmit the same theme without image conditioning.
    TextPrompt,
}

/// How a concept image reaches the generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageDelivery {
    Inline,
    MediaAsset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub fallback: FallbackStrategy,
    /// Condition generation on a concept image when a source is available.
    pub use_concept_image: bool,
    pub image_delivery: ImageDelivery,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackStrategy::TextPrompt,
            use_concept_image: true,
            image_delivery: ImageDelivery::Inline,
        }
    }
}

/// Runs generation attempts end to end.
pub struct GenerationOrchestrator {
    client: GenerationClient,
    resolver: AssetResolver,
    concept: Option<Arc<dyn ConceptImageSource>>,
    config: OrchestratorConfig,
}

impl GenerationOrchestrator {
    pub fn new(
        client: GenerationClient,
        resolver: AssetResolver,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            client,
            resolver,
            concept: None,
            config,
        }
    }

    /// Adds a concept image source.
    pub fn with_concept_source(mut self, source: Arc<dyn ConceptImageSource>) -> Self {
        self.concept = Some(source);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs one attempt for `theme`.
    ///
    /// Every call is a fresh attempt with its own id. Events are delivered
    /// best-effort: a full or closed channel drops them.
    pub async fn run(
        &self,
        theme: &str,
        events: &mpsc::Sender<GenerationEvent>,
        cancel: &CancellationToken,
    ) -> Result<NormalizedWorldAsset, GenerationError> {
        let attempt = Attempt {
            id: Uuid::new_v4().to_string(),
            events,
        };
        info!(attempt_id = %attempt.id, %theme, "generation attempt started");
        attempt.state(AttemptState::Idle);

        let request = self.prepare_request(theme, &attempt).await;

        let first = self.submit_and_poll(&request, &attempt, cancel).await;
        let err = match first {
            Ok(asset) => return Ok(attempt.succeed(asset)),
            Err(e) => e,
        };

        // A text-only request has no simpler fallback.
        if !err.is_degradable()
            || self.config.fallback == FallbackStrategy::None
            || request.image().is_none()
        {
            return Err(attempt.fail(err));
        }

        warn!(
            attempt_id = %attempt.id,
            error = %err,
            "attempt degraded, trying text-only fallback"
        );
        attempt.state(AttemptState::Degrading);
        attempt.status("Reality is unstable. Retrying without the concept...");

        match self
            .submit_and_poll(&request.without_image(), &attempt, cancel)
            .await
        {
            Ok(asset) => Ok(attempt.succeed(asset)),
            Err(e) => Err(attempt.fail(e)),
        }
    }

    /// Builds the first request, with a concept image when one can be made.
    async fn prepare_request(&self, theme: &str, attempt: &Attempt<'_>) -> GenerationRequest {
        let Some(source) = self.concept.as_ref().filter(|_| self.config.use_concept_image) else {
            return GenerationRequest::text(theme);
        };

        attempt.status("Imagining 2D concept...");
        let image = match source.generate(theme).await {
            Ok(image) => image,
            Err(e) => {
                warn!(
                    attempt_id = %attempt.id,
                    error = %e,
                    "concept image failed, continuing text-only"
                );
                attempt.status("Concept failed. Generating from text alone...");
                return GenerationRequest::text(theme);
            }
        };

        let image = match image {
            PreparedImage::Inline {
                mime_type,
                data_base64,
            } if self.config.image_delivery == ImageDelivery::MediaAsset => {
                match self.client.upload_media_asset(&mime_type, &data_base64).await {
                    Ok(uploaded) => uploaded,
                    Err(e) => {
                        warn!(
                            attempt_id = %attempt.id,
                            error = %e,
                            "media upload failed, sending image inline"
                        );
                        PreparedImage::Inline {
                            mime_type,
                            data_base64,
                        }
                    }
                }
            }
            other => other,
        };

        attempt.status("Chaining to 3D geometry...");
        GenerationRequest::with_image(theme, image)
    }

    async fn submit_and_poll(
        &self,
        request: &GenerationRequest,
        attempt: &Attempt<'_>,
        cancel: &CancellationToken,
    ) -> Result<NormalizedWorldAsset, GenerationError> {
        attempt.state(AttemptState::Submitting);
        let mut operation = self.client.start_generation(request).await?;

        attempt.state(AttemptState::Polling);
        let on_progress = |update: ProgressUpdate| attempt.progress(update);
        let payload = self
            .client
            .poll_operation(&mut operation, &on_progress, cancel)
            .await?;

        let asset = self
            .resolver
            .resolve(operation.id(), request.theme(), &payload);
        if !asset.is_usable() {
            return Err(GenerationError::ResolutionEmpty {
                operation_id: operation.id().to_string(),
            });
        }

        // An inline concept image doubles as the preview.
        Ok(match request.image().and_then(PreparedImage::data_url) {
            Some(url) => asset.with_preview_fallback(url),
            None => asset,
        })
    }
}

/// Event plumbing for one attempt.
struct Attempt<'a> {
    id: String,
    events: &'a mpsc::Sender<GenerationEvent>,
}

impl Attempt<'_> {
    fn emit(&self, event: GenerationEvent) {
        if let Err(e) = self.events.try_send(event) {
            debug!(attempt_id = %self.id, error = %e, "generation event dropped");
        }
    }

    fn state(&self, state: AttemptState) {
        debug!(attempt_id = %self.id, ?state, "attempt state");
        self.emit(GenerationEvent::StateChanged {
            attempt_id: self.id.clone(),
            state,
        });
    }

    fn status(&self, message: &str) {
        self.emit(GenerationEvent::Status {
            attempt_id: self.id.clone(),
            message: message.to_string(),
        });
    }

    fn progress(&self, update: ProgressUpdate) {
        self.emit(GenerationEvent::Progress {
            attempt_id: self.id.clone(),
            update,
        });
    }

    fn succeed(&self, asset: NormalizedWorldAsset) -> NormalizedWorldAsset {
        info!(attempt_id = %self.id, world = %asset.id, "world ready");
        self.state(AttemptState::Succeeded);
        asset
    }

    fn fail(&self, err: GenerationError) -> GenerationError {
        if matches!(err, GenerationError::Worldgen(WorldgenError::Cancelled)) {
            info!(attempt_id = %self.id, "attempt cancelled");
        } else {
            error!(attempt_id = %self.id, error = %err, "attempt failed");
        }
        self.state(AttemptState::Failed);
        err
    }
}
