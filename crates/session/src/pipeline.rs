//! Wiring of the full pipeline from one configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use threshold_net::{AssetFetcher, FetchConfig, HttpTransport, Resolver, ResolverConfig};
use threshold_worldgen::{
    AssetResolver, AssetRules, ClientConfig, ConceptConfig, GeminiConceptClient, GenerationClient,
};
use tracing::debug;

use crate::orchestrator::{GenerationOrchestrator, OrchestratorConfig};
use crate::presentation::{PresentationSelector, SelectorConfig};
use crate::session::WorldSession;

/// Every tunable of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub network: ResolverConfig,
    pub fetch: FetchConfig,
    pub worldgen: ClientConfig,
    pub assets: AssetRules,
    pub orchestrator: OrchestratorConfig,
    pub presentation: SelectorConfig,
    /// Concept images are skipped when no key is configured.
    pub concept: ConceptConfig,
}

impl PipelineConfig {
    pub fn concept_enabled(&self) -> bool {
        self.orchestrator.use_concept_image && !self.concept.api_key.is_empty()
    }

    /// Builds a session over `transport`.
    pub fn build_session(&self, transport: Arc<dyn HttpTransport>) -> WorldSession {
        let resolver = Resolver::new(transport, &self.network);

        let mut orchestrator = GenerationOrchestrator::new(
            GenerationClient::new(resolver.clone(), self.worldgen.clone()),
            AssetResolver::new(self.assets.clone()),
            self.orchestrator.clone(),
        );
        if self.concept_enabled() {
            orchestrator = orchestrator.with_concept_source(Arc::new(GeminiConceptClient::new(
                resolver.clone(),
                self.concept.clone(),
            )));
        } else {
            debug!("concept images disabled");
        }

        let selector = PresentationSelector::new(
            AssetFetcher::new(resolver, self.fetch.clone()),
            self.presentation.clone(),
        );
        WorldSession::new(Arc::new(orchestrator), selector)
    }
}
