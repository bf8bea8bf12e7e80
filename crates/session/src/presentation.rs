//! Presentation mode selection.
//!
//! Tries each populated mode in priority order, fetching its asset, and
//! commits to the first one that loads. When nothing loads the result is a
//! degraded presentation, which always succeeds.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use threshold_net::{AssetFetcher, FetchedAsset};
use threshold_worldgen::{AssetCategory, NormalizedWorldAsset};
use tracing::{info, warn};

/// How a world is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    Splat,
    Mesh,
    Panorama,
    FlatImage,
}

impl PresentationMode {
    pub fn category(self) -> AssetCategory {
        match self {
            Self::Splat => AssetCategory::Splat,
            Self::Mesh => AssetCategory::Mesh,
            Self::Panorama => AssetCategory::Panorama,
            Self::FlatImage => AssetCategory::Preview,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Splat => "splat",
            Self::Mesh => "mesh",
            Self::Panorama => "panorama",
            Self::FlatImage => "flat image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Modes tried in order.
    pub priority: Vec<PresentationMode>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            priority: vec![
                PresentationMode::Splat,
                PresentationMode::Mesh,
                PresentationMode::Panorama,
                PresentationMode::FlatImage,
            ],
        }
    }
}

/// Asset bytes held for the active presentation.
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub url: String,
    pub content_type: Option<String>,
    bytes: Arc<[u8]>,
}

impl LoadedAsset {
    fn new(url: &str, fetched: FetchedAsset) -> Self {
        Self {
            url: url.to_string(),
            content_type: fetched.content_type,
            bytes: fetched.bytes.into(),
        }
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Outcome of presentation selection.
#[derive(Debug, Clone)]
pub enum Presentation {
    Loaded {
        mode: PresentationMode,
        asset: LoadedAsset,
    },
    /// Nothing could be loaded. Shows the preview URL if there is one,
    /// otherwise an "unstable" indicator.
    Degraded { preview_url: Option<String> },
}

impl Presentation {
    pub fn mode(&self) -> Option<PresentationMode> {
        match self {
            Self::Loaded { mode, .. } => Some(*mode),
            Self::Degraded { .. } => None,
        }
    }

    pub fn is_unstable(&self) -> bool {
        matches!(self, Self::Degraded { preview_url: None })
    }

    /// Bytes held by this presentation.
    pub fn held_bytes(&self) -> usize {
        match self {
            Self::Loaded { asset, .. } => asset.len(),
            Self::Degraded { .. } => 0,
        }
    }
}

/// Picks and loads the best presentation for a world.
#[derive(Debug, Clone)]
pub struct PresentationSelector {
    fetcher: AssetFetcher,
    config: SelectorConfig,
}

impl PresentationSelector {
    pub fn new(fetcher: AssetFetcher, config: SelectorConfig) -> Self {
        Self { fetcher, config }
    }

    pub async fn select(&self, world: &NormalizedWorldAsset) -> Presentation {
        for &mode in &self.config.priority {
            let Some(url) = world.url_for(mode.category()) else {
                continue;
            };
            match self.fetcher.fetch_asset(url).await {
                Ok(fetched) => {
                    info!(
                        world = %world.id,
                        mode = mode.label(),
                        bytes = fetched.bytes.len(),
                        "presentation mode selected"
                    );
                    return Presentation::Loaded {
                        mode,
                        asset: LoadedAsset::new(url, fetched),
                    };
                }
                Err(e) => {
                    warn!(
                        world = %world.id,
                        mode = mode.label(),
                        error = %e,
                        "mode failed to load"
                    );
                }
            }
        }

        let preview_url = world.preview_image_url.clone();
        warn!(
            world = %world.id,
            has_preview = preview_url.is_some(),
            "no mode loaded, degrading"
        );
        Presentation::Degraded { preview_url }
    }
}
