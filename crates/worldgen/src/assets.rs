//! Normalization of untyped completion payloads into world assets.
//!
//! Categories resolve in priority order (splat, mesh, panorama, preview).
//! Each one first tries its known paths, then falls back to a depth-first
//! search for a URL containing one of its signatures. A URL claimed by a
//! higher-priority category is never reused by a lower one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::payload::{find_string, is_url_like, lookup_str};

/// Renderable asset categories, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Splat,
    Mesh,
    Panorama,
    Preview,
}

impl AssetCategory {
    pub const PRIORITY: [AssetCategory; 4] = [
        AssetCategory::Splat,
        AssetCategory::Mesh,
        AssetCategory::Panorama,
        AssetCategory::Preview,
    ];
}

/// Canonical description of a generated world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedWorldAsset {
    pub id: String,
    pub theme: String,
    pub splat_url: Option<String>,
    pub collider_mesh_url: Option<String>,
    pub panorama_url: Option<String>,
    pub preview_image_url: Option<String>,
    pub external_viewer_url: Option<String>,
}

impl NormalizedWorldAsset {
    pub fn url_for(&self, category: AssetCategory) -> Option<&str> {
        match category {
            AssetCategory::Splat => self.splat_url.as_deref(),
            AssetCategory::Mesh => self.collider_mesh_url.as_deref(),
            AssetCategory::Panorama => self.panorama_url.as_deref(),
            AssetCategory::Preview => self.preview_image_url.as_deref(),
        }
    }

    /// A world is usable when it has at least a splat, a panorama, or a
    /// preview image. A collision mesh alone cannot be displayed.
    pub fn is_usable(&self) -> bool {
        self.splat_url.is_some() || self.panorama_url.is_some() || self.preview_image_url.is_some()
    }

    /// Fills the preview slot when the payload did not provide one.
    pub fn with_preview_fallback(mut self, url: impl Into<String>) -> Self {
        if self.preview_image_url.is_none() {
            self.preview_image_url = Some(url.into());
        }
        self
    }

    fn slot(&mut self, category: AssetCategory) -> &mut Option<String> {
        match category {
            AssetCategory::Splat => &mut self.splat_url,
            AssetCategory::Mesh => &mut self.collider_mesh_url,
            AssetCategory::Panorama => &mut self.panorama_url,
            AssetCategory::Preview => &mut self.preview_image_url,
        }
    }
}

/// Lookup rules for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Dotted paths tried in order.
    pub known_paths: Vec<String>,
    /// Case-insensitive substrings used by the generic search.
    pub signatures: Vec<String>,
}

impl CategoryRule {
    fn new(paths: &[&str], signatures: &[&str]) -> Self {
        Self {
            known_paths: paths.iter().map(|s| s.to_string()).collect(),
            signatures: signatures.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn matches_signature(&self, url: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        self.signatures
            .iter()
            .any(|sig| lower.contains(&sig.to_ascii_lowercase()))
    }
}

/// Full rule set for payload normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetRules {
    pub splat: CategoryRule,
    pub mesh: CategoryRule,
    pub panorama: CategoryRule,
    pub preview: CategoryRule,
    /// Paths for the external viewer link. Not searched generically.
    pub viewer_paths: Vec<String>,
}

impl AssetRules {
    fn rule(&self, category: AssetCategory) -> &CategoryRule {
        match category {
            AssetCategory::Splat => &self.splat,
            AssetCategory::Mesh => &self.mesh,
            AssetCategory::Panorama => &self.panorama,
            AssetCategory::Preview => &self.preview,
        }
    }
}

impl Default for AssetRules {
    fn default() -> Self {
        Self {
            splat: CategoryRule::new(
                &[
                    "assets.splats.spz_urls.full_res",
                    "assets.splats.spz_urls.500k",
                    "assets.splats.spz_urls.100k",
                    "links.spz",
                    "links.ply",
                    "links.gaussian_splat",
                    "spz",
                ],
                &[".spz", ".ply", ".splat"],
            ),
            mesh: CategoryRule::new(
                &["assets.mesh.collider_mesh_url", "links.mesh", "links.glb"],
                &[".glb", ".gltf", ".obj"],
            ),
            panorama: CategoryRule::new(
                &["assets.imagery.pano_url", "links.pano", "pano_url"],
                &["pano", "equirect"],
            ),
            preview: CategoryRule::new(
                &["assets.thumbnail_url", "links.thumbnail", "thumbnail_url"],
                &["thumbnail", "preview", ".webp", ".jpg", ".jpeg", ".png"],
            ),
            viewer_paths: vec!["world_marble_url".into(), "links.viewer".into()],
        }
    }
}

/// Turns completion payloads into [`NormalizedWorldAsset`]s.
#[derive(Debug, Clone, Default)]
pub struct AssetResolver {
    rules: AssetRules,
}

impl AssetResolver {
    pub fn new(rules: AssetRules) -> Self {
        Self { rules }
    }

    /// Normalizes `payload`. Never fails; unresolved categories stay empty.
    pub fn resolve(&self, id: &str, theme: &str, payload: &Value) -> NormalizedWorldAsset {
        let mut asset = NormalizedWorldAsset {
            id: id.to_string(),
            theme: theme.to_string(),
            splat_url: None,
            collider_mesh_url: None,
            panorama_url: None,
            preview_image_url: None,
            external_viewer_url: None,
        };
        let mut claimed: Vec<String> = Vec::new();

        for category in AssetCategory::PRIORITY {
            let rule = self.rules.rule(category);
            let found = rule
                .known_paths
                .iter()
                .find_map(|path| {
                    lookup_str(payload, path).filter(|url| !claimed.iter().any(|c| c == url))
                })
                .or_else(|| {
                    find_string(payload, &mut |s| {
                        is_url_like(s)
                            && rule.matches_signature(s)
                            && !claimed.iter().any(|c| c == s)
                    })
                })
                .map(str::to_string);

            if let Some(url) = found {
                debug!(?category, url = %url, "asset category resolved");
                claimed.push(url.clone());
                *asset.slot(category) = Some(url);
            }
        }

        asset.external_viewer_url = self
            .rules
            .viewer_paths
            .iter()
            .find_map(|path| lookup_str(payload, path))
            .map(str::to_string);

        if !asset.is_usable() {
            warn!(id, "payload contained no usable asset");
        }
        asset
    }
}
