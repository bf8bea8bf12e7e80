//! 2D concept image generation.
//!
//! A concept image conditions world generation on a specific look. It is
//! optional: any failure here means the pipeline continues text-only.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use threshold_net::{AcceptPolicy, LogicalRequest, Resolver};
use tracing::{debug, info};

use crate::error::{WorldgenError, sanitize_message};
use crate::types::PreparedImage;

/// Produces a concept image for a theme.
pub trait ConceptImageSource: Send + Sync {
    fn generate<'a>(
        &'a self,
        theme: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<PreparedImage, WorldgenError>> + Send + 'a>>;
}

/// Settings for the image model endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub aspect_ratio: String,
    pub image_size: String,
}

impl Default for ConceptConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-3-pro-image-preview".into(),
            api_key: String::new(),
            aspect_ratio: "1:1".into(),
            image_size: "1K".into(),
        }
    }
}

/// Concept images from a `generateContent` image model.
#[derive(Debug, Clone)]
pub struct GeminiConceptClient {
    resolver: Resolver,
    config: ConceptConfig,
}

impl GeminiConceptClient {
    pub fn new(resolver: Resolver, config: ConceptConfig) -> Self {
        Self { resolver, config }
    }

    async fn request_image(&self, theme: &str) -> Result<PreparedImage, WorldgenError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let body = json!({
            "contents": [{"parts": [{"text": concept_prompt(theme)}]}],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": {
                    "aspectRatio": self.config.aspect_ratio,
                    "imageSize": self.config.image_size,
                },
            },
        });
        let request = LogicalRequest::post_json(url, &body)?
            .with_header("x-goog-api-key", &self.config.api_key);

        debug!(%theme, model = %self.config.model, "requesting concept image");
        let resp = self
            .resolver
            .resolve(&request, AcceptPolicy::SuccessOnly)
            .await
            .map_err(|f| WorldgenError::Concept(f.to_string()))?;

        let value: Value = serde_json::from_slice(&resp.body)
            .map_err(|_| WorldgenError::Concept(sanitize_message(&resp.text(), 200)))?;
        let image = extract_inline_image(&value)
            .ok_or_else(|| WorldgenError::Concept("response contained no image".into()))?;

        info!(%theme, "concept image ready");
        Ok(image)
    }
}

impl ConceptImageSource for GeminiConceptClient {
    fn generate<'a>(
        &'a self,
        theme: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<PreparedImage, WorldgenError>> + Send + 'a>> {
        Box::pin(self.request_image(theme))
    }
}

fn concept_prompt(theme: &str) -> String {
    format!(
        "A first-person view standing inside {theme}. Photorealistic, \
         wide field of view, rich detail, even lighting, no text."
    )
}

/// Finds the first inline image part in a `generateContent` response.
/// Accepts both camelCase and snake_case field names.
fn extract_inline_image(value: &Value) -> Option<PreparedImage> {
    let candidates = value.get("candidates")?.as_array()?;
    candidates
        .iter()
        .filter_map(|c| c.pointer("/content/parts")?.as_array())
        .flatten()
        .find_map(|part| {
            let inline = part.get("inlineData").or_else(|| part.get("inline_data"))?;
            let data = inline.get("data")?.as_str().filter(|d| !d.is_empty())?;
            let mime_type = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            Some(PreparedImage::Inline {
                mime_type: mime_type.to_string(),
                data_base64: data.to_string(),
            })
        })
}
