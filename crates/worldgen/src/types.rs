//! Request, prompt, and operation types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// An image ready to condition world generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreparedImage {
    /// Image bytes carried inline as base64.
    Inline {
        mime_type: String,
        data_base64: String,
    },
    /// Image previously uploaded to the service's media store.
    MediaAsset { id: String },
}

impl PreparedImage {
    /// A `data:` URL for inline images, usable directly as a preview.
    pub fn data_url(&self) -> Option<String> {
        match self {
            Self::Inline {
                mime_type,
                data_base64,
            } => Some(format!("data:{mime_type};base64,{data_base64}")),
            Self::MediaAsset { .. } => None,
        }
    }
}

/// One generation attempt's input. Never mutated; the text-only fallback
/// builds a fresh request with [`GenerationRequest::without_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    theme: String,
    image: Option<PreparedImage>,
}

impl GenerationRequest {
    pub fn text(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            image: None,
        }
    }

    pub fn with_image(theme: impl Into<String>, image: PreparedImage) -> Self {
        Self {
            theme: theme.into(),
            image: Some(image),
        }
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn image(&self) -> Option<&PreparedImage> {
        self.image.as_ref()
    }

    /// Same theme, no image conditioning.
    pub fn without_image(&self) -> Self {
        Self::text(self.theme.clone())
    }

    /// The prompt the service receives for this request.
    pub fn prompt(&self) -> WorldPrompt {
        let text_prompt = world_text_prompt(&self.theme);
        match &self.image {
            Some(PreparedImage::Inline {
                mime_type,
                data_base64,
            }) => WorldPrompt::Image {
                image_prompt: ImagePrompt::DataBase64 {
                    data_base64: data_base64.clone(),
                    extension: extension_for(mime_type).into(),
                },
                text_prompt: Some(text_prompt),
            },
            Some(PreparedImage::MediaAsset { id }) => WorldPrompt::Image {
                image_prompt: ImagePrompt::MediaAsset {
                    media_asset_id: id.clone(),
                },
                text_prompt: Some(text_prompt),
            },
            None => WorldPrompt::Text { text_prompt },
        }
    }
}

/// Wire shape of the world prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldPrompt {
    Image {
        image_prompt: ImagePrompt,
        #[serde(skip_serializing_if = "Option::is_none")]
        text_prompt: Option<String>,
    },
    Text {
        text_prompt: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ImagePrompt {
    DataBase64 {
        data_base64: String,
        extension: String,
    },
    MediaAsset {
        media_asset_id: String,
    },
}

pub(crate) fn world_text_prompt(theme: &str) -> String {
    format!("A high quality, explorable 3D world of {theme}. Immersive, cinematic lighting.")
}

/// File extension for an image mime type.
pub(crate) fn extension_for(mime_type: &str) -> &'static str {
    match mime_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}

/// Truncates `theme` to at most `max` characters for use as a display name.
pub(crate) fn display_name(theme: &str, max: usize) -> String {
    theme.chars().take(max).collect()
}

/// Lifecycle of a remote operation as observed by polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    DoneSuccess,
    DoneFailure,
}

/// Handle for a long-running remote generation.
#[derive(Debug, Clone)]
pub struct Operation {
    id: String,
    state: OperationState,
    created_at: Instant,
    deadline: Duration,
}

impl Operation {
    pub fn new(id: impl Into<String>, deadline: Duration) -> Self {
        Self {
            id: id.into(),
            state: OperationState::Pending,
            created_at: Instant::now(),
            deadline,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Moves a pending operation to a terminal state. Terminal states stick.
    pub(crate) fn finish(&mut self, success: bool) {
        if self.state == OperationState::Pending {
            self.state = if success {
                OperationState::DoneSuccess
            } else {
                OperationState::DoneFailure
            };
        }
    }
}

/// Emitted once per poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub attempt: u32,
    pub elapsed: Duration,
    pub message: String,
}

impl ProgressUpdate {
    pub(crate) fn polling(attempt: u32, elapsed: Duration) -> Self {
        Self {
            attempt,
            elapsed,
            message: format!("Materializing reality... ({}s)", elapsed.as_secs()),
        }
    }
}
