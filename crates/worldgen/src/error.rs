//! Worldgen error types.

use std::time::Duration;

use threshold_net::{NetworkFailure, looks_like_markup};

/// Generic text shown instead of a markup error page.
pub const SERVICE_UNAVAILABLE: &str = "service unavailable";

/// Errors produced while talking to the generation services.
#[derive(Debug, thiserror::Error)]
pub enum WorldgenError {
    /// The service rejected the generation request.
    #[error("generation request rejected ({status}): {message}")]
    Start { status: u16, message: String },

    #[error(transparent)]
    Network(#[from] NetworkFailure),

    /// The operation reached a terminal error, or its status was unreadable.
    #[error("operation failed: {0}")]
    Poll(String),

    #[error("operation {operation_id} timed out after {}s", .elapsed.as_secs())]
    Timeout {
        operation_id: String,
        elapsed: Duration,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("media upload failed: {0}")]
    Upload(String),

    #[error("concept image error: {0}")]
    Concept(String),
}

impl WorldgenError {
    /// Short, sanitized text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Start { status, message } => {
                format!("The world service refused the request ({status}): {message}")
            }
            Self::Network(_) => {
                "Could not reach the world service over any route. Check the connection and try again."
                    .into()
            }
            Self::Poll(detail) => format!("World generation failed: {detail}"),
            Self::Timeout { elapsed, .. } => format!(
                "World generation timed out after {} minutes.",
                elapsed.as_secs().div_ceil(60)
            ),
            Self::Cancelled => "Generation cancelled.".into(),
            Self::Json(_) => "The world service sent an unreadable response.".into(),
            Self::Upload(_) => "Uploading the concept image failed.".into(),
            Self::Concept(_) => "Generating the concept image failed.".into(),
        }
    }
}

/// Makes a remote error text safe to show: markup becomes a generic
/// message, whitespace is collapsed, and the result is at most `max` chars.
pub fn sanitize_message(raw: &str, max: usize) -> String {
    if looks_like_markup(raw) {
        return SERVICE_UNAVAILABLE.into();
    }
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>();

    if collapsed.is_empty() {
        return SERVICE_UNAVAILABLE.into();
    }
    if collapsed.chars().count() <= max {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
