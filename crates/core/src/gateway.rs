//! The generation gateway boundary.
//!
//! A [`GenerationGateway`] turns images (and a pose instruction) into new
//! images by calling a remote multimodal model. The core treats every result
//! as an opaque [`ImageRef`] and never interprets image content.

use async_trait::async_trait;

use crate::image::{ImageRef, InlineImage};

/// Errors reported by a generation gateway.
///
/// The `Display` text is shown to users verbatim (after an action prefix),
/// so every variant renders as a readable sentence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Transport failure: DNS, connection, TLS, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The remote API answered with a non-success status.
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request was refused by the model's safety filters.
    #[error("Request was blocked. Reason: {reason}. {message}")]
    Blocked { reason: String, message: String },

    /// Generation ended early with a non-`STOP` finish reason.
    #[error("Image generation stopped unexpectedly. Reason: {0}")]
    Stopped(String),

    /// The response contained no image part.
    #[error("The AI model did not return an image")]
    NoImage,

    /// An input image could not be resolved to image bytes.
    #[error("invalid input image: {0}")]
    InvalidInput(String),

    /// The response body could not be parsed.
    #[error("could not parse model response: {0}")]
    Parse(String),

    /// The gateway is not configured (e.g. missing API key).
    #[error("gateway not configured: {0}")]
    Config(String),
}

/// The three generation operations the try-on flow delegates.
///
/// Implementations must be `Send + Sync` so a single gateway can be shared
/// by every session of a server.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Turn an uploaded photo into a studio model photo.
    async fn create_base_model(&self, photo: &InlineImage) -> Result<ImageRef, GatewayError>;

    /// Dress the person in `base` with the garment shown in `garment`.
    async fn apply_garment_to_image(
        &self,
        base: &ImageRef,
        garment: &ImageRef,
    ) -> Result<ImageRef, GatewayError>;

    /// Re-render `base` from the viewpoint described by `pose_instruction`.
    async fn render_pose(
        &self,
        base: &ImageRef,
        pose_instruction: &str,
    ) -> Result<ImageRef, GatewayError>;
}
