//! Error types for the try-on core.

use crate::gateway::GatewayError;

/// Errors raised while constructing a pose catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// A catalog needs at least one pose instruction.
    #[error("pose catalog is empty")]
    Empty,

    /// An instruction is empty or whitespace only.
    #[error("pose instruction at index {index} is blank")]
    Blank { index: usize },

    /// Two entries share the same text. Poses are identified by text, so
    /// duplicates would make lookups ambiguous.
    #[error("duplicate pose instruction: {0}")]
    Duplicate(String),
}

/// Errors raised while reading or validating image payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// The payload is not an image (wrong MIME type or unrecognized bytes).
    #[error("please select an image file (got {0})")]
    NotAnImage(String),

    /// A `data:` URL did not have the `data:<mime>;base64,<payload>` shape.
    #[error("malformed data URL: {0}")]
    MalformedDataUrl(String),

    /// The base64 payload could not be decoded.
    #[error("invalid base64 image data: {0}")]
    InvalidBase64(String),
}

/// All errors surfaced by a try-on session or studio.
///
/// Precondition violations (busy, nothing to remove, no display image) are
/// not errors; they are reported as skipped transitions instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TryOnError {
    /// Input validation: the requested pose index is outside the catalog.
    #[error("pose index {index} is out of range (catalog has {len} poses)")]
    PoseOutOfRange { index: usize, len: usize },

    /// Input validation: no wardrobe item with this id.
    #[error("garment '{0}' is not in the wardrobe")]
    UnknownGarment(String),

    /// Input validation: an uploaded image was rejected.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The generation gateway failed. `message` is the user-facing text
    /// that was also stored on the session.
    #[error("{message}")]
    Gateway {
        message: String,
        #[source]
        source: GatewayError,
    },

    /// The session was started over while the gateway call was in flight;
    /// the late result was discarded.
    #[error("session was reset before the generation finished")]
    SessionReset,

    /// The runtime stopped the generation task before it settled the session.
    #[error("generation was interrupted before it finished")]
    Interrupted,
}

impl TryOnError {
    /// Build a gateway error with the `"<context>: <cause>"` message shown to users.
    pub fn gateway(context: &str, source: GatewayError) -> Self {
        TryOnError::Gateway {
            message: format!("{}: {}", context, source),
            source,
        }
    }

    /// True for errors caused by bad caller input rather than the gateway.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TryOnError::PoseOutOfRange { .. } | TryOnError::UnknownGarment(_) | TryOnError::Image(_)
        )
    }
}
