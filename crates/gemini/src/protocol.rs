//! Wire types for the `generateContent` endpoint and response interpretation.

use serde::{Deserialize, Serialize};

use atelier_core::{GatewayError, InlineImage};

// ──────────────────────────────────────────────
// Request
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

/// One part of a message: inline image data or text. The API answers in
/// camelCase but accepts snake_case too, so both spellings are read.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none", alias = "inline_data")]
    pub inline_data: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

impl GenerateContentRequest {
    /// Images first, then the instruction text; ask for an image back.
    pub fn new(images: &[InlineImage], prompt: &str) -> Self {
        let mut parts: Vec<Part> = images
            .iter()
            .map(|image| Part {
                inline_data: Some(Blob {
                    mime_type: image.mime_type().to_string(),
                    data: image.base64_data(),
                }),
                text: None,
            })
            .collect();
        parts.push(Part {
            inline_data: None,
            text: Some(prompt.to_string()),
        });
        GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

// ──────────────────────────────────────────────
// Response
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, alias = "block_reason")]
    pub block_reason: Option<String>,
    #[serde(default, alias = "block_reason_message")]
    pub block_reason_message: Option<String>,
}

impl GenerateContentResponse {
    /// Extract the generated image.
    ///
    /// A blocked prompt wins over everything; otherwise the first candidate
    /// part carrying inline data is the result. Without one, a non-`STOP`
    /// finish reason explains why.
    pub fn into_image(self) -> Result<InlineImage, GatewayError> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            let message = self
                .prompt_feedback
                .and_then(|f| f.block_reason_message)
                .unwrap_or_default();
            return Err(GatewayError::Blocked { reason, message });
        }

        let first_finish_reason = self
            .candidates
            .first()
            .and_then(|c| c.finish_reason.clone());

        for candidate in self.candidates {
            let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
            if let Some(blob) = parts.into_iter().find_map(|p| p.inline_data) {
                return InlineImage::from_base64(&blob.mime_type, &blob.data)
                    .map_err(|e| GatewayError::Parse(e.to_string()));
            }
        }

        match first_finish_reason {
            Some(reason) if reason != "STOP" => Err(GatewayError::Stopped(reason)),
            _ => Err(GatewayError::NoImage),
        }
    }
}

/// Pull a readable message out of an error body (`{"error": {"message": ...}}`),
/// falling back to the raw text.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
