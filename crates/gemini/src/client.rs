//! `GeminiGateway`: the generation gateway backed by the Gemini API.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` so calls do
//! not block the async runtime.

use async_trait::async_trait;
use ureq::Agent;

use atelier_core::{GatewayError, GenerationGateway, ImageRef, InlineImage};

use crate::config::GeminiConfig;
use crate::prompts::{pose_prompt, MODEL_PROMPT, TRY_ON_PROMPT};
use crate::protocol::{error_message, GenerateContentRequest, GenerateContentResponse};

pub struct GeminiGateway {
    config: GeminiConfig,
    agent: Agent,
}

impl GeminiGateway {
    pub fn new(config: GeminiConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .build()
            .into();
        GeminiGateway { config, agent }
    }

    /// Build from the process environment. A missing API key is tolerated
    /// here and reported on the first call instead.
    pub fn from_env() -> Result<Self, crate::ConfigError> {
        Ok(Self::new(GeminiConfig::from_env()?))
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Send one generation request: images first, then the prompt.
    async fn generate(
        &self,
        action: &'static str,
        images: Vec<InlineImage>,
        prompt: String,
    ) -> Result<ImageRef, GatewayError> {
        let api_key = self.config.api_key.clone().ok_or_else(|| {
            GatewayError::Config("GEMINI_API_KEY environment variable not set".to_string())
        })?;
        let url = self.config.generate_url();
        let agent = self.agent.clone();
        let limit = self.config.max_image_bytes;
        let body = GenerateContentRequest::new(&images, &prompt);

        tracing::info!(action, model = %self.config.model, images = images.len(), "calling Gemini");

        let image = tokio::task::spawn_blocking(move || {
            let mut response = agent
                .post(&url)
                .header("x-goog-api-key", &api_key)
                .header("content-type", "application/json")
                .send_json(&body)
                .map_err(|e| GatewayError::Network(e.to_string()))?;

            let status = response.status().as_u16();
            let text = response
                .body_mut()
                .with_config()
                .limit(limit)
                .read_to_string()
                .map_err(|e| GatewayError::Network(format!("failed to read response: {}", e)))?;

            if !(200..300).contains(&status) {
                return Err(GatewayError::Api {
                    status,
                    message: error_message(&text),
                });
            }

            let parsed: GenerateContentResponse =
                serde_json::from_str(&text).map_err(|e| GatewayError::Parse(e.to_string()))?;
            parsed.into_image()
        })
        .await
        .map_err(|e| GatewayError::Network(format!("task join error: {}", e)))?;

        match image {
            Ok(image) => {
                tracing::info!(action, mime = image.mime_type(), bytes = image.data().len(), "Gemini returned an image");
                Ok(image.to_image_ref())
            }
            Err(e) => {
                tracing::warn!(action, error = %e, "Gemini call failed");
                Err(e)
            }
        }
    }

    /// Resolve an image reference to bytes: decode `data:` URLs, download
    /// `http(s)` URLs.
    async fn resolve(&self, image: &ImageRef) -> Result<InlineImage, GatewayError> {
        if image.is_inline() {
            return InlineImage::from_data_url(image.as_str())
                .map_err(|e| GatewayError::InvalidInput(e.to_string()));
        }
        let url = image.as_str().to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(GatewayError::InvalidInput(format!(
                "unsupported image reference: {}",
                image
            )));
        }

        let agent = self.agent.clone();
        let limit = self.config.max_image_bytes;
        tracing::debug!(url = %url, "downloading input image");
        tokio::task::spawn_blocking(move || fetch_image(&agent, &url, limit))
            .await
            .map_err(|e| GatewayError::Network(format!("task join error: {}", e)))?
    }
}

/// Download an image; the declared content type is trusted only when it is
/// an image type, otherwise the bytes are sniffed.
fn fetch_image(agent: &Agent, url: &str, limit: u64) -> Result<InlineImage, GatewayError> {
    let mut response = agent
        .get(url)
        .call()
        .map_err(|e| GatewayError::Network(format!("failed to load {}: {}", url, e)))?;

    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        return Err(GatewayError::InvalidInput(format!(
            "failed to load {}: HTTP {}",
            url, status
        )));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_string());
    let data = response
        .body_mut()
        .with_config()
        .limit(limit)
        .read_to_vec()
        .map_err(|e| GatewayError::Network(format!("failed to read {}: {}", url, e)))?;

    let file_name = url.rsplit('/').next();
    let result = match content_type {
        Some(mime) if mime.starts_with("image/") => InlineImage::new(mime, data),
        _ => InlineImage::sniff(data, file_name),
    };
    result.map_err(|e| GatewayError::InvalidInput(format!("{}: {}", url, e)))
}

#[async_trait]
impl GenerationGateway for GeminiGateway {
    async fn create_base_model(&self, photo: &InlineImage) -> Result<ImageRef, GatewayError> {
        self.generate("generate_model", vec![photo.clone()], MODEL_PROMPT.to_string())
            .await
    }

    async fn apply_garment_to_image(
        &self,
        base: &ImageRef,
        garment: &ImageRef,
    ) -> Result<ImageRef, GatewayError> {
        let base = self.resolve(base).await?;
        let garment = self.resolve(garment).await?;
        self.generate("generate_try_on", vec![base, garment], TRY_ON_PROMPT.to_string())
            .await
    }

    async fn render_pose(
        &self,
        base: &ImageRef,
        pose_instruction: &str,
    ) -> Result<ImageRef, GatewayError> {
        let base = self.resolve(base).await?;
        self.generate("generate_pose", vec![base], pose_prompt(pose_instruction))
            .await
    }
}
