//! Gateway configuration, read from the environment.

use std::time::Duration;

/// Default image-capable model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default cap on responses and downloaded images: 32 MB.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {message}")]
    InvalidVar { var: &'static str, message: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// `None` is allowed; every call then fails with a configuration error.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Transport timeout for one call. `None` waits for the remote side.
    pub timeout: Option<Duration>,
    pub max_image_bytes: u64,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_image_bytes", &self.max_image_bytes)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl GeminiConfig {
    /// Read `GEMINI_API_KEY`, `ATELIER_GEMINI_MODEL`, `ATELIER_GEMINI_BASE_URL`,
    /// `ATELIER_GEMINI_TIMEOUT_SECS` and `ATELIER_GEMINI_MAX_IMAGE_BYTES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`GeminiConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = GeminiConfig {
            api_key: get("GEMINI_API_KEY"),
            ..GeminiConfig::default()
        };
        if let Some(model) = get("ATELIER_GEMINI_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = get("ATELIER_GEMINI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get("ATELIER_GEMINI_TIMEOUT_SECS") {
            let secs = secs
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidVar {
                    var: "ATELIER_GEMINI_TIMEOUT_SECS",
                    message: e.to_string(),
                })?;
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(bytes) = get("ATELIER_GEMINI_MAX_IMAGE_BYTES") {
            config.max_image_bytes =
                bytes
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidVar {
                        var: "ATELIER_GEMINI_MAX_IMAGE_BYTES",
                        message: e.to_string(),
                    })?;
        }
        Ok(config)
    }

    /// `{base}/v1beta/models/{model}:generateContent`
    pub fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}
