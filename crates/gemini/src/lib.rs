//! atelier-gemini: a [`GenerationGateway`](atelier_core::GenerationGateway)
//! backed by Google's Gemini image-generation API.
//!
//! Every operation resolves its input references to inline image data,
//! sends one `generateContent` request and returns the generated image as a
//! `data:` URL.

pub mod client;
pub mod config;
pub mod prompts;
pub mod protocol;

pub use client::GeminiGateway;
pub use config::{ConfigError, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
