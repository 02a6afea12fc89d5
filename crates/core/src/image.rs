//! Image references and inline image payloads.

use std::fmt;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::ImageError;

/// An opaque reference to an image: an `http(s)` URL or a `data:` URL.
///
/// The core only stores, compares and forwards these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        ImageRef(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `data:` URLs, which carry the image bytes inline.
    pub fn is_inline(&self) -> bool {
        self.0.starts_with("data:")
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ImageRef {
    /// Inline payloads are summarized so logs never carry image bytes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_inline() {
            let mime = self.0[5..].split(';').next().unwrap_or("");
            write!(f, "<inline {} ({} bytes)>", mime, self.0.len())
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        ImageRef::new(s)
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        ImageRef(s)
    }
}

/// Raw image bytes with their MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct InlineImage {
    mime_type: String,
    data: Vec<u8>,
}

impl fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl InlineImage {
    /// Wrap bytes with an explicit MIME type, which must be `image/*`.
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Result<Self, ImageError> {
        let mime_type = mime_type.into().trim().to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(ImageError::NotAnImage(mime_type));
        }
        Ok(InlineImage { mime_type, data })
    }

    /// Detect the image type from the bytes, falling back to the file
    /// extension of `file_name` when the signature is not recognized.
    pub fn sniff(data: Vec<u8>, file_name: Option<&str>) -> Result<Self, ImageError> {
        if let Ok(format) = image::guess_format(&data) {
            return InlineImage::new(format.to_mime_type(), data);
        }
        match file_name.and_then(mime_from_extension) {
            Some(mime) => InlineImage::new(mime, data),
            None => Err(ImageError::NotAnImage(
                file_name.unwrap_or("unrecognized data").to_string(),
            )),
        }
    }

    /// Build from a MIME type and a base64 payload, as returned by the model.
    pub fn from_base64(mime_type: &str, payload: &str) -> Result<Self, ImageError> {
        let data = BASE64
            .decode(payload.trim())
            .map_err(|e| ImageError::InvalidBase64(e.to_string()))?;
        InlineImage::new(mime_type, data)
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> Result<Self, ImageError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::MalformedDataUrl("missing 'data:' prefix".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ImageError::MalformedDataUrl("missing ',' separator".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ImageError::MalformedDataUrl("payload is not base64".to_string()))?;
        InlineImage::from_base64(mime_type, payload)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn base64_data(&self) -> String {
        BASE64.encode(&self.data)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data())
    }

    pub fn to_image_ref(&self) -> ImageRef {
        ImageRef(self.to_data_url())
    }

    /// Conventional file extension for the MIME type, for writing to disk.
    pub fn file_extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/svg+xml" => "svg",
            other => other.strip_prefix("image/").unwrap_or("img"),
        }
    }
}

/// MIME type for upload extensions the signature sniffer does not know.
fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    if let Ok(format) = image::ImageFormat::from_path(file_name) {
        return Some(format.to_mime_type());
    }
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}
