//! Studio configuration loaded from an optional TOML file (`--config`).
//!
//! ```toml
//! [studio]
//! poses = ["Full frontal view, hands on hips", "Side profile view"]
//!
//! [[wardrobe]]
//! id = "linen-shirt"
//! name = "Linen Shirt"
//! image = "https://example.com/linen-shirt.png"
//!
//! [server]
//! port = 8080
//! max_body_bytes = 26214400
//! ```
//!
//! Every section is optional; missing sections fall back to the built-in
//! pose catalog, the default wardrobe and the server defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use atelier_core::{default_garments, Garment, PoseCatalog, Wardrobe};

/// Default request body cap for the studio server: 25 MB, enough for a
/// base64-encoded phone photo.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

pub(crate) const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub(crate) enum StudioConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StudioConfig {
    #[serde(default)]
    pub(crate) studio: StudioSection,
    #[serde(default)]
    pub(crate) wardrobe: Option<Vec<Garment>>,
    #[serde(default)]
    pub(crate) server: ServerSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StudioSection {
    /// Custom pose catalog; validated on load.
    #[serde(default)]
    pub(crate) poses: Option<PoseCatalog>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServerSection {
    #[serde(default)]
    pub(crate) port: Option<u16>,
    #[serde(default)]
    pub(crate) max_body_bytes: Option<usize>,
}

impl StudioConfig {
    pub(crate) fn load(path: &Path) -> Result<Self, StudioConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| StudioConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| StudioConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub(crate) fn catalog(&self) -> PoseCatalog {
        self.studio.poses.clone().unwrap_or_default()
    }

    pub(crate) fn wardrobe(&self) -> Wardrobe {
        match &self.wardrobe {
            Some(items) => Wardrobe::new(items.iter().cloned()),
            None => Wardrobe::new(default_garments()),
        }
    }

    /// `--port` wins over the file, which wins over the default.
    pub(crate) fn port(&self, flag: Option<u16>) -> u16 {
        flag.or(self.server.port).unwrap_or(DEFAULT_PORT)
    }

    pub(crate) fn max_body_bytes(&self) -> usize {
        self.server.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES)
    }
}
