//! Garment descriptors and the wardrobe they are picked from.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::image::ImageRef;

/// A garment that can be layered onto the model. Immutable; `id` is the
/// equality key everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Garment {
    pub id: String,
    pub name: String,
    pub image: ImageRef,
}

impl Garment {
    pub fn new(id: impl Into<String>, name: impl Into<String>, image: impl Into<ImageRef>) -> Self {
        Garment {
            id: id.into(),
            name: name.into(),
            image: image.into(),
        }
    }

    /// A user-uploaded garment, identified as `custom-<unix millis>`.
    pub fn custom(name: impl Into<String>, image: impl Into<ImageRef>) -> Self {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        Garment::new(format!("custom-{}", millis), name, image)
    }

    pub fn is_custom(&self) -> bool {
        self.id.starts_with("custom-")
    }
}

/// The garments shipped with the studio.
pub fn default_garments() -> Vec<Garment> {
    vec![
        Garment::new(
            "black-jodhpuri",
            "Black Jodhpuri Suit",
            "https://raw.githubusercontent.com/Raghav-Luthra/Spannick-Designers-Visual/main/blacksherwani.png",
        ),
        Garment::new(
            "purple-suit",
            "Purple Business Suit",
            "https://raw.githubusercontent.com/Raghav-Luthra/Spannick-Designers-Visual/main/purplesuit.png",
        ),
    ]
}

/// Insertion-ordered set of garments keyed by id. Grows monotonically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Wardrobe {
    items: Vec<Garment>,
}

impl Wardrobe {
    /// Build a wardrobe; later items with an id already seen are dropped.
    pub fn new(items: impl IntoIterator<Item = Garment>) -> Self {
        let mut wardrobe = Wardrobe::default();
        for item in items {
            wardrobe.insert(item);
        }
        wardrobe
    }

    /// Add a garment unless its id is already present. Returns whether it was added.
    pub fn insert(&mut self, garment: Garment) -> bool {
        if self.contains(&garment.id) {
            return false;
        }
        self.items.push(garment);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|g| g.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Garment> {
        self.items.iter().find(|g| g.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Garment> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
