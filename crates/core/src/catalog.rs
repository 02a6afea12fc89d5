//! The pose catalog: a fixed, ordered, circular list of pose instructions.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Pose instructions offered when no custom catalog is configured.
pub const DEFAULT_POSE_INSTRUCTIONS: [&str; 6] = [
    "Full frontal view, hands on hips",
    "Slightly turned, 3/4 view",
    "Side profile view",
    "Jumping in the air, mid-action shot",
    "Walking towards camera",
    "Leaning against a wall",
];

/// Ordered pose instructions. Identity is by exact text; order defines
/// next/previous wraparound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PoseCatalog {
    instructions: Vec<String>,
}

impl PoseCatalog {
    /// Build a catalog, rejecting empty lists, blank entries and duplicates.
    pub fn new<I, S>(instructions: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let instructions: Vec<String> = instructions.into_iter().map(Into::into).collect();
        if instructions.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (index, instruction) in instructions.iter().enumerate() {
            if instruction.trim().is_empty() {
                return Err(CatalogError::Blank { index });
            }
            if instructions[..index].contains(instruction) {
                return Err(CatalogError::Duplicate(instruction.clone()));
            }
        }
        Ok(PoseCatalog { instructions })
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.instructions.get(index).map(String::as_str)
    }

    /// Catalog index of an instruction, by exact text.
    pub fn position(&self, instruction: &str) -> Option<usize> {
        self.instructions.iter().position(|i| i == instruction)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.instructions.iter().map(String::as_str)
    }

    /// Next index with wraparound.
    pub fn wrap_next(&self, index: usize) -> usize {
        (index + 1) % self.len()
    }

    /// Previous index with wraparound.
    pub fn wrap_previous(&self, index: usize) -> usize {
        (index + self.len() - 1) % self.len()
    }
}

impl Default for PoseCatalog {
    fn default() -> Self {
        PoseCatalog {
            instructions: DEFAULT_POSE_INSTRUCTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for PoseCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let instructions = Vec::<String>::deserialize(deserializer)?;
        PoseCatalog::new(instructions).map_err(serde::de::Error::custom)
    }
}
