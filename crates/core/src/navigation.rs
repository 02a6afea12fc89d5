//! Previous/next pose stepping.
//!
//! Stepping prefers poses already generated for the active layer and only
//! falls through to the full catalog when it runs off the end of what is
//! cached. Running off the end is how new poses get generated.

use serde::{Deserialize, Serialize};

use crate::catalog::PoseCatalog;
use crate::layer::OutfitLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseDirection {
    Previous,
    Next,
}

/// Catalog index a step from `current` lands on, or `None` when the step is
/// disabled (previous with fewer than two generated poses).
pub fn step_target(
    catalog: &PoseCatalog,
    layer: &OutfitLayer,
    current: usize,
    direction: PoseDirection,
) -> Option<usize> {
    let available = layer.available_poses(catalog);
    let position = available.iter().position(|&index| index == current);

    match direction {
        PoseDirection::Previous => {
            if available.len() < 2 {
                return None;
            }
            match position {
                Some(pos) => Some(available[(pos + available.len() - 1) % available.len()]),
                None => Some(catalog.wrap_previous(current)),
            }
        }
        PoseDirection::Next => match position {
            Some(pos) if pos + 1 < available.len() => Some(available[pos + 1]),
            _ => Some(catalog.wrap_next(current)),
        },
    }
}

/// Whether the previous-pose control is enabled for this layer.
pub fn can_step_previous(catalog: &PoseCatalog, layer: &OutfitLayer) -> bool {
    layer.available_poses(catalog).len() >= 2
}
