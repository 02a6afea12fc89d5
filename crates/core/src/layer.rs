//! Outfit layers and the linear history they form.
//!
//! The history is an undo/redo list with branch overwrite: the cursor marks
//! the active layer, layers after it form a redo suffix that survives until
//! the next new garment truncates it away. It never becomes a tree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::PoseCatalog;
use crate::image::ImageRef;
use crate::wardrobe::Garment;

/// One step of the outfit: the garment applied at this step plus every pose
/// image generated while it was the topmost layer.
///
/// Layers are values. Adding a pose produces a new layer
/// ([`OutfitLayer::with_pose_image`]) rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutfitLayer {
    garment: Option<Garment>,
    pose_images: BTreeMap<String, ImageRef>,
}

impl OutfitLayer {
    /// The root layer: the bare model at the given pose.
    pub fn base(pose_instruction: &str, image: ImageRef) -> Self {
        OutfitLayer {
            garment: None,
            pose_images: BTreeMap::from([(pose_instruction.to_string(), image)]),
        }
    }

    /// A garment layer created at the given pose.
    pub fn dressed(garment: Garment, pose_instruction: &str, image: ImageRef) -> Self {
        OutfitLayer {
            garment: Some(garment),
            pose_images: BTreeMap::from([(pose_instruction.to_string(), image)]),
        }
    }

    /// `None` only for the root layer.
    pub fn garment(&self) -> Option<&Garment> {
        self.garment.as_ref()
    }

    pub fn garment_id(&self) -> Option<&str> {
        self.garment.as_ref().map(|g| g.id.as_str())
    }

    pub fn pose_images(&self) -> &BTreeMap<String, ImageRef> {
        &self.pose_images
    }

    pub fn image_for(&self, pose_instruction: &str) -> Option<&ImageRef> {
        self.pose_images.get(pose_instruction)
    }

    pub fn has_pose(&self, pose_instruction: &str) -> bool {
        self.pose_images.contains_key(pose_instruction)
    }

    /// A copy of this layer with one more pose image. An already-generated
    /// pose keeps its original image.
    pub fn with_pose_image(&self, pose_instruction: &str, image: ImageRef) -> Self {
        let mut next = self.clone();
        next.pose_images
            .entry(pose_instruction.to_string())
            .or_insert(image);
        next
    }

    /// Catalog indices with a generated image, in catalog order.
    pub fn available_poses(&self, catalog: &PoseCatalog) -> Vec<usize> {
        catalog
            .iter()
            .enumerate()
            .filter(|(_, instruction)| self.has_pose(instruction))
            .map(|(index, _)| index)
            .collect()
    }

    /// Stand-in image while the requested pose is not generated: the image of
    /// the lowest catalog index present, else the first stored entry.
    pub fn fallback_image(&self, catalog: &PoseCatalog) -> Option<&ImageRef> {
        catalog
            .iter()
            .find_map(|instruction| self.image_for(instruction))
            .or_else(|| self.pose_images.values().next())
    }

    /// The image to show for `pose_index`, falling back when it is not generated.
    pub fn resolve_image(&self, catalog: &PoseCatalog, pose_index: usize) -> Option<&ImageRef> {
        catalog
            .get(pose_index)
            .and_then(|instruction| self.image_for(instruction))
            .or_else(|| self.fallback_image(catalog))
    }
}

/// The ordered outfit layers plus the active-layer cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutfitHistory {
    layers: Vec<OutfitLayer>,
    cursor: usize,
}

impl OutfitHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a single root layer.
    pub fn seed(&mut self, root: OutfitLayer) {
        debug_assert!(root.garment.is_none(), "root layer must not carry a garment");
        self.layers = vec![root];
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.cursor = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Physical length, including any redo suffix.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn layers(&self) -> &[OutfitLayer] {
        &self.layers
    }

    pub fn active_layer(&self) -> Option<&OutfitLayer> {
        self.layers.get(self.cursor)
    }

    /// Root through the active layer, inclusive.
    pub fn active_layers(&self) -> &[OutfitLayer] {
        if self.layers.is_empty() {
            return &[];
        }
        &self.layers[..=self.cursor]
    }

    pub fn active_garment_ids(&self) -> Vec<&str> {
        self.active_layers()
            .iter()
            .filter_map(OutfitLayer::garment_id)
            .collect()
    }

    /// The layer right after the cursor, kept for free forward replay.
    pub fn redo_candidate(&self) -> Option<&OutfitLayer> {
        self.layers.get(self.cursor + 1)
    }

    /// Move onto the redo candidate. Returns false when there is none.
    pub fn advance(&mut self) -> bool {
        if self.redo_candidate().is_none() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Step back one layer, never past the root. Returns false at the root.
    pub fn retreat(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Drop the redo suffix, append `layer` and make it active.
    pub fn branch(&mut self, layer: OutfitLayer) {
        debug_assert!(!self.layers.is_empty(), "branch requires a root layer");
        debug_assert!(layer.garment.is_some(), "only the root layer may lack a garment");
        self.layers.truncate(self.cursor + 1);
        self.layers.push(layer);
        self.cursor = self.layers.len() - 1;
    }

    /// Swap the active layer for an updated value.
    pub fn replace_active(&mut self, layer: OutfitLayer) {
        if let Some(slot) = self.layers.get_mut(self.cursor) {
            *slot = layer;
        }
    }
}
