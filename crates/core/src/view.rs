//! Read-only projection of a session for presentation.
//!
//! Everything here is recomputed from the session on demand; nothing is
//! cached, so there is nothing to invalidate.

use serde::Serialize;

use crate::image::ImageRef;
use crate::navigation::can_step_previous;
use crate::session::Session;
use crate::wardrobe::Garment;

/// Label used for the root layer.
pub const BASE_LAYER_NAME: &str = "Base Avatar";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub outfit_index: usize,
    pub history_len: usize,
    /// Root through the active layer.
    pub layers: Vec<LayerView>,
    pub active_garment_ids: Vec<String>,
    pub can_remove_garment: bool,
    pub display_image: Option<ImageRef>,
    pub pose_index: usize,
    pub pose_instruction: String,
    pub available_poses: Vec<PoseView>,
    pub can_step_previous: bool,
    pub wardrobe: Vec<Garment>,
    pub error: Option<String>,
    pub loading: bool,
    pub loading_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerView {
    pub index: usize,
    pub garment_id: Option<String>,
    pub name: String,
    pub generated_poses: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoseView {
    pub index: usize,
    pub instruction: String,
}

impl SessionView {
    pub fn of(session: &Session) -> Self {
        let history = session.history();
        let catalog = session.catalog();

        let layers = history
            .active_layers()
            .iter()
            .enumerate()
            .map(|(index, layer)| LayerView {
                index,
                garment_id: layer.garment_id().map(str::to_string),
                name: layer
                    .garment()
                    .map(|g| g.name.clone())
                    .unwrap_or_else(|| BASE_LAYER_NAME.to_string()),
                generated_poses: layer.pose_images().len(),
            })
            .collect();

        let available_poses = session
            .available_poses()
            .into_iter()
            .map(|index| PoseView {
                index,
                instruction: catalog.get(index).unwrap_or_default().to_string(),
            })
            .collect();

        SessionView {
            outfit_index: history.cursor(),
            history_len: history.len(),
            layers,
            active_garment_ids: history
                .active_garment_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
            can_remove_garment: history.cursor() > 0 && !session.is_pending(),
            display_image: session.display_image().cloned(),
            pose_index: session.pose_index(),
            pose_instruction: session.pose_instruction().to_string(),
            available_poses,
            can_step_previous: history
                .active_layer()
                .is_some_and(|layer| can_step_previous(catalog, layer)),
            wardrobe: session.wardrobe().iter().cloned().collect(),
            error: session.error().map(str::to_string),
            loading: session.is_pending(),
            loading_message: session.loading_message().map(str::to_string),
        }
    }
}
