//! The try-on session state machine.
//!
//! A [`Session`] owns the outfit history, both cursors, the wardrobe and the
//! user-facing error/loading state. It never talks to the gateway itself:
//! every intent that may need a generation is split into a `begin_*` call,
//! which validates, applies optimistic state and hands back a request, and a
//! `finish_*` call, which commits or rolls back once the result is known.
//! Between the two the session is [`Phase::Pending`] and further intents are
//! dropped.

use serde::Serialize;

use crate::catalog::PoseCatalog;
use crate::error::TryOnError;
use crate::gateway::GatewayError;
use crate::image::{ImageRef, InlineImage};
use crate::layer::{OutfitHistory, OutfitLayer};
use crate::navigation::{step_target, PoseDirection};
use crate::wardrobe::{default_garments, Garment, Wardrobe};

const CREATE_MODEL_FAILED: &str = "Failed to create model";
const APPLY_GARMENT_FAILED: &str = "Failed to apply garment";
const CHANGE_POSE_FAILED: &str = "Failed to change pose";

// ──────────────────────────────────────────────
// Outcomes
// ──────────────────────────────────────────────

/// What an intent did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum Transition {
    /// A base model was finalized and the history seeded.
    Seeded,
    /// A cursor moved without generating anything.
    Moved,
    /// A cached garment layer was replayed.
    Replayed,
    /// The gateway produced a new image that was committed.
    Generated,
    /// A precondition did not hold; nothing changed.
    Skipped(SkipReason),
}

/// Why an intent was a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A generation is already in flight.
    Busy,
    /// No base model has been finalized yet.
    NoHistory,
    /// There is no image to dress.
    NoDisplayImage,
    /// The garment is already one of the active layers.
    AlreadyWorn,
    /// The requested pose is already selected.
    SamePose,
    /// Only the base layer is active.
    AtBaseLayer,
    /// Fewer than two poses are generated for the active layer.
    NoPreviousPose,
}

/// Result of a `begin_*` call: either settled synchronously or waiting for
/// the gateway to produce an image for the enclosed request.
#[derive(Debug)]
pub enum Start<R> {
    Settled(Transition),
    Generate(R),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending { message: String },
}

// ──────────────────────────────────────────────
// Generation requests
// ──────────────────────────────────────────────

/// Pending base-model generation.
#[derive(Debug)]
#[must_use = "a request must be finished to leave the pending phase"]
pub struct ModelRequest {
    pub photo: InlineImage,
    epoch: u64,
}

/// Pending garment generation.
#[derive(Debug)]
#[must_use = "a request must be finished to leave the pending phase"]
pub struct GarmentRequest {
    pub garment: Garment,
    /// The display image at the time of the request.
    pub base_image: ImageRef,
    /// The pose the new layer is created at.
    pub pose_instruction: String,
    epoch: u64,
}

/// Pending pose generation.
#[derive(Debug)]
#[must_use = "a request must be finished to leave the pending phase"]
pub struct PoseRequest {
    pub pose_index: usize,
    pub pose_instruction: String,
    /// An existing image of the active layer to re-render.
    pub base_image: ImageRef,
    previous_pose_index: usize,
    epoch: u64,
}

// ──────────────────────────────────────────────
// Session
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Session {
    catalog: PoseCatalog,
    default_wardrobe: Wardrobe,
    wardrobe: Wardrobe,
    history: OutfitHistory,
    pose_index: usize,
    model_image: Option<ImageRef>,
    error: Option<String>,
    phase: Phase,
    epoch: u64,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(PoseCatalog::default(), Wardrobe::new(default_garments()))
    }
}

impl Session {
    /// A fresh session; `wardrobe` is also what "start over" restores.
    pub fn new(catalog: PoseCatalog, wardrobe: Wardrobe) -> Self {
        Session {
            catalog,
            default_wardrobe: wardrobe.clone(),
            wardrobe,
            history: OutfitHistory::new(),
            pose_index: 0,
            model_image: None,
            error: None,
            phase: Phase::Idle,
            epoch: 0,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn catalog(&self) -> &PoseCatalog {
        &self.catalog
    }

    pub fn wardrobe(&self) -> &Wardrobe {
        &self.wardrobe
    }

    pub fn history(&self) -> &OutfitHistory {
        &self.history
    }

    pub fn outfit_index(&self) -> usize {
        self.history.cursor()
    }

    pub fn pose_index(&self) -> usize {
        self.pose_index
    }

    pub fn pose_instruction(&self) -> &str {
        self.catalog.get(self.pose_index).unwrap_or_default()
    }

    pub fn model_image(&self) -> Option<&ImageRef> {
        self.model_image.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Pending { .. })
    }

    pub fn loading_message(&self) -> Option<&str> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Pending { message } => Some(message),
        }
    }

    /// The image to show: the active layer at the selected pose, a fallback
    /// pose of that layer, or the bare model before any history exists.
    pub fn display_image(&self) -> Option<&ImageRef> {
        match self.history.active_layer() {
            Some(layer) => layer.resolve_image(&self.catalog, self.pose_index),
            None => self.model_image.as_ref(),
        }
    }

    /// Catalog indices generated for the active layer.
    pub fn available_poses(&self) -> Vec<usize> {
        self.history
            .active_layer()
            .map(|layer| layer.available_poses(&self.catalog))
            .unwrap_or_default()
    }

    // ── Base model ───────────────────────────────────────────────────

    pub fn begin_create_model(&mut self, photo: InlineImage) -> Start<ModelRequest> {
        if self.is_pending() {
            return skip(SkipReason::Busy);
        }
        self.enter_pending("Creating your model...");
        Start::Generate(ModelRequest {
            photo,
            epoch: self.epoch,
        })
    }

    /// Settle a model generation. The image is returned, not installed;
    /// installing it is [`Session::finalize_base_model`].
    pub fn finish_create_model(
        &mut self,
        request: ModelRequest,
        result: Result<ImageRef, GatewayError>,
    ) -> Result<ImageRef, TryOnError> {
        self.settle(request.epoch)?;
        result.map_err(|e| self.fail(CREATE_MODEL_FAILED, e))
    }

    /// Seed the history with the bare model at the first catalog pose.
    pub fn finalize_base_model(&mut self, image: ImageRef) -> Transition {
        if self.is_pending() {
            return Transition::Skipped(SkipReason::Busy);
        }
        let root_pose = self.catalog.get(0).unwrap_or_default().to_string();
        tracing::debug!(image = %image, "finalizing base model");
        self.history.seed(OutfitLayer::base(&root_pose, image.clone()));
        self.model_image = Some(image);
        self.pose_index = 0;
        self.error = None;
        Transition::Seeded
    }

    // ── Garments ─────────────────────────────────────────────────────

    pub fn begin_apply_garment(&mut self, garment: Garment) -> Start<GarmentRequest> {
        if self.is_pending() {
            return skip(SkipReason::Busy);
        }
        if self.history.is_empty() {
            return skip(SkipReason::NoHistory);
        }
        let base_image = match self.display_image() {
            Some(image) => image.clone(),
            None => return skip(SkipReason::NoDisplayImage),
        };
        if self.history.active_garment_ids().contains(&garment.id.as_str()) {
            return skip(SkipReason::AlreadyWorn);
        }

        let is_replay = self
            .history
            .redo_candidate()
            .and_then(OutfitLayer::garment_id)
            .is_some_and(|id| id == garment.id);
        if is_replay {
            self.history.advance();
            self.pose_index = 0;
            tracing::debug!(garment = %garment.id, outfit_index = self.history.cursor(), "replayed cached layer");
            return Start::Settled(Transition::Replayed);
        }

        self.enter_pending(&format!("Adding {}...", garment.name));
        Start::Generate(GarmentRequest {
            garment,
            base_image,
            pose_instruction: self.pose_instruction().to_string(),
            epoch: self.epoch,
        })
    }

    /// Commit a new garment layer after the cursor, discarding the redo
    /// suffix, or leave history untouched on failure.
    pub fn finish_apply_garment(
        &mut self,
        request: GarmentRequest,
        result: Result<ImageRef, GatewayError>,
    ) -> Result<Transition, TryOnError> {
        self.settle(request.epoch)?;
        let image = result.map_err(|e| self.fail(APPLY_GARMENT_FAILED, e))?;

        let discarded = self.history.len() - self.history.cursor() - 1;
        self.history.branch(OutfitLayer::dressed(
            request.garment.clone(),
            &request.pose_instruction,
            image,
        ));
        tracing::debug!(
            garment = %request.garment.id,
            outfit_index = self.history.cursor(),
            discarded,
            "applied garment"
        );
        self.wardrobe.insert(request.garment);
        Ok(Transition::Generated)
    }

    /// Step back one layer. The abandoned layer stays as the redo candidate.
    pub fn remove_last_garment(&mut self) -> Transition {
        if self.is_pending() {
            return Transition::Skipped(SkipReason::Busy);
        }
        if self.history.is_empty() {
            return Transition::Skipped(SkipReason::NoHistory);
        }
        if !self.history.retreat() {
            return Transition::Skipped(SkipReason::AtBaseLayer);
        }
        self.pose_index = 0;
        tracing::debug!(outfit_index = self.history.cursor(), "removed last garment");
        Transition::Moved
    }

    // ── Poses ────────────────────────────────────────────────────────

    pub fn begin_select_pose(&mut self, target: usize) -> Result<Start<PoseRequest>, TryOnError> {
        let instruction = match self.catalog.get(target) {
            Some(instruction) => instruction.to_string(),
            None => {
                return Err(TryOnError::PoseOutOfRange {
                    index: target,
                    len: self.catalog.len(),
                })
            }
        };
        if self.is_pending() {
            return Ok(skip(SkipReason::Busy));
        }
        let layer = match self.history.active_layer() {
            Some(layer) => layer,
            None => return Ok(skip(SkipReason::NoHistory)),
        };
        if target == self.pose_index {
            return Ok(skip(SkipReason::SamePose));
        }
        if layer.has_pose(&instruction) {
            self.pose_index = target;
            tracing::debug!(pose_index = target, "moved to cached pose");
            return Ok(Start::Settled(Transition::Moved));
        }
        let base_image = match layer.fallback_image(&self.catalog) {
            Some(image) => image.clone(),
            None => return Ok(skip(SkipReason::NoDisplayImage)),
        };

        let previous_pose_index = self.pose_index;
        self.pose_index = target;
        self.enter_pending("Changing pose...");
        Ok(Start::Generate(PoseRequest {
            pose_index: target,
            pose_instruction: instruction,
            base_image,
            previous_pose_index,
            epoch: self.epoch,
        }))
    }

    /// Store the generated pose on whichever layer is active now, or revert
    /// the optimistic pose cursor on failure.
    pub fn finish_select_pose(
        &mut self,
        request: PoseRequest,
        result: Result<ImageRef, GatewayError>,
    ) -> Result<Transition, TryOnError> {
        self.settle(request.epoch)?;
        match result {
            Ok(image) => {
                if let Some(layer) = self.history.active_layer() {
                    let updated = layer.with_pose_image(&request.pose_instruction, image);
                    self.history.replace_active(updated);
                }
                tracing::debug!(pose_index = request.pose_index, "generated pose");
                Ok(Transition::Generated)
            }
            Err(e) => {
                self.pose_index = request.previous_pose_index;
                Err(self.fail(CHANGE_POSE_FAILED, e))
            }
        }
    }

    /// Previous/next pose, preferring poses already generated for the layer.
    pub fn begin_step_pose(
        &mut self,
        direction: PoseDirection,
    ) -> Result<Start<PoseRequest>, TryOnError> {
        if self.is_pending() {
            return Ok(skip(SkipReason::Busy));
        }
        let layer = match self.history.active_layer() {
            Some(layer) => layer,
            None => return Ok(skip(SkipReason::NoHistory)),
        };
        match step_target(&self.catalog, layer, self.pose_index, direction) {
            Some(target) => self.begin_select_pose(target),
            None => Ok(skip(SkipReason::NoPreviousPose)),
        }
    }

    // ── Reset ────────────────────────────────────────────────────────

    /// Back to an empty session with the default wardrobe. Any generation
    /// still in flight will be discarded when it finishes.
    pub fn start_over(&mut self) {
        self.history.clear();
        self.pose_index = 0;
        self.model_image = None;
        self.error = None;
        self.phase = Phase::Idle;
        self.wardrobe = self.default_wardrobe.clone();
        self.epoch += 1;
        tracing::debug!(epoch = self.epoch, "session started over");
    }

    // ── Internals ────────────────────────────────────────────────────

    fn enter_pending(&mut self, message: &str) {
        self.error = None;
        self.phase = Phase::Pending {
            message: message.to_string(),
        };
    }

    /// Leave the pending phase for a request issued in `epoch`. Results from
    /// before a reset are rejected without touching the fresh state.
    fn settle(&mut self, epoch: u64) -> Result<(), TryOnError> {
        if epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, "discarding stale generation");
            return Err(TryOnError::SessionReset);
        }
        self.phase = Phase::Idle;
        Ok(())
    }

    fn fail(&mut self, context: &str, source: GatewayError) -> TryOnError {
        tracing::warn!(error = %source, "{}", context);
        let err = TryOnError::gateway(context, source);
        self.error = Some(err.to_string());
        err
    }
}

fn skip<R>(reason: SkipReason) -> Start<R> {
    tracing::debug!(?reason, "intent skipped");
    Start::Settled(Transition::Skipped(reason))
}
