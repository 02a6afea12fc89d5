//! HTTP route handlers: catalog, sessions and session intents.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use atelier_core::view::PoseView;
use atelier_core::{
    Garment, ImageRef, InlineImage, PoseDirection, SkipReason, Studio, Transition, TryOnError,
};

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.sessions.read().await.len();
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": sessions,
        "max_sessions": state.max_sessions,
    });
    (StatusCode::OK, Json(response))
}

/// GET /poses
pub(crate) async fn handle_poses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let poses: Vec<PoseView> = state
        .catalog
        .iter()
        .enumerate()
        .map(|(index, instruction)| PoseView {
            index,
            instruction: instruction.to_string(),
        })
        .collect();
    (StatusCode::OK, Json(serde_json::json!({ "poses": poses })))
}

/// GET /wardrobe
pub(crate) async fn handle_wardrobe(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let wardrobe: Vec<&Garment> = state.wardrobe.iter().collect();
    (StatusCode::OK, Json(serde_json::json!({ "wardrobe": wardrobe })))
}

// ──────────────────────────────────────────────
// Sessions
// ──────────────────────────────────────────────

/// POST /sessions
pub(crate) async fn handle_create_session(State(state): State<Arc<AppState>>) -> Response {
    match state.create_session().await {
        Ok((id, studio)) => {
            let response = serde_json::json!({
                "id": id,
                "session": studio.view().await,
            });
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => json_error(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()).into_response(),
    }
}

/// GET /sessions/{id}
pub(crate) async fn handle_get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let studio = match lookup(&state, &id).await {
        Ok(studio) => studio,
        Err(response) => return response,
    };
    let response = serde_json::json!({ "id": id, "session": studio.view().await });
    (StatusCode::OK, Json(response)).into_response()
}

/// DELETE /sessions/{id}
pub(crate) async fn handle_delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    if state.remove_session(&id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        session_not_found(&id)
    }
}

// ──────────────────────────────────────────────
// Model
// ──────────────────────────────────────────────

/// POST /sessions/{id}/model
pub(crate) async fn handle_create_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(parsed): Json<serde_json::Value>,
) -> Response {
    let studio = match lookup(&state, &id).await {
        Ok(studio) => studio,
        Err(response) => return response,
    };
    let photo = match parsed.get("photo").and_then(|v| v.as_str()) {
        Some(photo) => photo,
        None => return json_error(StatusCode::BAD_REQUEST, "missing 'photo' field").into_response(),
    };
    let photo = match InlineImage::from_data_url(photo) {
        Ok(photo) => photo,
        Err(e) => return try_on_error(TryOnError::from(e)),
    };

    match studio.create_model(photo).await {
        Ok(Some(image)) => {
            let response = serde_json::json!({
                "image_url": image,
                "session": studio.view().await,
            });
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => transition_response(&studio, Transition::Skipped(SkipReason::Busy)).await,
        Err(e) => try_on_error(e),
    }
}

/// POST /sessions/{id}/model/finalize
pub(crate) async fn handle_finalize_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(parsed): Json<serde_json::Value>,
) -> Response {
    let studio = match lookup(&state, &id).await {
        Ok(studio) => studio,
        Err(response) => return response,
    };
    let image_url = match parsed.get("image_url").and_then(|v| v.as_str()) {
        Some(url) if !url.trim().is_empty() => url,
        _ => {
            return json_error(StatusCode::BAD_REQUEST, "missing 'image_url' field").into_response()
        }
    };
    let transition = studio.finalize_model(ImageRef::new(image_url)).await;
    transition_response(&studio, transition).await
}

// ──────────────────────────────────────────────
// Garments
// ──────────────────────────────────────────────

/// POST /sessions/{id}/garments
///
/// `{"id": ...}` picks a wardrobe item; `{"name": ..., "image_url": ...}`
/// applies a custom upload, which joins the wardrobe once it succeeds.
pub(crate) async fn handle_apply_garment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(parsed): Json<serde_json::Value>,
) -> Response {
    let studio = match lookup(&state, &id).await {
        Ok(studio) => studio,
        Err(response) => return response,
    };

    let result = if let Some(garment_id) = parsed.get("id").and_then(|v| v.as_str()) {
        studio.apply_wardrobe_item(garment_id).await
    } else {
        let name = parsed.get("name").and_then(|v| v.as_str());
        let image_url = parsed.get("image_url").and_then(|v| v.as_str());
        let (name, image_url) = match (name, image_url) {
            (Some(name), Some(url)) if !name.trim().is_empty() => (name, url),
            _ => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    "expected 'id', or 'name' and 'image_url'",
                )
                .into_response()
            }
        };
        let image = match custom_garment_image(image_url) {
            Ok(image) => image,
            Err(e) => return try_on_error(e),
        };
        studio.apply_garment(Garment::custom(name, image)).await
    };

    match result {
        Ok(transition) => transition_response(&studio, transition).await,
        Err(e) => try_on_error(e),
    }
}

/// Uploaded garments arrive inline and must decode to an image; remote URLs
/// are checked by the gateway when it downloads them.
fn custom_garment_image(image_url: &str) -> Result<ImageRef, TryOnError> {
    if image_url.starts_with("data:") {
        return Ok(InlineImage::from_data_url(image_url)?.to_image_ref());
    }
    Ok(ImageRef::new(image_url))
}

/// DELETE /sessions/{id}/garments/last
pub(crate) async fn handle_remove_garment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let studio = match lookup(&state, &id).await {
        Ok(studio) => studio,
        Err(response) => return response,
    };
    let transition = studio.remove_last_garment().await;
    transition_response(&studio, transition).await
}

// ──────────────────────────────────────────────
// Poses
// ──────────────────────────────────────────────

/// POST /sessions/{id}/pose
pub(crate) async fn handle_select_pose(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(parsed): Json<serde_json::Value>,
) -> Response {
    let studio = match lookup(&state, &id).await {
        Ok(studio) => studio,
        Err(response) => return response,
    };
    let index = match pose_index(&parsed) {
        Some(index) => index,
        None => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "missing or invalid 'index' field (expected a non-negative integer)",
            )
            .into_response()
        }
    };
    match studio.select_pose(index).await {
        Ok(transition) => transition_response(&studio, transition).await,
        Err(e) => try_on_error(e),
    }
}

/// The `index` field as a catalog position. Values that do not fit a
/// `usize` are rejected along with negatives and fractions.
fn pose_index(parsed: &serde_json::Value) -> Option<usize> {
    parsed
        .get("index")
        .and_then(|v| v.as_u64())
        .and_then(|index| usize::try_from(index).ok())
}

/// POST /sessions/{id}/pose/next
pub(crate) async fn handle_next_pose(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    step_pose(&state, &id, PoseDirection::Next).await
}

/// POST /sessions/{id}/pose/previous
pub(crate) async fn handle_previous_pose(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    step_pose(&state, &id, PoseDirection::Previous).await
}

async fn step_pose(state: &AppState, id: &str, direction: PoseDirection) -> Response {
    let studio = match lookup(state, id).await {
        Ok(studio) => studio,
        Err(response) => return response,
    };
    match studio.step_pose(direction).await {
        Ok(transition) => transition_response(&studio, transition).await,
        Err(e) => try_on_error(e),
    }
}

/// POST /sessions/{id}/reset
pub(crate) async fn handle_reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let studio = match lookup(&state, &id).await {
        Ok(studio) => studio,
        Err(response) => return response,
    };
    studio.start_over().await;
    let response = serde_json::json!({ "session": studio.view().await });
    (StatusCode::OK, Json(response)).into_response()
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

async fn lookup(state: &AppState, id: &str) -> Result<Arc<Studio>, Response> {
    state.session(id).await.ok_or_else(|| session_not_found(id))
}

fn session_not_found(id: &str) -> Response {
    json_error(StatusCode::NOT_FOUND, &format!("session '{}' not found", id)).into_response()
}

async fn transition_response(studio: &Studio, transition: Transition) -> Response {
    let response = serde_json::json!({
        "transition": transition,
        "session": studio.view().await,
    });
    (StatusCode::OK, Json(response)).into_response()
}

/// Map a try-on error to an HTTP status: bad input is the caller's fault,
/// gateway failures are upstream failures.
fn try_on_error(err: TryOnError) -> Response {
    let status = match &err {
        TryOnError::UnknownGarment(_) => StatusCode::NOT_FOUND,
        TryOnError::PoseOutOfRange { .. } | TryOnError::Image(_) => StatusCode::BAD_REQUEST,
        TryOnError::Gateway { .. } => StatusCode::BAD_GATEWAY,
        TryOnError::SessionReset => StatusCode::CONFLICT,
        TryOnError::Interrupted => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, &err.to_string()).into_response()
}
