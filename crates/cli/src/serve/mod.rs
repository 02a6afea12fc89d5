//! `atelier serve` -- HTTP JSON API over in-memory try-on sessions.
//!
//! Each session is a [`Studio`](atelier_core::Studio) driving the shared
//! Gemini gateway. CORS is permissive.
//!
//! Endpoints:
//! - GET    /health                          - Server status
//! - GET    /poses                           - Pose catalog
//! - GET    /wardrobe                        - Default wardrobe
//! - POST   /sessions                        - Open a session
//! - GET    /sessions/{id}                   - Session view
//! - DELETE /sessions/{id}                   - Close a session
//! - POST   /sessions/{id}/model             - Generate a model photo
//! - POST   /sessions/{id}/model/finalize    - Seed history with a model photo
//! - POST   /sessions/{id}/garments          - Apply a wardrobe or custom garment
//! - DELETE /sessions/{id}/garments/last     - Remove the last garment
//! - POST   /sessions/{id}/pose              - Select a pose by index
//! - POST   /sessions/{id}/pose/next         - Next pose
//! - POST   /sessions/{id}/pose/previous     - Previous generated pose
//! - POST   /sessions/{id}/reset             - Start over
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use atelier_core::{GenerationGateway, PoseCatalog, Wardrobe};
use atelier_gemini::GeminiGateway;

use self::handlers::{
    handle_apply_garment, handle_create_model, handle_create_session, handle_delete_session,
    handle_finalize_model, handle_get_session, handle_health, handle_next_pose, handle_not_found,
    handle_poses, handle_previous_pose, handle_remove_garment, handle_reset, handle_select_pose,
    handle_wardrobe,
};
use self::state::AppState;

/// Default cap on live sessions.
const DEFAULT_MAX_SESSIONS: usize = 64;

/// Default idle time after which a session may be reclaimed.
const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 60;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

pub(crate) struct ServeOptions {
    pub(crate) port: u16,
    pub(crate) max_body_bytes: usize,
    pub(crate) catalog: PoseCatalog,
    pub(crate) wardrobe: Wardrobe,
    pub(crate) tls_cert: Option<PathBuf>,
    pub(crate) tls_key: Option<PathBuf>,
}

/// `ATELIER_MAX_SESSIONS`, or the default when unset.
fn max_sessions_from_env() -> Result<usize, String> {
    match std::env::var("ATELIER_MAX_SESSIONS") {
        Ok(value) => match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!(
                "ATELIER_MAX_SESSIONS must be a positive integer (got '{}')",
                value
            )),
        },
        Err(_) => Ok(DEFAULT_MAX_SESSIONS),
    }
}

/// `ATELIER_SESSION_TTL_SECS`, or the default when unset.
fn session_ttl_from_env() -> Result<time::Duration, String> {
    match std::env::var("ATELIER_SESSION_TTL_SECS") {
        Ok(value) => match value.trim().parse::<i64>() {
            Ok(secs) if secs > 0 => Ok(time::Duration::seconds(secs)),
            _ => Err(format!(
                "ATELIER_SESSION_TTL_SECS must be a positive integer (got '{}')",
                value
            )),
        },
        Err(_) => Ok(time::Duration::seconds(DEFAULT_SESSION_TTL_SECS)),
    }
}

fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/poses", get(handle_poses))
        .route("/wardrobe", get(handle_wardrobe))
        .route("/sessions", post(handle_create_session))
        .route(
            "/sessions/{id}",
            get(handle_get_session).delete(handle_delete_session),
        )
        .route("/sessions/{id}/model", post(handle_create_model))
        .route("/sessions/{id}/model/finalize", post(handle_finalize_model))
        .route("/sessions/{id}/garments", post(handle_apply_garment))
        .route("/sessions/{id}/garments/last", delete(handle_remove_garment))
        .route("/sessions/{id}/pose", post(handle_select_pose))
        .route("/sessions/{id}/pose/next", post(handle_next_pose))
        .route("/sessions/{id}/pose/previous", post(handle_previous_pose))
        .route("/sessions/{id}/reset", post(handle_reset))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Start the HTTP server.
///
/// When TLS cert/key paths are provided and the `tls` feature is enabled,
/// the server listens over HTTPS using `axum-server` with rustls. Otherwise
/// it uses plain HTTP.
pub(crate) async fn start_server(options: ServeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = GeminiGateway::from_env()?;
    if gateway.config().api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; generation requests will fail");
    }
    tracing::info!(model = %gateway.config().model, "using Gemini gateway");
    let gateway: Arc<dyn GenerationGateway> = Arc::new(gateway);

    let max_sessions = max_sessions_from_env()?;
    let idle_ttl = session_ttl_from_env()?;
    let state = Arc::new(AppState::new(
        gateway,
        options.catalog,
        options.wardrobe,
        max_sessions,
        idle_ttl,
    ));
    tracing::debug!(idle_ttl_secs = idle_ttl.whole_seconds(), "session expiry configured");
    let app = router(state, options.max_body_bytes);

    let addr = format!("0.0.0.0:{}", options.port);

    // TLS support via axum-server + rustls (requires `tls` feature)
    #[cfg(feature = "tls")]
    if let (Some(cert_path), Some(key_path)) = (&options.tls_cert, &options.tls_key) {
        let config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
        let socket_addr: std::net::SocketAddr = addr.parse()?;
        tracing::info!(max_sessions, "atelier studio listening on https://{}", addr);
        axum_server::bind_rustls(socket_addr, config)
            .serve(app.into_make_service())
            .await?;
        return Ok(());
    }

    #[cfg(not(feature = "tls"))]
    if options.tls_cert.is_some() || options.tls_key.is_some() {
        tracing::warn!("built without the `tls` feature; serving plain HTTP");
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(max_sessions, "atelier studio listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("received shutdown signal");
}
