//! Async driver pairing a [`Session`] with a [`GenerationGateway`].
//!
//! The session lock is only held for the synchronous `begin_*`/`finish_*`
//! halves of an intent, never across the gateway call, so a second intent
//! issued while a generation runs observes the pending phase and is dropped
//! instead of waiting.
//!
//! Once `begin_*` has marked the session pending, the gateway call and its
//! `finish_*` continuation run together on a spawned task. Dropping the
//! caller's future only stops the wait; the session still settles.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::TryOnError;
use crate::gateway::GenerationGateway;
use crate::image::{ImageRef, InlineImage};
use crate::navigation::PoseDirection;
use crate::session::{PoseRequest, Session, Start, Transition};
use crate::view::SessionView;
use crate::wardrobe::Garment;

pub struct Studio {
    gateway: Arc<dyn GenerationGateway>,
    session: Arc<Mutex<Session>>,
}

impl Studio {
    pub fn new(gateway: Arc<dyn GenerationGateway>, session: Session) -> Self {
        Studio {
            gateway,
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub async fn view(&self) -> SessionView {
        SessionView::of(&*self.session.lock().await)
    }

    /// Run `f` against the session under the lock.
    pub async fn inspect<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&*self.session.lock().await)
    }

    /// Generate a model photo from an upload. `None` when another generation
    /// is in flight. The result still has to be finalized.
    pub async fn create_model(&self, photo: InlineImage) -> Result<Option<ImageRef>, TryOnError> {
        let request = match self.session.lock().await.begin_create_model(photo) {
            Start::Generate(request) => request,
            Start::Settled(_) => return Ok(None),
        };
        tracing::info!(mime = request.photo.mime_type(), bytes = request.photo.data().len(), "creating base model");
        let gateway = Arc::clone(&self.gateway);
        let session = Arc::clone(&self.session);
        detached(async move {
            let result = gateway.create_base_model(&request.photo).await;
            session.lock().await.finish_create_model(request, result)
        })
        .await?
        .map(Some)
    }

    pub async fn finalize_model(&self, image: ImageRef) -> Transition {
        self.session.lock().await.finalize_base_model(image)
    }

    pub async fn apply_garment(&self, garment: Garment) -> Result<Transition, TryOnError> {
        let request = match self.session.lock().await.begin_apply_garment(garment) {
            Start::Generate(request) => request,
            Start::Settled(transition) => return Ok(transition),
        };
        tracing::info!(garment = %request.garment.id, "applying garment");
        let gateway = Arc::clone(&self.gateway);
        let session = Arc::clone(&self.session);
        detached(async move {
            let result = gateway
                .apply_garment_to_image(&request.base_image, &request.garment.image)
                .await;
            session.lock().await.finish_apply_garment(request, result)
        })
        .await?
    }

    /// Apply a garment picked from the session's wardrobe by id.
    pub async fn apply_wardrobe_item(&self, id: &str) -> Result<Transition, TryOnError> {
        let garment = self
            .session
            .lock()
            .await
            .wardrobe()
            .get(id)
            .cloned()
            .ok_or_else(|| TryOnError::UnknownGarment(id.to_string()))?;
        self.apply_garment(garment).await
    }

    pub async fn remove_last_garment(&self) -> Transition {
        self.session.lock().await.remove_last_garment()
    }

    pub async fn select_pose(&self, index: usize) -> Result<Transition, TryOnError> {
        let start = self.session.lock().await.begin_select_pose(index)?;
        self.run_pose(start).await
    }

    pub async fn step_pose(&self, direction: PoseDirection) -> Result<Transition, TryOnError> {
        let start = self.session.lock().await.begin_step_pose(direction)?;
        self.run_pose(start).await
    }

    pub async fn start_over(&self) {
        self.session.lock().await.start_over();
    }

    async fn run_pose(&self, start: Start<PoseRequest>) -> Result<Transition, TryOnError> {
        let request = match start {
            Start::Generate(request) => request,
            Start::Settled(transition) => return Ok(transition),
        };
        tracing::info!(pose = %request.pose_instruction, "rendering pose");
        let gateway = Arc::clone(&self.gateway);
        let session = Arc::clone(&self.session);
        detached(async move {
            let result = gateway
                .render_pose(&request.base_image, &request.pose_instruction)
                .await;
            session.lock().await.finish_select_pose(request, result)
        })
        .await?
    }
}

/// Run `task` to completion on the runtime whether or not the caller keeps
/// waiting. A panic inside the task resumes in the caller.
async fn detached<T>(task: impl Future<Output = T> + Send + 'static) -> Result<T, TryOnError>
where
    T: Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(value) => Ok(value),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            tracing::warn!(error = %e, "generation task did not finish");
            Err(TryOnError::Interrupted)
        }
    }
}
