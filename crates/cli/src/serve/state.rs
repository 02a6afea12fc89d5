//! Application state: live studio sessions keyed by id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use atelier_core::{GenerationGateway, PoseCatalog, Session, Studio, Wardrobe};

/// A live session and the last time a request reached it.
pub(crate) struct SessionSlot {
    studio: Arc<Studio>,
    last_used: OffsetDateTime,
}

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// Live sessions keyed by session id.
    pub(crate) sessions: RwLock<HashMap<String, SessionSlot>>,
    /// Gateway shared by every session.
    pub(crate) gateway: Arc<dyn GenerationGateway>,
    pub(crate) catalog: PoseCatalog,
    /// Wardrobe each new session starts with.
    pub(crate) wardrobe: Wardrobe,
    /// Upper bound on live sessions.
    pub(crate) max_sessions: usize,
    /// Sessions untouched for this long are dropped when room is needed.
    pub(crate) idle_ttl: Duration,
    next_id: AtomicU64,
}

/// The session table is full.
#[derive(Debug, thiserror::Error)]
#[error("session limit reached ({0} live sessions)")]
pub(crate) struct SessionLimit(pub(crate) usize);

impl AppState {
    pub(crate) fn new(
        gateway: Arc<dyn GenerationGateway>,
        catalog: PoseCatalog,
        wardrobe: Wardrobe,
        max_sessions: usize,
        idle_ttl: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            gateway,
            catalog,
            wardrobe,
            max_sessions,
            idle_ttl,
            next_id: AtomicU64::new(1),
        }
    }

    /// Open a fresh session with the configured catalog and wardrobe.
    ///
    /// A full table is first swept of idle sessions; the limit only applies
    /// to what remains.
    pub(crate) async fn create_session(&self) -> Result<(String, Arc<Studio>), SessionLimit> {
        let mut sessions = self.sessions.write().await;
        let now = OffsetDateTime::now_utc();
        if sessions.len() >= self.max_sessions {
            self.expire_idle(&mut sessions, now).await;
        }
        if sessions.len() >= self.max_sessions {
            return Err(SessionLimit(sessions.len()));
        }
        let id = self.session_id(now);
        let studio = Arc::new(Studio::new(
            self.gateway.clone(),
            Session::new(self.catalog.clone(), self.wardrobe.clone()),
        ));
        sessions.insert(
            id.clone(),
            SessionSlot {
                studio: studio.clone(),
                last_used: now,
            },
        );
        tracing::debug!(session = %id, live = sessions.len(), "session created");
        Ok((id, studio))
    }

    /// Look up a session and mark it as used.
    pub(crate) async fn session(&self, id: &str) -> Option<Arc<Studio>> {
        let mut sessions = self.sessions.write().await;
        let slot = sessions.get_mut(id)?;
        slot.last_used = OffsetDateTime::now_utc();
        Some(slot.studio.clone())
    }

    pub(crate) async fn remove_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(session = %id, "session closed");
        }
        removed
    }

    /// Drop sessions idle for at least `idle_ttl`. A session with a
    /// generation in flight is kept.
    async fn expire_idle(&self, sessions: &mut HashMap<String, SessionSlot>, now: OffsetDateTime) {
        let mut expired = Vec::new();
        for (id, slot) in sessions.iter() {
            if now - slot.last_used < self.idle_ttl {
                continue;
            }
            if !slot.studio.inspect(Session::is_pending).await {
                expired.push(id.clone());
            }
        }
        for id in expired {
            sessions.remove(&id);
            tracing::debug!(session = %id, "idle session expired");
        }
    }

    /// `<unix millis in hex>-<sequence>`.
    fn session_id(&self, now: OffsetDateTime) -> String {
        let millis = now.unix_timestamp_nanos() / 1_000_000;
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{:x}-{}", millis, seq)
    }
}
