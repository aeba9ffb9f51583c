// src/exam/sessions.rs

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{config::SESSION_TTL, exam::session::ExamSession};

/// In-progress exam sessions keyed by a short-lived session id handed out at registration.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, ExamSession>>>,
}

impl SessionStore {
    /// Stores `session` under a fresh id, discarding sessions older than [`SESSION_TTL`].
    pub async fn insert(&self, session: ExamSession) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        let now = Utc::now();
        sessions.retain(|_, s| {
            (now - s.started_at())
                .to_std()
                .map(|age| age < SESSION_TTL)
                .unwrap_or(true)
        });
        if sessions.len() < before {
            tracing::debug!("Expired {} abandoned exam sessions", before - sessions.len());
        }

        sessions.insert(id, session);
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<ExamSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Runs `f` against the session, if it exists.
    pub async fn with_session<T>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut ExamSession) -> T,
    ) -> Option<T> {
        self.sessions.write().await.get_mut(id).map(f)
    }

    pub async fn remove(&self, id: &Uuid) -> Option<ExamSession> {
        self.sessions.write().await.remove(id)
    }
}
