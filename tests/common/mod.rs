// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use exam_portal::{
    config::Config,
    models::{
        exam_result::{AnsweredQuestion, ExamResult, ResultRow, ResultUpdate},
        user::User,
    },
    store::{RemoteError, RemoteStore},
};
use tokio::sync::Notify;

/// Lets a test hold an upsert open until it says so.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// In-memory stand-in for the hosted results table.
#[derive(Default)]
pub struct MemoryRemoteStore {
    rows: Mutex<HashMap<String, ResultRow>>,
    failing: AtomicBool,
    calls: AtomicUsize,
    upserts: AtomicUsize,
    gate: Mutex<Option<Arc<Gate>>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Total number of trait calls made against the store.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn gate_upserts(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn rows(&self) -> Vec<ResultRow> {
        let mut rows: Vec<_> = self.rows.lock().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    pub fn insert_row(&self, row: ResultRow) {
        self.rows.lock().unwrap().insert(row.user_id.clone(), row);
    }

    fn enter(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn ping(&self) -> Result<(), RemoteError> {
        self.enter()
    }

    async fn upsert_results(&self, rows: &[ResultRow]) -> Result<(), RemoteError> {
        self.enter()?;
        self.upserts.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let mut stored = self.rows.lock().unwrap();
        for row in rows {
            stored.insert(row.user_id.clone(), row.clone());
        }
        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<ResultRow>, RemoteError> {
        self.enter()?;
        Ok(self.rows.lock().unwrap().get(user_id).cloned())
    }

    async fn exists_for_enrollment(&self, enrollment_id: &str) -> Result<bool, RemoteError> {
        self.enter()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .any(|row| row.enrollment_id == enrollment_id))
    }

    async fn search_by_enrollment(&self, text: &str) -> Result<Vec<ResultRow>, RemoteError> {
        self.enter()?;
        let needle = text.to_lowercase();
        Ok(self
            .rows()
            .into_iter()
            .filter(|row| row.enrollment_id.to_lowercase().contains(&needle))
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ResultRow>, RemoteError> {
        self.enter()?;
        Ok(self.rows())
    }

    async fn update(&self, user_id: &str, changes: &ResultUpdate) -> Result<(), RemoteError> {
        self.enter()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(user_id)
            .ok_or_else(|| RemoteError::NotFound(user_id.to_string()))?;
        if let Some(name) = &changes.name {
            row.name = name.clone();
        }
        if let Some(enrollment_id) = &changes.enrollment_id {
            row.enrollment_id = enrollment_id.clone();
        }
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<(), RemoteError> {
        self.enter()?;
        self.rows
            .lock()
            .unwrap()
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(user_id.to_string()))
    }
}

/// A result with `correct` of ten questions answered correctly.
pub fn result_for(user: &User, correct: i32) -> ExamResult {
    ExamResult {
        user_id: user.id.clone(),
        score: 100.0 * correct as f64 / 10.0,
        correct_count: correct,
        incorrect_count: 10 - correct,
        answers: (1..=10)
            .map(|question_id| AnsweredQuestion {
                question_id,
                answer: Some(0),
            })
            .collect(),
        created_at: Utc::now(),
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some("test_secret_for_integration_tests".to_string()),
        "JWT_EXPIRATION" => Some("600".to_string()),
        "LOCAL_BUFFER_URL" => Some("none".to_string()),
        "ADMIN_USERNAME" => Some("proctor".to_string()),
        "ADMIN_PASSWORD" => Some("proctor-password".to_string()),
        "RUST_LOG" => Some("error".to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}
