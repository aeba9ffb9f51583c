// src/store/local.rs

//! On-device staging buffer for registrations and results that have not yet
//! been confirmed by the remote store.
//!
//! Backed by SQLite. Both record kinds are keyed by user identity, so putting
//! the same user or the same user's result twice overwrites the earlier entry.
//! A buffer opened with [`LocalBuffer::disabled`] has no storage at all: writes
//! are dropped and reads come back empty.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::models::{
    exam_result::{AnsweredQuestion, ExamResult},
    user::User,
};

/// Error type for buffer operations.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("local buffer database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("local buffer migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("buffered answers are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(FromRow)]
struct BufferedResult {
    user_id: String,
    score: f64,
    correct_count: i32,
    incorrect_count: i32,
    answers: String,
    created_at: DateTime<Utc>,
}

impl BufferedResult {
    fn into_result(self) -> Result<ExamResult, BufferError> {
        let answers: Vec<AnsweredQuestion> = serde_json::from_str(&self.answers)?;
        Ok(ExamResult {
            user_id: self.user_id,
            score: self.score,
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
            answers,
            created_at: self.created_at,
        })
    }
}

#[derive(Clone, Debug)]
pub struct LocalBuffer {
    pool: Option<SqlitePool>,
}

impl LocalBuffer {
    /// Opens (creating if missing) the SQLite buffer at `url` and applies its schema.
    pub async fn open(url: &str) -> Result<Self, BufferError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // One connection keeps writes serialized.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// Like [`LocalBuffer::open`], but an unusable location yields a
    /// [`LocalBuffer::disabled`] buffer instead of an error.
    pub async fn open_or_disabled(url: &str) -> Self {
        match Self::open(url).await {
            Ok(buffer) => {
                tracing::info!("Local buffer ready at {}", url);
                buffer
            }
            Err(e) => {
                tracing::warn!(
                    "Local buffer at {} unavailable, offline submissions will not be staged: {}",
                    url,
                    e
                );
                Self::disabled()
            }
        }
    }

    /// A private in-memory buffer. Contents vanish with the process.
    pub async fn in_memory() -> Result<Self, BufferError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    /// A buffer with no storage behind it.
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, BufferError> {
        sqlx::migrate!("./migrations/local").run(&pool).await?;
        Ok(Self { pool: Some(pool) })
    }

    pub fn is_durable(&self) -> bool {
        self.pool.is_some()
    }

    pub async fn put_user(&self, user: &User) -> Result<(), BufferError> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };

        sqlx::query(
            r#"
            INSERT INTO buffered_users (id, name, enrollment_id)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                enrollment_id = excluded.enrollment_id
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.enrollment_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn put_result(&self, result: &ExamResult) -> Result<(), BufferError> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };

        let answers = serde_json::to_string(&result.answers)?;

        sqlx::query(
            r#"
            INSERT INTO buffered_results
                (user_id, score, correct_count, incorrect_count, answers, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                score = excluded.score,
                correct_count = excluded.correct_count,
                incorrect_count = excluded.incorrect_count,
                answers = excluded.answers,
                created_at = excluded.created_at
            "#,
        )
        .bind(&result.user_id)
        .bind(result.score)
        .bind(result.correct_count)
        .bind(result.incorrect_count)
        .bind(answers)
        .bind(result.created_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>, BufferError> {
        let Some(pool) = &self.pool else {
            return Ok(Vec::new());
        };

        let users = sqlx::query_as::<_, User>("SELECT id, name, enrollment_id FROM buffered_users")
            .fetch_all(pool)
            .await?;

        Ok(users)
    }

    pub async fn list_results(&self) -> Result<Vec<ExamResult>, BufferError> {
        let Some(pool) = &self.pool else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query_as::<_, BufferedResult>(
            r#"
            SELECT user_id, score, correct_count, incorrect_count, answers, created_at
            FROM buffered_results
            "#,
        )
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(BufferedResult::into_result).collect()
    }

    /// Removes every buffered entry of both kinds.
    pub async fn clear(&self) -> Result<(), BufferError> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };

        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM buffered_users")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM buffered_results")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Removes exactly the given entries, as previously read from this buffer.
    ///
    /// A result is only removed if it still carries the same `created_at`, so
    /// a newer attempt written while the snapshot was in flight survives. A
    /// user is kept while any buffered result still references it.
    pub async fn remove_synced(
        &self,
        users: &[User],
        results: &[ExamResult],
    ) -> Result<(), BufferError> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };

        let mut tx = pool.begin().await?;
        for result in results {
            sqlx::query("DELETE FROM buffered_results WHERE user_id = ? AND created_at = ?")
                .bind(&result.user_id)
                .bind(result.created_at)
                .execute(&mut *tx)
                .await?;
        }
        for user in users {
            sqlx::query(
                r#"
                DELETE FROM buffered_users
                WHERE id = ?
                  AND NOT EXISTS (SELECT 1 FROM buffered_results WHERE user_id = ?)
                "#,
            )
            .bind(&user.id)
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn result_for(user: &User, score: f64) -> ExamResult {
        ExamResult {
            user_id: user.id.clone(),
            score,
            correct_count: (score / 10.0) as i32,
            incorrect_count: 10 - (score / 10.0) as i32,
            answers: vec![
                AnsweredQuestion {
                    question_id: 1,
                    answer: Some(0),
                },
                AnsweredQuestion {
                    question_id: 2,
                    answer: None,
                },
            ],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_put_overwrites_by_identity() {
        let buffer = LocalBuffer::in_memory().await.unwrap();
        let user = User::new("Grace Hopper", "A1906");

        buffer.put_user(&user).await.unwrap();
        buffer.put_user(&user).await.unwrap();
        buffer.put_result(&result_for(&user, 40.0)).await.unwrap();
        buffer.put_result(&result_for(&user, 70.0)).await.unwrap();

        let users = buffer.list_users().await.unwrap();
        let results = buffer.list_results().await.unwrap();
        assert_eq!(users, vec![user]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 70.0);
        assert_eq!(results[0].answers[1].answer, None);
    }

    #[tokio::test]
    async fn test_clear_removes_both_kinds() {
        let buffer = LocalBuffer::in_memory().await.unwrap();
        let user = User::new("Grace Hopper", "A1906");
        buffer.put_user(&user).await.unwrap();
        buffer.put_result(&result_for(&user, 50.0)).await.unwrap();

        buffer.clear().await.unwrap();

        assert!(buffer.list_users().await.unwrap().is_empty());
        assert!(buffer.list_results().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_synced_keeps_newer_attempts() {
        let buffer = LocalBuffer::in_memory().await.unwrap();
        let user = User::new("Grace Hopper", "A1906");
        let other = User::new("Alan Turing", "A1912");
        let first = result_for(&user, 30.0);
        buffer.put_user(&user).await.unwrap();
        buffer.put_result(&first).await.unwrap();

        let users = buffer.list_users().await.unwrap();
        let results = buffer.list_results().await.unwrap();

        // A retake and a new registration land while the snapshot is syncing.
        let mut retake = result_for(&user, 90.0);
        retake.created_at = first.created_at + Duration::seconds(5);
        buffer.put_result(&retake).await.unwrap();
        buffer.put_user(&other).await.unwrap();

        buffer.remove_synced(&users, &results).await.unwrap();

        // The retake still needs its user; the new registration is untouched.
        let users_left = buffer.list_users().await.unwrap();
        assert_eq!(users_left.len(), 2);
        assert!(users_left.contains(&user));
        assert!(users_left.contains(&other));
        let left = buffer.list_results().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].score, 90.0);
    }

    #[tokio::test]
    async fn test_disabled_buffer_is_a_no_op() {
        let buffer = LocalBuffer::disabled();
        let user = User::new("Grace Hopper", "A1906");

        assert!(!buffer.is_durable());
        buffer.put_user(&user).await.unwrap();
        buffer.put_result(&result_for(&user, 10.0)).await.unwrap();
        assert!(buffer.list_users().await.unwrap().is_empty());
        assert!(buffer.list_results().await.unwrap().is_empty());
        buffer.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_synced_keeps_user_with_newer_result() {
        let buffer = LocalBuffer::in_memory().await.unwrap();
        let user = User::new("Grace Hopper", "A1906");
        buffer.put_user(&user).await.unwrap();

        // Snapshot holds the registration only.
        let users = buffer.list_users().await.unwrap();
        let results = buffer.list_results().await.unwrap();
        assert!(results.is_empty());

        // The exam is submitted while the snapshot is syncing.
        buffer.put_result(&result_for(&user, 80.0)).await.unwrap();

        buffer.remove_synced(&users, &results).await.unwrap();

        assert_eq!(buffer.list_users().await.unwrap(), vec![user]);
        assert_eq!(buffer.list_results().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unopenable_location_falls_back_to_disabled() {
        let buffer =
            LocalBuffer::open_or_disabled("sqlite:///nonexistent_dir/nested/buffer.db").await;

        assert!(!buffer.is_durable());
        buffer
            .put_user(&User::new("Grace Hopper", "A1906"))
            .await
            .unwrap();
        assert!(buffer.list_users().await.unwrap().is_empty());
    }
}
