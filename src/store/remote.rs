// src/store/remote.rs

//! The hosted `exam_results` table, addressed by unique `user_id`.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    PgPool, Postgres, QueryBuilder,
    postgres::PgPoolOptions,
    types::Json,
};
use tokio::sync::OnceCell;

use crate::models::exam_result::{ResultRow, ResultUpdate};

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// No remote endpoint was configured; callers should stay local-only.
    #[error("remote store is not configured")]
    NotConfigured,

    #[error("no result stored for user {0}")]
    NotFound(String),

    #[error("remote store error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("remote schema migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Operations the service needs from the remote results store.
///
/// Every method must return [`RemoteError::NotConfigured`] instead of
/// panicking when no endpoint is available.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Cheap reachability check used by the connectivity probe.
    async fn ping(&self) -> Result<(), RemoteError>;

    /// Inserts or replaces every row keyed on `user_id`, as a single unit.
    async fn upsert_results(&self, rows: &[ResultRow]) -> Result<(), RemoteError>;

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<ResultRow>, RemoteError>;

    /// True if any stored result carries exactly this enrollment id.
    async fn exists_for_enrollment(&self, enrollment_id: &str) -> Result<bool, RemoteError>;

    /// Case-insensitive substring match on enrollment id, newest first.
    async fn search_by_enrollment(&self, text: &str) -> Result<Vec<ResultRow>, RemoteError>;

    /// All rows, newest first.
    async fn list_all(&self) -> Result<Vec<ResultRow>, RemoteError>;

    async fn update(&self, user_id: &str, changes: &ResultUpdate) -> Result<(), RemoteError>;

    async fn delete(&self, user_id: &str) -> Result<(), RemoteError>;
}

const SELECT_ROW: &str = r#"
    SELECT user_id, name, enrollment_id, score, correct_answers,
           incorrect_answers, answers, created_at
    FROM exam_results
"#;

/// PostgreSQL implementation of [`RemoteStore`].
///
/// The pool connects lazily so the service can start while the remote is
/// unreachable. The schema is migrated on the first successful round trip.
pub struct PgRemoteStore {
    pool: Option<PgPool>,
    schema: OnceCell<()>,
}

impl PgRemoteStore {
    pub fn unconfigured() -> Self {
        Self {
            pool: None,
            schema: OnceCell::new(),
        }
    }

    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Some(pool),
            schema: OnceCell::new(),
        }
    }

    /// Builds a lazily-connecting pool. Fails only on a malformed URL.
    pub fn connect_lazy(database_url: &str) -> Result<Self, RemoteError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_lazy(database_url)?;

        Ok(Self::new(pool))
    }

    async fn ready(&self) -> Result<&PgPool, RemoteError> {
        let pool = self.pool.as_ref().ok_or(RemoteError::NotConfigured)?;

        self.schema
            .get_or_try_init(|| async {
                sqlx::migrate!("./migrations/remote").run(pool).await?;
                tracing::info!("Remote schema is up to date");
                Ok::<(), RemoteError>(())
            })
            .await?;

        Ok(pool)
    }
}

/// Escapes LIKE wildcards so user input only ever matches literally.
fn contains_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Postgres accepts at most this many bind parameters per statement.
const PG_MAX_BIND_PARAMS: usize = u16::MAX as usize;
const BINDS_PER_ROW: usize = 8;
/// Rows per `INSERT` so a statement stays within [`PG_MAX_BIND_PARAMS`].
const UPSERT_CHUNK_ROWS: usize = PG_MAX_BIND_PARAMS / BINDS_PER_ROW;

fn upsert_statement(rows: &[ResultRow]) -> QueryBuilder<'static, Postgres> {
    let mut query_builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO exam_results (user_id, name, enrollment_id, score, \
         correct_answers, incorrect_answers, answers, created_at) ",
    );

    query_builder.push_values(rows, |mut values, row| {
        values
            .push_bind(row.user_id.clone())
            .push_bind(row.name.clone())
            .push_bind(row.enrollment_id.clone())
            .push_bind(row.score)
            .push_bind(row.correct_answers)
            .push_bind(row.incorrect_answers)
            .push_bind(Json(row.answers.clone()))
            .push_bind(row.created_at);
    });

    query_builder.push(
        r#"
        ON CONFLICT (user_id) DO UPDATE SET
            name = EXCLUDED.name,
            enrollment_id = EXCLUDED.enrollment_id,
            score = EXCLUDED.score,
            correct_answers = EXCLUDED.correct_answers,
            incorrect_answers = EXCLUDED.incorrect_answers,
            answers = EXCLUDED.answers,
            created_at = EXCLUDED.created_at
        "#,
    );

    query_builder
}

#[async_trait]
impl RemoteStore for PgRemoteStore {
    async fn ping(&self) -> Result<(), RemoteError> {
        let pool = self.ready().await?;
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    async fn upsert_results(&self, rows: &[ResultRow]) -> Result<(), RemoteError> {
        let pool = self.ready().await?;
        if rows.is_empty() {
            return Ok(());
        }

        // One transaction around every chunk: the batch lands whole or not at all.
        let mut tx = pool.begin().await?;
        for chunk in rows.chunks(UPSERT_CHUNK_ROWS) {
            upsert_statement(chunk)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to upsert {} exam results: {:?}", rows.len(), e);
                    RemoteError::from(e)
                })?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<ResultRow>, RemoteError> {
        let pool = self.ready().await?;

        let row = sqlx::query_as::<_, ResultRow>(&format!("{} WHERE user_id = $1", SELECT_ROW))
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(row)
    }

    async fn exists_for_enrollment(&self, enrollment_id: &str) -> Result<bool, RemoteError> {
        let pool = self.ready().await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM exam_results WHERE enrollment_id = $1)",
        )
        .bind(enrollment_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    async fn search_by_enrollment(&self, text: &str) -> Result<Vec<ResultRow>, RemoteError> {
        let pool = self.ready().await?;

        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            "{} WHERE enrollment_id ILIKE $1 ORDER BY created_at DESC",
            SELECT_ROW
        ))
        .bind(contains_pattern(text))
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn list_all(&self) -> Result<Vec<ResultRow>, RemoteError> {
        let pool = self.ready().await?;

        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            "{} ORDER BY created_at DESC",
            SELECT_ROW
        ))
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn update(&self, user_id: &str, changes: &ResultUpdate) -> Result<(), RemoteError> {
        let pool = self.ready().await?;

        let updated = sqlx::query(
            r#"
            UPDATE exam_results SET
                name = COALESCE($2, name),
                enrollment_id = COALESCE($3, enrollment_id)
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(changes.name.as_deref())
        .bind(changes.enrollment_id.as_deref())
        .execute(pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(RemoteError::NotFound(user_id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<(), RemoteError> {
        let pool = self.ready().await?;

        let deleted = sqlx::query("DELETE FROM exam_results WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(RemoteError::NotFound(user_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exam_result::ExamResult;
    use chrono::Utc;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("A001"), "%A001%");
        assert_eq!(contains_pattern("50%_x"), "%50\\%\\_x%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_upsert_chunks_fit_the_bind_limit() {
        assert!(UPSERT_CHUNK_ROWS * BINDS_PER_ROW <= PG_MAX_BIND_PARAMS);
        assert_eq!(UPSERT_CHUNK_ROWS, 8191);

        let result = ExamResult {
            user_id: String::new(),
            score: 50.0,
            correct_count: 5,
            incorrect_count: 5,
            answers: vec![],
            created_at: Utc::now(),
        };
        let rows: Vec<ResultRow> = (0..UPSERT_CHUNK_ROWS + 1)
            .map(|i| {
                let mut row = ResultRow::with_identity("Ada", "A0001", &result);
                row.user_id = i.to_string();
                row
            })
            .collect();

        let sizes: Vec<usize> = rows.chunks(UPSERT_CHUNK_ROWS).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![UPSERT_CHUNK_ROWS, 1]);
        assert!(upsert_statement(&rows[..1]).sql().contains("ON CONFLICT (user_id)"));
    }

    #[tokio::test]
    async fn test_unconfigured_store_reports_not_configured() {
        let store = PgRemoteStore::unconfigured();

        assert!(matches!(store.ping().await, Err(RemoteError::NotConfigured)));
        assert!(matches!(
            store.upsert_results(&[]).await,
            Err(RemoteError::NotConfigured)
        ));
        assert!(matches!(
            store.find_by_user_id("u1").await,
            Err(RemoteError::NotConfigured)
        ));
        assert!(matches!(
            store.exists_for_enrollment("A0001").await,
            Err(RemoteError::NotConfigured)
        ));
        assert!(matches!(
            store.search_by_enrollment("A0").await,
            Err(RemoteError::NotConfigured)
        ));
        assert!(matches!(
            store.list_all().await,
            Err(RemoteError::NotConfigured)
        ));
        assert!(matches!(
            store.update("u1", &ResultUpdate::default()).await,
            Err(RemoteError::NotConfigured)
        ));
        assert!(matches!(
            store.delete("u1").await,
            Err(RemoteError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_malformed_url_is_rejected() {
        assert!(PgRemoteStore::connect_lazy("not a url").is_err());
    }
}
