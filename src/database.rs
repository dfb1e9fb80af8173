use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::{FeedbackError, Result};
use crate::feedback::{submission_time, FeedbackRecord, NewFeedback, Rating, Subject};
use crate::storage::FeedbackStore;

const INSERT_FEEDBACK: &str = r#"
    INSERT INTO feedback (student_name, subject, rating, comments, date_submitted)
    VALUES (?, ?, ?, ?, ?)
"#;

const SELECT_FEEDBACK: &str = r#"
    SELECT id, student_name, subject, rating, comments, date_submitted
    FROM feedback
    ORDER BY date_submitted DESC, id DESC
"#;

#[derive(Debug, FromRow)]
struct FeedbackRow {
    id: i64,
    student_name: Option<String>,
    subject: String,
    rating: i64,
    comments: Option<String>,
    date_submitted: Option<DateTime<Utc>>,
}

impl TryFrom<FeedbackRow> for FeedbackRecord {
    type Error = FeedbackError;

    fn try_from(row: FeedbackRow) -> Result<Self> {
        let subject = Subject::from_str(&row.subject)
            .map_err(|e| FeedbackError::InvalidRecord(format!("row {}: {}", row.id, e)))?;
        let rating = Rating::try_from(row.rating)
            .map_err(|e| FeedbackError::InvalidRecord(format!("row {}: {}", row.id, e)))?;

        Ok(FeedbackRecord {
            id: row.id,
            student_name: row.student_name.unwrap_or_default(),
            subject,
            rating,
            comments: row.comments.unwrap_or_default(),
            submitted_at: row.date_submitted,
        })
    }
}

fn into_records(rows: Vec<FeedbackRow>) -> Result<Vec<FeedbackRecord>> {
    rows.into_iter().map(FeedbackRecord::try_from).collect()
}

/// The `feedback` table in a SQLite database.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // An in-memory database lives and dies with its connection.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_name TEXT,
                subject TEXT NOT NULL,
                rating INTEGER NOT NULL,
                comments TEXT,
                date_submitted DATETIME NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(SqliteStore { pool })
    }
}

#[async_trait]
impl FeedbackStore for SqliteStore {
    async fn insert(&self, feedback: NewFeedback) -> Result<FeedbackRecord> {
        let submitted_at = submission_time();

        let id = sqlx::query(INSERT_FEEDBACK)
            .bind(&feedback.student_name)
            .bind(feedback.subject.as_str())
            .bind(i64::from(feedback.rating.value()))
            .bind(&feedback.comments)
            .bind(submitted_at)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        debug!(id, "Inserted feedback row");
        Ok(feedback.into_record(id, Some(submitted_at)))
    }

    async fn fetch_all(&self) -> Result<Vec<FeedbackRecord>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(SELECT_FEEDBACK)
            .fetch_all(&self.pool)
            .await?;

        into_records(rows)
    }
}

/// The `feedback` table on a MySQL server.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feedback (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                student_name VARCHAR(255),
                subject VARCHAR(64) NOT NULL,
                rating BIGINT NOT NULL,
                comments TEXT,
                date_submitted TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(MySqlStore { pool })
    }
}

#[async_trait]
impl FeedbackStore for MySqlStore {
    async fn insert(&self, feedback: NewFeedback) -> Result<FeedbackRecord> {
        let submitted_at = submission_time();

        let result = sqlx::query(INSERT_FEEDBACK)
            .bind(&feedback.student_name)
            .bind(feedback.subject.as_str())
            .bind(i64::from(feedback.rating.value()))
            .bind(&feedback.comments)
            .bind(submitted_at)
            .execute(&self.pool)
            .await?;

        let id = i64::try_from(result.last_insert_id())
            .map_err(|_| FeedbackError::InvalidRecord("insert id overflows i64".to_string()))?;

        debug!(id, "Inserted feedback row");
        Ok(feedback.into_record(id, Some(submitted_at)))
    }

    async fn fetch_all(&self) -> Result<Vec<FeedbackRecord>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(SELECT_FEEDBACK)
            .fetch_all(&self.pool)
            .await?;

        into_records(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    fn feedback(subject: Subject, rating: u8, comments: &str) -> NewFeedback {
        NewFeedback {
            student_name: "Ada".to_string(),
            subject,
            rating: Rating::new(rating).unwrap(),
            comments: comments.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let store = memory_store().await;

        let record = store
            .insert(feedback(Subject::Physics, 4, "Good demos"))
            .await
            .unwrap();

        assert_eq!(record.id, 1);
        assert!(record.submitted_at.is_some());
        assert_eq!(record.comments, "Good demos");
    }

    #[tokio::test]
    async fn fetch_all_returns_newest_first() {
        let store = memory_store().await;
        let first = store.insert(feedback(Subject::Physics, 5, "first")).await.unwrap();
        let second = store.insert(feedback(Subject::English, 2, "second")).await.unwrap();

        let records = store.fetch_all().await.unwrap();
        assert_eq!(records, vec![second, first]);
    }

    #[tokio::test]
    async fn stored_rows_must_hold_valid_ratings() {
        let store = memory_store().await;
        sqlx::query(
            "INSERT INTO feedback (student_name, subject, rating, comments, date_submitted) \
             VALUES ('x', 'Physics', 11, 'bad', '2024-01-01T00:00:00+00:00')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.fetch_all().await.unwrap_err();
        assert!(matches!(err, FeedbackError::InvalidRecord(_)));
    }
}
