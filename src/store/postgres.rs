use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, Runtime};
use log::{error, info};
use serde_json::Value;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use crate::config::DatabaseConfig;

use super::models::{InterviewRecord, User};
use super::{InterviewStore, Result, StoreError, UserStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS interviews (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL,
    questions JSONB NOT NULL,
    transcript JSONB,
    feedback JSONB,
    visual_analysis JSONB,
    final_score DOUBLE PRECISION
);

CREATE INDEX IF NOT EXISTS interviews_owner_created_idx
    ON interviews (owner_id, created_at DESC);
"#;

/// Postgres-backed store. Document-shaped fields (questions, transcript,
/// feedback, visual analysis) live in JSONB columns.
#[derive(Debug)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(
            "Connecting to database: {}@{}:{}/{}",
            config.user, config.host, config.port, config.dbname
        );

        let mut cfg = Config::new();
        cfg.url = Some(config.url());
        cfg.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::ConnectionFailed(format!("Pool creation failed: {e}")))?;

        // Test connection before accepting traffic.
        let _client = pool
            .get()
            .await
            .map_err(|e| StoreError::ConnectionFailed(format!("Connection test failed: {e}")))?;

        info!("Database connection established successfully");

        Ok(PgStore { pool })
    }

    /// Creates tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        client
            .batch_execute(SCHEMA)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Schema setup failed: {e}")))?;
        Ok(())
    }

    async fn client(&self) -> Result<deadpool_postgres::Client> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))
    }
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get(0),
        name: row.get(1),
        email: row.get(2),
        password_hash: row.get(3),
        created_at: row.get(4),
    }
}

fn interview_from_row(row: &Row) -> Result<InterviewRecord> {
    let questions: Value = row.get(3);
    let questions = serde_json::from_value(questions)
        .map_err(|e| StoreError::QueryFailed(format!("Malformed questions column: {e}")))?;
    let transcript = match row.get::<_, Option<Value>>(4) {
        Some(value) => Some(
            serde_json::from_value(value)
                .map_err(|e| StoreError::QueryFailed(format!("Malformed transcript column: {e}")))?,
        ),
        None => None,
    };
    Ok(InterviewRecord {
        id: row.get(0),
        owner_id: row.get(1),
        created_at: row.get(2),
        questions,
        transcript,
        feedback: row.get(5),
        visual_analysis: row.get(6),
        final_score: row.get(7),
    })
}

const INTERVIEW_COLUMNS: &str =
    "id, owner_id, created_at, questions, transcript, feedback, visual_analysis, final_score";

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        let client = self.client().await?;
        client
            .execute(
                r#"
                INSERT INTO users (id, name, email, password_hash, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
                &[&user.id, &user.name, &user.email, &user.password_hash, &user.created_at],
            )
            .await
            .map_err(|e| {
                error!("Failed to insert user {}: {}", user.email, e);
                StoreError::QueryFailed(format!("Failed to insert user: {e}"))
            })?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT id, name, email, password_hash, created_at FROM users WHERE lower(email) = lower($1)",
                &[&email],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to fetch user: {e}")))?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT id, name, email, password_hash, created_at FROM users WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to fetch user: {e}")))?;
        Ok(row.as_ref().map(user_from_row))
    }
}

#[async_trait]
impl InterviewStore for PgStore {
    async fn insert_interview(&self, record: InterviewRecord) -> Result<InterviewRecord> {
        let client = self.client().await?;
        let questions = serde_json::to_value(&record.questions)
            .map_err(|e| StoreError::QueryFailed(format!("Failed to encode questions: {e}")))?;
        client
            .execute(
                r#"
                INSERT INTO interviews (id, owner_id, created_at, questions)
                VALUES ($1, $2, $3, $4)
                "#,
                &[&record.id, &record.owner_id, &record.created_at, &questions],
            )
            .await
            .map_err(|e| {
                error!("Failed to insert interview {}: {}", record.id, e);
                StoreError::QueryFailed(format!("Failed to insert interview: {e}"))
            })?;
        info!("Created interview {} for user {}", record.id, record.owner_id);
        Ok(record)
    }

    async fn find_interview(&self, id: Uuid) -> Result<Option<InterviewRecord>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE id = $1"),
                &[&id],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to fetch interview: {e}")))?;
        row.as_ref().map(interview_from_row).transpose()
    }

    async fn list_interviews(&self, owner_id: Uuid, offset: u64, limit: u64) -> Result<Vec<InterviewRecord>> {
        let client = self.client().await?;
        let rows = client
            .query(
                &format!(
                    r#"
                    SELECT {INTERVIEW_COLUMNS} FROM interviews
                    WHERE owner_id = $1
                    ORDER BY created_at DESC
                    OFFSET $2 LIMIT $3
                    "#
                ),
                &[&owner_id, &(offset as i64), &(limit as i64)],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to list interviews: {e}")))?;
        rows.iter().map(interview_from_row).collect()
    }

    async fn count_interviews(&self, owner_id: Uuid) -> Result<u64> {
        let client = self.client().await?;
        let row = client
            .query_one("SELECT COUNT(*) FROM interviews WHERE owner_id = $1", &[&owner_id])
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to count interviews: {e}")))?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }

    async fn replace_interview(&self, record: InterviewRecord) -> Result<InterviewRecord> {
        let client = self.client().await?;
        let transcript = match &record.transcript {
            Some(entries) => Some(
                serde_json::to_value(entries)
                    .map_err(|e| StoreError::QueryFailed(format!("Failed to encode transcript: {e}")))?,
            ),
            None => None,
        };
        let rows_affected = client
            .execute(
                r#"
                UPDATE interviews
                SET transcript = $2,
                    feedback = $3,
                    visual_analysis = $4,
                    final_score = $5
                WHERE id = $1
                "#,
                &[
                    &record.id,
                    &transcript,
                    &record.feedback,
                    &record.visual_analysis,
                    &record.final_score,
                ],
            )
            .await
            .map_err(|e| {
                error!("Failed to update interview {}: {}", record.id, e);
                StoreError::QueryFailed(format!("Failed to update interview: {e}"))
            })?;
        if rows_affected == 0 {
            return Err(StoreError::QueryFailed(format!(
                "Interview {} vanished during update",
                record.id
            )));
        }
        Ok(record)
    }

    async fn delete_interview(&self, id: Uuid) -> Result<bool> {
        let client = self.client().await?;
        let rows_affected = client
            .execute("DELETE FROM interviews WHERE id = $1", &[&id])
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to delete interview: {e}")))?;
        Ok(rows_affected > 0)
    }
}
