use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use secrets::LookupDigest;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::session::errors::SessionError;
use crate::session::models::Session;
use crate::session::ports::SessionRepository;
use crate::user::models::UserId;

pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn session_from_row(row: &PgRow) -> Result<Session, SessionError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;
    let user_id: Uuid = row
        .try_get("user_id")
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;
    let expires_at: DateTime<Utc> = row
        .try_get("expires_at")
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;
    let idle_at: DateTime<Utc> = row
        .try_get("idle_at")
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;
    let refresh_digest: Option<String> = row
        .try_get("refresh_digest")
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

    Ok(Session {
        id,
        user_id: UserId(user_id),
        expires_at,
        idle_at,
        refresh_digest: refresh_digest.map(LookupDigest::from_stored),
        created_at,
    })
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn create(&self, session: Session) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, expires_at, idle_at, refresh_digest, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id.0)
        .bind(session.expires_at)
        .bind(session.idle_at)
        .bind(
            session
                .refresh_digest
                .as_ref()
                .map(|d| d.as_str().to_string()),
        )
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, expires_at, idle_at, refresh_digest, created_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn update_idle(
        &self,
        session_id: &str,
        idle_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        // GREATEST keeps the write monotonic under concurrent slides.
        sqlx::query("UPDATE sessions SET idle_at = GREATEST(idle_at, $2) WHERE id = $1")
            .bind(session_id)
            .bind(idle_at)
            .execute(&self.pool)
            .await
            .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
