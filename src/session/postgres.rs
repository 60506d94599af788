use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::{SessionData, SessionStore};

/// Sessions table in the same database as the watchlists.
#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Deletes every expired row. Runs after each write.
    pub async fn sweep_expired(&self) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<SessionData>> {
        let row: Option<(Json<SessionData>,)> = sqlx::query_as(
            r#"
            SELECT data
            FROM sessions
            WHERE id = $1 AND expires_at > now()
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|(Json(data),)| data))
    }

    async fn set(
        &self,
        id: Uuid,
        data: &SessionData,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, data, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET data = EXCLUDED.data, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(id)
        .bind(Json(data))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        let swept = self.sweep_expired().await?;
        if swept > 0 {
            debug!(swept, "expired sessions removed");
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
