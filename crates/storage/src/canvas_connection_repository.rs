//! `CanvasConnection` persistence and the `CanvasConnectionStore` port for
//! `gurt-lms-sync`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gurt_domain::{CanvasConnection, DomainError};
use gurt_lms_sync::CanvasConnectionStore;
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ConnectionRow {
    user_id: String,
    canvas_base_url: String,
    access_token: String,
    updated_at: DateTime<Utc>,
}

impl From<ConnectionRow> for CanvasConnection {
    fn from(row: ConnectionRow) -> Self {
        Self {
            user_id: row.user_id,
            canvas_base_url: row.canvas_base_url,
            access_token: row.access_token,
            updated_at: row.updated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

#[derive(Clone)]
pub struct CanvasConnectionRepository {
    pool: PgPool,
}

impl CanvasConnectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CanvasConnectionStore for CanvasConnectionRepository {
    async fn get(&self, user_id: &str) -> Result<Option<CanvasConnection>, DomainError> {
        let row = sqlx::query_as::<_, ConnectionRow>(
            "SELECT user_id, canvas_base_url, access_token, updated_at FROM canvas_connections WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CanvasConnection::from))
    }

    async fn upsert(&self, connection: &CanvasConnection) -> Result<(), DomainError> {
        let updated_at = DateTime::parse_from_rfc3339(&connection.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| DomainError::Validation(format!("updatedAt: {err}")))?;
        sqlx::query(
            r#"
            INSERT INTO canvas_connections (user_id, canvas_base_url, access_token, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                canvas_base_url = EXCLUDED.canvas_base_url,
                access_token = EXCLUDED.access_token,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&connection.user_id)
        .bind(&connection.canvas_base_url)
        .bind(&connection.access_token)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<CanvasConnection>, DomainError> {
        let rows = sqlx::query_as::<_, ConnectionRow>(
            "SELECT user_id, canvas_base_url, access_token, updated_at FROM canvas_connections ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CanvasConnection::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::unreachable_pool;

    #[tokio::test]
    async fn repository_methods_return_database_errors_without_a_live_connection() {
        let repo = CanvasConnectionRepository::new(unreachable_pool());
        assert!(matches!(repo.get("u1").await, Err(DomainError::Database(_))));
        assert!(matches!(repo.list_all().await, Err(DomainError::Database(_))));
        let connection = CanvasConnection {
            user_id: "u1".to_string(),
            canvas_base_url: "https://canvas.example".to_string(),
            access_token: "tok".to_string(),
            updated_at: "2026-09-01T10:00:00Z".to_string(),
        };
        assert!(matches!(repo.upsert(&connection).await, Err(DomainError::Database(_))));
    }
}
