//! `CalendarTokenRecord` persistence and the `CalendarTokenStore` port for
//! `gurt-calendar-tokens`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gurt_calendar_tokens::{CalendarTokenRecord, CalendarTokenStore};
use gurt_domain::DomainError;
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
struct TokenRow {
    token: String,
    user_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    revoked: bool,
    revoked_at: Option<DateTime<Utc>>,
}

impl TryFrom<TokenRow> for CalendarTokenRecord {
    type Error = DomainError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        CalendarTokenRecord::new(row.token, row.user_id, row.created_at, row.updated_at, row.revoked, row.revoked_at)
            .map_err(|err| DomainError::Internal(err.into()))
    }
}

#[derive(Clone)]
pub struct CalendarTokenRepository {
    pool: PgPool,
}

impl CalendarTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CalendarTokenStore for CalendarTokenRepository {
    type Error = DomainError;

    async fn save(&self, record: &CalendarTokenRecord) -> Result<(), Self::Error> {
        sqlx::query(
            r#"
            INSERT INTO calendar_tokens (token, user_id, created_at, updated_at, revoked, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (token) DO UPDATE SET
                updated_at = EXCLUDED.updated_at,
                revoked = EXCLUDED.revoked,
                revoked_at = EXCLUDED.revoked_at
            "#,
        )
        .bind(&record.token)
        .bind(&record.user_id)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.revoked)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await
        .map_err(DomainError::from)?;
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<CalendarTokenRecord>, Self::Error> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT token, user_id, created_at, updated_at, revoked, revoked_at FROM calendar_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::from)?;
        row.map(CalendarTokenRecord::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::unreachable_pool;

    #[tokio::test]
    async fn repository_methods_return_database_errors_without_a_live_connection() {
        let repo = CalendarTokenRepository::new(unreachable_pool());
        let record = CalendarTokenRecord::mint("tok1", "u1", Utc::now());
        assert!(matches!(repo.save(&record).await, Err(DomainError::Database(_))));
        assert!(matches!(repo.get("tok1").await, Err(DomainError::Database(_))));
    }
}
