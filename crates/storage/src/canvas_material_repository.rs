//! `CanvasMaterial` persistence and the `CanvasMaterialStore` port for
//! `gurt-lms-sync`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gurt_domain::{CanvasMaterial, DomainError};
use gurt_lms_sync::CanvasMaterialStore;
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
struct MaterialRow {
    canvas_file_id: String,
    course_id: String,
    display_name: String,
    content_type: String,
    size_bytes: i64,
    updated_at: DateTime<Utc>,
    download_url: String,
    s3_key: String,
}

impl From<MaterialRow> for CanvasMaterial {
    fn from(row: MaterialRow) -> Self {
        Self {
            canvas_file_id: row.canvas_file_id,
            course_id: row.course_id,
            display_name: row.display_name,
            content_type: row.content_type,
            size_bytes: row.size_bytes,
            updated_at: row.updated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            download_url: row.download_url,
            s3_key: row.s3_key,
        }
    }
}

#[derive(Clone)]
pub struct CanvasMaterialRepository {
    pool: PgPool,
}

impl CanvasMaterialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Vec<CanvasMaterial>, DomainError> {
        let rows = sqlx::query_as::<_, MaterialRow>(
            r#"
            SELECT canvas_file_id, course_id, display_name, content_type, size_bytes,
                   updated_at, download_url, s3_key
            FROM canvas_materials
            WHERE user_id = $1 AND course_id = $2
            ORDER BY display_name
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CanvasMaterial::from).collect())
    }
}

#[async_trait]
impl CanvasMaterialStore for CanvasMaterialRepository {
    async fn upsert(&self, user_id: &str, material: &CanvasMaterial) -> Result<(), DomainError> {
        let updated_at = DateTime::parse_from_rfc3339(&material.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| DomainError::Validation(format!("updatedAt: {err}")))?;
        sqlx::query(
            r#"
            INSERT INTO canvas_materials
                (user_id, canvas_file_id, course_id, display_name, content_type,
                 size_bytes, updated_at, download_url, s3_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, canvas_file_id) DO UPDATE SET
                course_id = EXCLUDED.course_id,
                display_name = EXCLUDED.display_name,
                content_type = EXCLUDED.content_type,
                size_bytes = EXCLUDED.size_bytes,
                updated_at = EXCLUDED.updated_at,
                download_url = EXCLUDED.download_url,
                s3_key = EXCLUDED.s3_key
            "#,
        )
        .bind(user_id)
        .bind(&material.canvas_file_id)
        .bind(&material.course_id)
        .bind(&material.display_name)
        .bind(&material.content_type)
        .bind(material.size_bytes)
        .bind(updated_at)
        .bind(&material.download_url)
        .bind(&material.s3_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::unreachable_pool;

    #[tokio::test]
    async fn repository_methods_return_database_errors_without_a_live_connection() {
        let repo = CanvasMaterialRepository::new(unreachable_pool());
        assert!(matches!(
            repo.list_for_course("u1", "c1").await,
            Err(DomainError::Database(_))
        ));
        let material = CanvasMaterial {
            canvas_file_id: "f1".to_string(),
            course_id: "c1".to_string(),
            display_name: "notes.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 10,
            updated_at: "2026-09-01T10:00:00Z".to_string(),
            download_url: "https://canvas.example/f1".to_string(),
            s3_key: "uploads/canvas-materials/u1/c1/f1/notes.pdf".to_string(),
        };
        assert!(matches!(repo.upsert("u1", &material).await, Err(DomainError::Database(_))));
    }
}
