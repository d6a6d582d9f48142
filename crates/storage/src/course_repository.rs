//! `Course` persistence and the `CourseStore` port for `gurt-lms-sync`.

use async_trait::async_trait;
use gurt_canvas_client::CourseRow as CanvasCourseRow;
use gurt_domain::{Course, DomainError};
use gurt_lms_sync::CourseStore;
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
struct CourseRow {
    id: String,
    name: String,
    term: String,
    color: String,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            term: row.term,
            color: row.color,
        }
    }
}

#[derive(Clone)]
pub struct CourseRepository {
    pool: PgPool,
}

impl CourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Course>, DomainError> {
        let rows = sqlx::query_as::<_, CourseRow>(
            "SELECT id, name, term, color FROM courses WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Course::from).collect())
    }

    pub async fn get(&self, user_id: &str, course_id: &str) -> Result<Option<Course>, DomainError> {
        let row = sqlx::query_as::<_, CourseRow>(
            "SELECT id, name, term, color FROM courses WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Course::from))
    }
}

#[async_trait]
impl CourseStore for CourseRepository {
    async fn upsert(&self, user_id: &str, course: &CanvasCourseRow) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO courses (user_id, id, name, term, color)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, id) DO UPDATE SET
                name = EXCLUDED.name,
                term = EXCLUDED.term,
                color = EXCLUDED.color
            "#,
        )
        .bind(user_id)
        .bind(&course.id)
        .bind(&course.name)
        .bind(&course.term)
        .bind(&course.color)
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
        let repo = CourseRepository::new(unreachable_pool());
        assert!(matches!(repo.list_for_user("u1").await, Err(DomainError::Database(_))));
        assert!(matches!(repo.get("u1", "c1").await, Err(DomainError::Database(_))));
        let course = CanvasCourseRow {
            id: "c1".to_string(),
            name: "n".to_string(),
            term: "t".to_string(),
            color: "#000000".to_string(),
        };
        assert!(matches!(repo.upsert("u1", &course).await, Err(DomainError::Database(_))));
    }
}
