//! `CanvasItem` persistence, the `CanvasItemStore` port for `gurt-lms-sync`,
//! and the `ExamWindowSource` port for `gurt-study`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gurt_canvas_client::CanvasItemRow as CanvasClientItemRow;
use gurt_domain::{CanvasItem, DomainError, ItemType};
use gurt_lms_sync::CanvasItemStore;
use gurt_study::ports::ExamWindowSource;
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ItemRow {
    id: String,
    course_id: String,
    title: String,
    item_type: String,
    due_at: DateTime<Utc>,
    points_possible: f64,
}

fn parse_item_type(value: &str) -> ItemType {
    match value {
        "exam" => ItemType::Exam,
        "quiz" => ItemType::Quiz,
        _ => ItemType::Assignment,
    }
}

fn item_type_str(item_type: ItemType) -> &'static str {
    match item_type {
        ItemType::Assignment => "assignment",
        ItemType::Exam => "exam",
        ItemType::Quiz => "quiz",
    }
}

impl From<ItemRow> for CanvasItem {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            title: row.title,
            item_type: parse_item_type(&row.item_type),
            due_at: row.due_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            points_possible: row.points_possible,
        }
    }
}

#[derive(Clone)]
pub struct CanvasItemRepository {
    pool: PgPool,
}

impl CanvasItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Vec<CanvasItem>, DomainError> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, course_id, title, item_type, due_at, points_possible
            FROM canvas_items
            WHERE user_id = $1 AND course_id = $2
            ORDER BY due_at, id
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CanvasItem::from).collect())
    }
}

#[async_trait]
impl CanvasItemStore for CanvasItemRepository {
    async fn upsert(&self, user_id: &str, item: &CanvasClientItemRow) -> Result<(), DomainError> {
        let due_at = DateTime::parse_from_rfc3339(&item.due_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| DomainError::Validation(format!("dueAt: {err}")))?;
        sqlx::query(
            r#"
            INSERT INTO canvas_items (user_id, id, course_id, title, item_type, due_at, points_possible)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, id) DO UPDATE SET
                course_id = EXCLUDED.course_id,
                title = EXCLUDED.title,
                item_type = EXCLUDED.item_type,
                due_at = EXCLUDED.due_at,
                points_possible = EXCLUDED.points_possible
            "#,
        )
        .bind(user_id)
        .bind(&item.id)
        .bind(&item.course_id)
        .bind(&item.title)
        .bind(&item.item_type)
        .bind(due_at)
        .bind(item.points_possible)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// `ExamWindowSource` is scoped to one user's view of a course, so callers
/// construct this wrapper with the resolved `user_id` already bound.
pub struct UserScopedExamWindowSource<'a> {
    pub repo: &'a CanvasItemRepository,
    pub user_id: String,
}

#[async_trait]
impl ExamWindowSource for UserScopedExamWindowSource<'_> {
    async fn exam_due_dates(&self, course_id: &str) -> Result<Vec<(String, DateTime<Utc>)>, DomainError> {
        let rows = sqlx::query_as::<_, (String, DateTime<Utc>)>(
            r#"
            SELECT id, due_at FROM canvas_items
            WHERE user_id = $1 AND course_id = $2 AND item_type = 'exam'
            ORDER BY due_at, id
            "#,
        )
        .bind(&self.user_id)
        .bind(course_id)
        .fetch_all(&self.repo.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::unreachable_pool;

    #[test]
    fn item_type_round_trips_through_storage_strings() {
        for item_type in [ItemType::Assignment, ItemType::Exam, ItemType::Quiz] {
            assert_eq!(parse_item_type(item_type_str(item_type)), item_type);
        }
    }

    #[tokio::test]
    async fn repository_methods_return_database_errors_without_a_live_connection() {
        let repo = CanvasItemRepository::new(unreachable_pool());
        assert!(matches!(
            repo.list_for_course("u1", "c1").await,
            Err(DomainError::Database(_))
        ));
        let item = CanvasClientItemRow {
            id: "i1".to_string(),
            course_id: "c1".to_string(),
            title: "HW1".to_string(),
            item_type: "assignment".to_string(),
            due_at: "2026-09-01T10:00:00Z".to_string(),
            points_possible: 10.0,
        };
        assert!(matches!(repo.upsert("u1", &item).await, Err(DomainError::Database(_))));
    }
}
