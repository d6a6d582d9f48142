//! `Card` persistence and the `CardStore` port for `gurt-study`.

use async_trait::async_trait;
use gurt_domain::{Card, DomainError};
use gurt_fsrs::FsrsState;
use gurt_study::ports::{CardStore, StudyCardRow};
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
struct CardRow {
    id: String,
    course_id: String,
    topic_id: String,
    prompt: String,
    answer: String,
    citations: serde_json::Value,
    fsrs_state: Option<serde_json::Value>,
}

fn citations_from_json(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

fn fsrs_state_from_json(value: Option<serde_json::Value>) -> Option<FsrsState> {
    value.and_then(|v| serde_json::from_value(v).ok())
}

impl From<CardRow> for Card {
    fn from(row: CardRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            topic_id: row.topic_id,
            prompt: row.prompt,
            answer: row.answer,
            citations: citations_from_json(row.citations),
            fsrs_state: fsrs_state_from_json(row.fsrs_state),
        }
    }
}

impl From<CardRow> for StudyCardRow {
    fn from(row: CardRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            topic_id: row.topic_id,
            prompt: row.prompt,
            answer: row.answer,
            fsrs_state: fsrs_state_from_json(row.fsrs_state),
        }
    }
}

#[derive(Clone)]
pub struct CardRepository {
    pool: PgPool,
}

impl CardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, card: &Card) -> Result<(), DomainError> {
        let citations = serde_json::to_value(&card.citations).map_err(|err| DomainError::Internal(err.into()))?;
        let fsrs_state = card
            .fsrs_state
            .map(|s| serde_json::to_value(s).map_err(|err| DomainError::Internal(err.into())))
            .transpose()?;
        sqlx::query(
            r#"
            INSERT INTO cards (id, course_id, topic_id, prompt, answer, citations, fsrs_state)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                course_id = EXCLUDED.course_id,
                topic_id = EXCLUDED.topic_id,
                prompt = EXCLUDED.prompt,
                answer = EXCLUDED.answer,
                citations = EXCLUDED.citations,
                fsrs_state = EXCLUDED.fsrs_state
            "#,
        )
        .bind(&card.id)
        .bind(&card.course_id)
        .bind(&card.topic_id)
        .bind(&card.prompt)
        .bind(&card.answer)
        .bind(citations)
        .bind(fsrs_state)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

const SELECT_COLUMNS: &str =
    "id, course_id, topic_id, prompt, answer, citations, fsrs_state";

#[async_trait]
impl CardStore for CardRepository {
    async fn list_for_course(&self, course_id: &str) -> Result<Vec<StudyCardRow>, DomainError> {
        let rows = sqlx::query_as::<_, CardRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM cards WHERE course_id = $1 ORDER BY id"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(StudyCardRow::from).collect())
    }

    async fn get(&self, card_id: &str) -> Result<Option<StudyCardRow>, DomainError> {
        let row = sqlx::query_as::<_, CardRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM cards WHERE id = $1"
        ))
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(StudyCardRow::from))
    }

    async fn save_review(&self, card_id: &str, fsrs_state: &FsrsState) -> Result<(), DomainError> {
        let fsrs_state = serde_json::to_value(fsrs_state).map_err(|err| DomainError::Internal(err.into()))?;
        sqlx::query("UPDATE cards SET fsrs_state = $1 WHERE id = $2")
            .bind(fsrs_state)
            .bind(card_id)
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
        let repo = CardRepository::new(unreachable_pool());
        assert!(matches!(repo.list_for_course("c1").await, Err(DomainError::Database(_))));
        assert!(matches!(repo.get("card1").await, Err(DomainError::Database(_))));
        let card = Card {
            id: "card1".to_string(),
            course_id: "c1".to_string(),
            topic_id: "t1".to_string(),
            prompt: "p".to_string(),
            answer: "a".to_string(),
            citations: vec![],
            fsrs_state: None,
        };
        assert!(matches!(repo.insert(&card).await, Err(DomainError::Database(_))));
    }
}
