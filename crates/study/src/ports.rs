//! Storage collaborator traits, implemented by `gurt-storage`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gurt_domain::DomainError;
use gurt_fsrs::FsrsState;

/// A card row as read/written by the study module. `due_at` mirrors
/// `fsrs_state.due_at` when present (spec §3 invariant); a card with no
/// `fsrs_state` is treated as due immediately (never reviewed yet).
#[derive(Debug, Clone, PartialEq)]
pub struct StudyCardRow {
    pub id: String,
    pub course_id: String,
    pub topic_id: String,
    pub prompt: String,
    pub answer: String,
    pub fsrs_state: Option<FsrsState>,
}

impl StudyCardRow {
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.fsrs_state.as_ref().map(|s| s.due_at)
    }
}

/// Persistence for `Card` rows, keyed by course.
#[async_trait]
pub trait CardStore: Send + Sync {
    async fn list_for_course(&self, course_id: &str) -> Result<Vec<StudyCardRow>, DomainError>;
    async fn get(&self, card_id: &str) -> Result<Option<StudyCardRow>, DomainError>;
    async fn save_review(
        &self,
        card_id: &str,
        fsrs_state: &FsrsState,
    ) -> Result<(), DomainError>;
}

/// Exam due dates for a course — backed by `gurt-storage`'s `CanvasItem`
/// repository. Kept as a narrow trait so `gurt-study` stays decoupled from
/// the full item model.
#[async_trait]
pub trait ExamWindowSource: Send + Sync {
    async fn exam_due_dates(&self, course_id: &str) -> Result<Vec<(String, DateTime<Utc>)>, DomainError>;
}
