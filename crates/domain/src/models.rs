//! Validated domain entities (spec §3).
//!
//! Each entity rejects unknown wire keys via `#[serde(deny_unknown_fields)]`
//! and carries a `validate()` for the checks serde cannot express (hex
//! colors, RFC3339-Z timestamps, non-negative numbers, enum membership).

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid regex"));
static RFC3339_UTC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{1,6})?Z$").expect("valid regex")
});

/// `true` iff `value` is an RFC3339 UTC timestamp with a trailing `Z`.
pub fn is_rfc3339_utc(value: &str) -> bool {
    RFC3339_UTC_RE.is_match(value)
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        Err(DomainError::Validation(format!("{field}: must not be empty")))
    } else {
        Ok(())
    }
}

fn require_timestamp(field: &'static str, value: &str) -> Result<(), DomainError> {
    if is_rfc3339_utc(value) {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "{field}: expected RFC3339 UTC timestamp (YYYY-MM-DDTHH:MM:SSZ)"
        )))
    }
}

/// A course owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub term: String,
    pub color: String,
}

impl Course {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_non_empty("id", &self.id)?;
        require_non_empty("name", &self.name)?;
        require_non_empty("term", &self.term)?;
        if !HEX_COLOR_RE.is_match(&self.color) {
            return Err(DomainError::Validation(
                "color: expected #RRGGBB format".to_string(),
            ));
        }
        Ok(())
    }
}

/// Assignment/exam/quiz classification for a `CanvasItem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Assignment,
    Exam,
    Quiz,
}

/// A gradeable item (assignment, exam, or quiz) belonging to a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanvasItem {
    pub id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    pub title: String,
    #[serde(rename = "itemType")]
    pub item_type: ItemType,
    #[serde(rename = "dueAt")]
    pub due_at: String,
    #[serde(rename = "pointsPossible")]
    pub points_possible: f64,
}

impl CanvasItem {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_non_empty("id", &self.id)?;
        require_non_empty("courseId", &self.course_id)?;
        require_non_empty("title", &self.title)?;
        require_timestamp("dueAt", &self.due_at)?;
        if self.points_possible < 0.0 {
            return Err(DomainError::Validation(
                "pointsPossible: must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// A file mirrored from the LMS into object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanvasMaterial {
    #[serde(rename = "canvasFileId")]
    pub canvas_file_id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    #[serde(rename = "sizeBytes")]
    pub size_bytes: i64,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    #[serde(rename = "s3Key")]
    pub s3_key: String,
}

impl CanvasMaterial {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_non_empty("canvasFileId", &self.canvas_file_id)?;
        require_non_empty("courseId", &self.course_id)?;
        require_non_empty("displayName", &self.display_name)?;
        require_timestamp("updatedAt", &self.updated_at)?;
        if self.size_bytes < 0 {
            return Err(DomainError::Validation(
                "sizeBytes: must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// A stored LMS connection — at most one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanvasConnection {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "canvasBaseUrl")]
    pub canvas_base_url: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

/// A generated or reviewed flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Card {
    pub id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "topicId")]
    pub topic_id: String,
    pub prompt: String,
    pub answer: String,
    pub citations: Vec<String>,
    #[serde(rename = "fsrsState", skip_serializing_if = "Option::is_none")]
    pub fsrs_state: Option<gurt_fsrs::FsrsState>,
}

impl Card {
    /// `Card.dueAt` mirrors `fsrsState.dueAt` when present (spec §3 invariant).
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.fsrs_state.as_ref().map(|s| s.due_at)
    }
}

/// Ingestion job terminal/non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestJobStatus {
    Running,
    Finished,
    Failed,
}

/// A document-ingestion workflow job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestJob {
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(rename = "sourceDocId")]
    pub source_doc_id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "sourceKey")]
    pub source_key: String,
    pub status: IngestJobStatus,
    #[serde(rename = "textLength")]
    pub text_length: i64,
    #[serde(rename = "usedTextract")]
    pub used_textract: bool,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        rename = "kbIngestionJobId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub kb_ingestion_job_id: Option<String>,
    #[serde(
        rename = "kbIngestionError",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub kb_ingestion_error: Option<String>,
}

impl IngestJob {
    /// `status = FAILED ⇔ error ≠ ""` at finalize time (spec §3 invariant).
    pub fn is_consistent(&self) -> bool {
        match self.status {
            IngestJobStatus::Failed => self.error.as_deref().is_some_and(|e| !e.is_empty()),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_course() -> Course {
        Course {
            id: "c1".to_string(),
            name: "Algorithms".to_string(),
            term: "Fall 2026".to_string(),
            color: "#A1B2C3".to_string(),
        }
    }

    #[test]
    fn course_round_trips_through_json() {
        let course = sample_course();
        let value = serde_json::to_value(&course).unwrap();
        let back: Course = serde_json::from_value(value).unwrap();
        assert_eq!(course, back);
        assert!(back.validate().is_ok());
    }

    #[test]
    fn course_rejects_unknown_keys() {
        let payload = serde_json::json!({
            "id": "c1", "name": "n", "term": "t", "color": "#000000", "extra": 1
        });
        assert!(serde_json::from_value::<Course>(payload).is_err());
    }

    #[test]
    fn course_rejects_bad_color() {
        let mut course = sample_course();
        course.color = "blue".to_string();
        assert!(course.validate().is_err());
    }

    #[test]
    fn canvas_item_rejects_negative_points() {
        let item = CanvasItem {
            id: "i1".to_string(),
            course_id: "c1".to_string(),
            title: "HW1".to_string(),
            item_type: ItemType::Assignment,
            due_at: "2026-09-01T10:15:00Z".to_string(),
            points_possible: -1.0,
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn canvas_item_rejects_non_rfc3339_due_at() {
        let item = CanvasItem {
            id: "i1".to_string(),
            course_id: "c1".to_string(),
            title: "HW1".to_string(),
            item_type: ItemType::Exam,
            due_at: "2026-09-01".to_string(),
            points_possible: 10.0,
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn ingest_job_consistency_requires_error_on_failure() {
        let job = IngestJob {
            job_id: "j1".to_string(),
            source_doc_id: "d1".to_string(),
            course_id: "c1".to_string(),
            source_key: "uploads/c1/d1/f.pdf".to_string(),
            status: IngestJobStatus::Failed,
            text_length: 0,
            used_textract: false,
            updated_at: Utc::now(),
            error: None,
            kb_ingestion_job_id: None,
            kb_ingestion_error: None,
        };
        assert!(!job.is_consistent());
    }
}
