//! `GET /study/today`, `POST /study/review`, `GET /study/mastery` (spec §4.I).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use gurt_domain::DomainError;
use gurt_fsrs::FsrsState;
use gurt_study::mastery::topic_mastery_for_course;
use gurt_study::ports::StudyCardRow;
use gurt_study::selection::study_today_for_course;
use gurt_study::{ReviewPayload, ReviewResult, TopicMastery, record_review};
use gurt_storage::UserScopedExamWindowSource;

use crate::principal::resolve_request_principal;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StudyTodayQuery {
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "examId")]
    pub exam_id: Option<String>,
}

/// Wire shape for `StudyCardRow`, which carries no `Serialize` impl of its
/// own — this crate owns the HTTP response format, not the selection core.
#[derive(Debug, Clone, Serialize)]
pub struct StudyCardResponse {
    pub id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "topicId")]
    pub topic_id: String,
    pub prompt: String,
    pub answer: String,
    #[serde(rename = "fsrsState", skip_serializing_if = "Option::is_none")]
    pub fsrs_state: Option<FsrsState>,
}

impl From<StudyCardRow> for StudyCardResponse {
    fn from(row: StudyCardRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            topic_id: row.topic_id,
            prompt: row.prompt,
            answer: row.answer,
            fsrs_state: row.fsrs_state,
        }
    }
}

pub async fn study_today(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StudyTodayQuery>,
) -> Result<Json<Vec<StudyCardResponse>>, DomainError> {
    let user_id = resolve_request_principal(&state, &headers)?;
    let exam_source = UserScopedExamWindowSource {
        repo: &state.canvas_items,
        user_id,
    };
    let cards = study_today_for_course(
        &state.cards,
        &exam_source,
        &query.course_id,
        query.exam_id.as_deref(),
        Utc::now(),
    )
    .await?;
    Ok(Json(cards.into_iter().map(StudyCardResponse::from).collect()))
}

pub async fn review(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ReviewPayload>,
) -> Result<Json<ReviewResult>, DomainError> {
    let result = record_review(&state.cards, &payload).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct MasteryQuery {
    #[serde(rename = "courseId")]
    pub course_id: String,
}

pub async fn mastery(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MasteryQuery>,
) -> Result<Json<Vec<TopicMastery>>, DomainError> {
    let rows = topic_mastery_for_course(&state.cards, &query.course_id, Utc::now()).await?;
    Ok(Json(rows))
}
