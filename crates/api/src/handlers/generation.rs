//! `POST /generate/flashcards`, `POST /generate/flashcards-from-materials`,
//! `POST /generate/practice-exam` (spec §4.F).

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;

use gurt_domain::{Card, DomainError};
use gurt_generation::practice_exam::PracticeExam;
use gurt_generation::{generate_flashcards, generate_flashcards_from_materials, generate_practice_exam};

use crate::principal::resolve_request_principal;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateFlashcardsRequest {
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "numCards")]
    pub num_cards: usize,
}

pub async fn flashcards(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateFlashcardsRequest>,
) -> Result<Json<Vec<Card>>, DomainError> {
    let cards = generate_flashcards(
        state.knowledge_base.as_ref(),
        state.language_model.as_ref(),
        &payload.course_id,
        payload.num_cards,
    )
    .await?;

    for card in &cards {
        state.cards.insert(card).await?;
    }

    Ok(Json(cards))
}

#[derive(Debug, Deserialize)]
pub struct GenerateFlashcardsFromMaterialsRequest {
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "materialIds")]
    pub material_ids: Vec<String>,
    #[serde(rename = "numCards")]
    pub num_cards: usize,
}

pub async fn flashcards_from_materials(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<GenerateFlashcardsFromMaterialsRequest>,
) -> Result<Json<Vec<Card>>, DomainError> {
    let user_id = resolve_request_principal(&state, &headers)?;
    let owned = state.canvas_materials.list_for_course(&user_id, &payload.course_id).await?;

    let mut material_keys = Vec::with_capacity(payload.material_ids.len());
    let mut missing = Vec::new();
    for material_id in &payload.material_ids {
        match owned.iter().find(|m| &m.canvas_file_id == material_id) {
            Some(material) => material_keys.push(material.s3_key.clone()),
            None => missing.push(material_id.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(DomainError::Validation(format!(
            "materialIds not found in course {}: {}",
            payload.course_id,
            missing.join(", ")
        )));
    }

    let cards = generate_flashcards_from_materials(
        state.object_store.as_ref(),
        state.language_model.as_ref(),
        &payload.course_id,
        &material_keys,
        payload.num_cards,
    )
    .await?;

    for card in &cards {
        state.cards.insert(card).await?;
    }

    Ok(Json(cards))
}

#[derive(Debug, Deserialize)]
pub struct GeneratePracticeExamRequest {
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "numQuestions")]
    pub num_questions: usize,
}

pub async fn practice_exam(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GeneratePracticeExamRequest>,
) -> Result<Json<PracticeExam>, DomainError> {
    let exam = generate_practice_exam(
        state.knowledge_base.as_ref(),
        state.language_model.as_ref(),
        &payload.course_id,
        payload.num_questions,
    )
    .await?;
    Ok(Json(exam))
}
