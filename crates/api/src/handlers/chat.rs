//! `POST /chat` (spec §4.F). A `GuardrailBlocked` error is caught here and
//! turned into a safe 200 answer instead of the generic 502 response.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use gurt_domain::DomainError;
use gurt_generation::{ChatAnswer, GUARDRAIL_CHAT_ANSWER, chat_answer};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(rename = "courseId")]
    pub course_id: String,
    pub question: String,
    #[serde(rename = "canvasContext")]
    pub canvas_context: Option<String>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatAnswer>, DomainError> {
    let result = chat_answer(
        state.knowledge_base.as_ref(),
        state.language_model.as_ref(),
        &payload.course_id,
        &payload.question,
        payload.canvas_context.as_deref(),
    )
    .await;

    match result {
        Ok(answer) => Ok(Json(answer)),
        Err(DomainError::GuardrailBlocked) => Ok(Json(ChatAnswer {
            answer: GUARDRAIL_CHAT_ANSWER.to_string(),
            citations: Vec::new(),
        })),
        Err(err) => Err(err),
    }
}
