//! `POST /docs/ingest` + `GET /docs/ingest/{jobId}` (spec §4.G submit +
//! status). This deployment has no external step orchestrator, so the
//! `extract -> (OCR)? -> finalize` topology the task handlers assume is
//! driven inline by a detached `tokio::spawn`, polling OCR on a bounded
//! loop instead of the orchestrator's own retry/backoff schedule.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use gurt_config::AppConfig;
use gurt_domain::{DomainError, IngestJob};
use gurt_ingest_workflow::extract::{DEFAULT_TEXTRACT_THRESHOLD, extract};
use gurt_ingest_workflow::finalize::{FinalizeInput, KbIngestionConfig, finalize};
use gurt_ingest_workflow::ocr::{PollOcrResult, poll_ocr, start_ocr};

use crate::state::AppState;

const OCR_POLL_ATTEMPTS: usize = 30;
const OCR_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    #[serde(rename = "sourceDocId")]
    pub source_doc_id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "sourceKey")]
    pub source_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestAccepted {
    #[serde(rename = "jobId")]
    pub job_id: String,
}

pub async fn submit_ingest(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestAccepted>), DomainError> {
    let job_id = format!("job-{}", uuid::Uuid::new_v4());
    state
        .ingest_jobs
        .insert_running(&job_id, &payload.source_doc_id, &payload.course_id, &payload.source_key)
        .await?;

    let worker_state = state.clone();
    let worker_job_id = job_id.clone();
    tokio::spawn(async move {
        run_pipeline(worker_state, worker_job_id, payload).await;
    });

    Ok((StatusCode::ACCEPTED, Json(IngestAccepted { job_id })))
}

pub async fn get_ingest_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<IngestJob>, DomainError> {
    let job = state
        .ingest_jobs
        .get(&job_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("ingest job {job_id}")))?;
    Ok(Json(job))
}

async fn run_pipeline(state: Arc<AppState>, job_id: String, request: IngestRequest) {
    let result = run_steps(&state, &request).await;
    let (text, used_textract, error) = match result {
        Ok((text, used_textract)) => (text, used_textract, String::new()),
        Err(err) => (String::new(), false, err.to_string()),
    };

    finalize(
        &state.ingest_jobs,
        state.kb_ingestion_trigger.as_ref(),
        kb_ingestion_config(&state.config).as_ref(),
        FinalizeInput {
            job_id,
            source_doc_id: request.source_doc_id,
            course_id: request.course_id,
            source_key: request.source_key,
            text,
            used_textract,
            error,
        },
    )
    .await;
}

async fn run_steps(state: &AppState, request: &IngestRequest) -> Result<(String, bool), DomainError> {
    let extracted = extract(
        state.object_store.as_ref(),
        state.document_converter.as_ref(),
        state.pdf_text_extractor.as_ref(),
        &request.source_key,
        DEFAULT_TEXTRACT_THRESHOLD,
    )
    .await?;

    if !extracted.needs_textract {
        return Ok((extracted.text, false));
    }

    let bucket = state.config.uploads_bucket.as_deref().unwrap_or_default();
    let started = start_ocr(state.ocr_service.as_ref(), bucket, &extracted.textract_key).await?;

    for _ in 0..OCR_POLL_ATTEMPTS {
        match poll_ocr(state.ocr_service.as_ref(), &started.textract_job_id).await? {
            PollOcrResult::Running => {
                tokio::time::sleep(OCR_POLL_INTERVAL).await;
            }
            PollOcrResult::Done { text, error: None } => return Ok((text, true)),
            PollOcrResult::Done { error: Some(err), .. } => return Err(DomainError::UpstreamError(err)),
        }
    }

    Err(DomainError::Transient(
        "OCR polling exceeded the maximum number of attempts".to_string(),
    ))
}

fn kb_ingestion_config(config: &AppConfig) -> Option<KbIngestionConfig> {
    let knowledge_base_id = config.knowledge_base_id.clone()?;
    let data_source_id = config.knowledge_base_data_source_id.clone()?;
    Some(KbIngestionConfig {
        knowledge_base_id,
        data_source_id,
    })
}
