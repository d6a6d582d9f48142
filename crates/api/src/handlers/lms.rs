//! `POST /lms/connect`, `POST /lms/sync` (spec §4.H), and the admin-guarded
//! manual scheduled-sync trigger (component L).

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use gurt_canvas_client::CanvasClient;
use gurt_domain::{CanvasConnection, DomainError};
use gurt_ingest_workflow::finalize::KbIngestionConfig;
use gurt_lms_sync::{CanvasConnectionStore, ScheduledSyncReport, SyncLimits, SyncOutcome, run_scheduled_sync, sync_user};

use crate::middleware::admin::AdminApiKey;
use crate::principal::resolve_request_principal;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectRequest {
    #[serde(rename = "canvasBaseUrl")]
    pub canvas_base_url: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "canvasBaseUrl")]
    pub canvas_base_url: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

/// Wire shape for `SyncOutcome`, which carries no `Serialize` impl of its
/// own — this crate owns the HTTP response format, not the sync engine.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    #[serde(rename = "coursesUpserted")]
    pub courses_upserted: usize,
    #[serde(rename = "itemsUpserted")]
    pub items_upserted: usize,
    #[serde(rename = "materialsUpserted")]
    pub materials_upserted: usize,
    #[serde(rename = "materialsMirrored")]
    pub materials_mirrored: usize,
    pub kb: KbOutcome,
    #[serde(rename = "failedCourseIds")]
    pub failed_course_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KbOutcome {
    pub started: bool,
    #[serde(rename = "jobId", skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<SyncOutcome> for SyncResponse {
    fn from(outcome: SyncOutcome) -> Self {
        Self {
            courses_upserted: outcome.courses_upserted,
            items_upserted: outcome.items_upserted,
            materials_upserted: outcome.materials_upserted,
            materials_mirrored: outcome.materials_mirrored,
            kb: KbOutcome {
                started: outcome.kb_started,
                job_id: outcome.kb_job_id,
                error: outcome.kb_error,
            },
            failed_course_ids: outcome.failed_course_ids,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledSyncResponse {
    #[serde(rename = "usersSucceeded")]
    pub users_succeeded: usize,
    #[serde(rename = "usersFailed")]
    pub users_failed: usize,
    #[serde(rename = "coursesTotal")]
    pub courses_total: usize,
    #[serde(rename = "itemsTotal")]
    pub items_total: usize,
    #[serde(rename = "materialsTotal")]
    pub materials_total: usize,
    #[serde(rename = "materialsMirroredTotal")]
    pub materials_mirrored_total: usize,
    #[serde(rename = "failedCourseIdsByUser")]
    pub failed_course_ids_by_user: std::collections::HashMap<String, Vec<String>>,
    #[serde(rename = "userErrors")]
    pub user_errors: std::collections::HashMap<String, String>,
}

impl From<ScheduledSyncReport> for ScheduledSyncResponse {
    fn from(report: ScheduledSyncReport) -> Self {
        Self {
            users_succeeded: report.users_succeeded,
            users_failed: report.users_failed,
            courses_total: report.courses_total,
            items_total: report.items_total,
            materials_total: report.materials_total,
            materials_mirrored_total: report.materials_mirrored_total,
            failed_course_ids_by_user: report.failed_course_ids_by_user,
            user_errors: report.user_errors,
        }
    }
}

fn sync_limits(state: &AppState) -> SyncLimits {
    SyncLimits {
        max_material_bytes: state.config.canvas_max_file_bytes,
        max_files_per_course: state.config.canvas_max_files_per_course,
        max_files_total: state.config.canvas_max_files_total,
        allowed_content_types: state.config.canvas_allowed_material_content_types.clone(),
    }
}

fn kb_ingestion_config(state: &AppState) -> Option<KbIngestionConfig> {
    let knowledge_base_id = state.config.knowledge_base_id.clone()?;
    let data_source_id = state.config.knowledge_base_data_source_id.clone()?;
    Some(KbIngestionConfig {
        knowledge_base_id,
        data_source_id,
    })
}

pub async fn connect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ConnectRequest>,
) -> Result<Json<ConnectResponse>, DomainError> {
    let user_id = resolve_request_principal(&state, &headers)?;
    let updated_at = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let connection = CanvasConnection {
        user_id: user_id.clone(),
        canvas_base_url: payload.canvas_base_url.clone(),
        access_token: payload.access_token,
        updated_at: updated_at.clone(),
    };
    state.canvas_connections.upsert(&connection).await?;

    Ok(Json(ConnectResponse {
        user_id,
        canvas_base_url: payload.canvas_base_url,
        updated_at,
    }))
}

pub async fn sync(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SyncResponse>, DomainError> {
    let user_id = resolve_request_principal(&state, &headers)?;
    let connection = state
        .canvas_connections
        .get(&user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("no LMS connection for user {user_id}")))?;

    let canvas = CanvasClient::new(&connection.canvas_base_url, &connection.access_token, &state.config.canvas_user_agent)
        .map_err(|err| DomainError::UpstreamError(err.to_string()))?;

    let outcome = sync_user(
        &canvas,
        state.object_store.as_ref(),
        &state.courses,
        &state.canvas_items,
        &state.canvas_materials,
        state.kb_ingestion_trigger.as_ref(),
        kb_ingestion_config(&state).as_ref(),
        &user_id,
        &sync_limits(&state),
    )
    .await?;

    Ok(Json(SyncResponse::from(outcome)))
}

pub async fn trigger_scheduled_sync(
    State(state): State<Arc<AppState>>,
    _admin: AdminApiKey,
) -> Result<Json<ScheduledSyncResponse>, DomainError> {
    let report = run_scheduled_sync(
        &state.canvas_connections,
        state.object_store.as_ref(),
        &state.courses,
        &state.canvas_items,
        &state.canvas_materials,
        state.kb_ingestion_trigger.as_ref(),
        kb_ingestion_config(&state).as_ref(),
        &state.config.canvas_user_agent,
        &sync_limits(&state),
    )
    .await?;

    Ok(Json(ScheduledSyncResponse::from(report)))
}
