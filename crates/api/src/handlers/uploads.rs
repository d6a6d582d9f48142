//! `POST /uploads` (spec §4.M).

use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use gurt_domain::DomainError;
use gurt_uploads::{UploadRequestPayload, UploadResponse, create_upload};

use crate::state::AppState;

pub async fn create_upload_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UploadRequestPayload>,
) -> Result<Json<UploadResponse>, DomainError> {
    let response = create_upload(&payload, state.object_store.as_ref()).await?;
    Ok(Json(response))
}
