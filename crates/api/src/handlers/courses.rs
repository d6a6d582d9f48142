//! `GET /courses`, `GET /courses/{id}/items`, `GET /courses/{id}/materials`
//! (spec §4.K route table). Each falls back to the embedded demo fixtures
//! when the resolved user has no real rows yet and demo mode is active.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;

use gurt_domain::{CanvasItem, Course, DomainError};

use crate::demo_fixtures::{self, MaterialSummary};
use crate::principal::resolve_request_principal;
use crate::state::AppState;

pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Course>>, DomainError> {
    let user_id = resolve_request_principal(&state, &headers)?;
    let courses = state.courses.list_for_user(&user_id).await?;
    if courses.is_empty() && state.config.demo_mode {
        return Ok(Json(demo_fixtures::courses()));
    }
    Ok(Json(courses))
}

pub async fn list_course_items(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<CanvasItem>>, DomainError> {
    let user_id = resolve_request_principal(&state, &headers)?;
    let items = state.canvas_items.list_for_course(&user_id, &course_id).await?;
    if items.is_empty() && state.config.demo_mode {
        return Ok(Json(demo_fixtures::items_for_course(&course_id)));
    }
    Ok(Json(items))
}

pub async fn list_course_materials(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<MaterialSummary>>, DomainError> {
    let user_id = resolve_request_principal(&state, &headers)?;
    let materials = state.canvas_materials.list_for_course(&user_id, &course_id).await?;
    if materials.is_empty() && state.config.demo_mode {
        return Ok(Json(demo_fixtures::materials_for_course(&course_id)));
    }
    let summaries = materials.iter().map(MaterialSummary::from).collect();
    Ok(Json(summaries))
}
