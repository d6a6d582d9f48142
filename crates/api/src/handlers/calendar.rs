//! `POST /calendar/token` + `GET /calendar/{token}.ics` (spec §4.J).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use gurt_calendar_tokens::{MintingConfig, MintingError, get_active, mint_calendar_token};
use gurt_domain::DomainError;
use gurt_ics::{ScheduleItem, build_calendar};
use serde::Serialize;

use crate::demo_fixtures;
use crate::principal::resolve_request_principal;
use crate::state::AppState;

/// Neither `MintingError` nor `DomainError` is local to this crate, so the
/// conversion has to be a function rather than a `From` impl.
fn minting_error_to_domain(err: MintingError) -> DomainError {
    match err {
        MintingError::Record(_) | MintingError::Store(_) => DomainError::Internal(err.into()),
        MintingError::InvalidPath | MintingError::MissingSeededToken | MintingError::SeededUserMismatch => {
            DomainError::Misconfigured(err.to_string())
        }
        MintingError::MissingUserId => DomainError::Validation(err.to_string()),
    }
}

/// Wire shape for `CalendarTokenRecord`, which carries no `Serialize` impl
/// of its own.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarTokenResponse {
    pub token: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

pub async fn mint_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<CalendarTokenResponse>), DomainError> {
    let user_id = resolve_request_principal(&state, &headers)?;
    let config = MintingConfig::from_env().map_err(minting_error_to_domain)?;
    let record = mint_calendar_token(&user_id, &state.calendar_tokens, &config, Utc::now())
        .await
        .map_err(minting_error_to_domain)?;

    Ok((
        StatusCode::CREATED,
        Json(CalendarTokenResponse {
            token: record.token,
            user_id: record.user_id,
            created_at: record.created_at,
        }),
    ))
}

pub async fn feed(
    State(state): State<Arc<AppState>>,
    Path(token_with_suffix): Path<String>,
) -> Result<Response, DomainError> {
    let token = token_with_suffix.strip_suffix(".ics").unwrap_or(&token_with_suffix);

    let record = get_active(&state.calendar_tokens, token)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("calendar token {token}")))?;

    let courses = state.courses.list_for_user(&record.user_id).await?;
    let mut items = Vec::new();
    for course in &courses {
        let course_items = state.canvas_items.list_for_course(&record.user_id, &course.id).await?;
        items.extend(course_items);
    }

    if items.is_empty() && state.config.calendar_fixture_fallback {
        items = courses
            .iter()
            .flat_map(|course| demo_fixtures::items_for_course(&course.id))
            .collect();
        if courses.is_empty() {
            items = demo_fixtures::courses()
                .iter()
                .flat_map(|course| demo_fixtures::items_for_course(&course.id))
                .collect();
        }
    }

    let schedule_items: Vec<ScheduleItem> = items
        .into_iter()
        .filter_map(|item| {
            let due_at = DateTime::parse_from_rfc3339(&item.due_at)
                .map(|dt| dt.with_timezone(&Utc))
                .inspect_err(|err| tracing::warn!(item_id = %item.id, %err, "skipping calendar item with unparseable dueAt"))
                .ok()?;
            Some(ScheduleItem {
                id: item.id,
                course_id: item.course_id,
                title: item.title,
                due_at,
                start_at: None,
                end_at: None,
            })
        })
        .collect();

    let body = build_calendar(&record.user_id, &schedule_items);

    let mut response = body.into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/calendar; charset=utf-8"));
    Ok(response)
}
