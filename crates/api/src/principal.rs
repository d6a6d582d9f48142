//! Principal resolution for axum handlers (spec §4.K).
//!
//! This deployment sits behind no authorizer, so `AuthorizerContext` is
//! always `::default()` — resolution always falls through to the demo-mode
//! branch of `gurt_api::envelope::resolve_principal`. The extraction chain
//! is kept in `envelope.rs` anyway so it stays exercisable against a real
//! authorizer-shaped event if one is ever wired in front of this service.

use axum::http::HeaderMap;

use gurt_domain::DomainError;

use crate::envelope::{self, AuthorizerContext};
use crate::state::AppState;

pub fn resolve_request_principal(state: &AppState, headers: &HeaderMap) -> Result<String, DomainError> {
    let demo_header = headers.get("x-gurt-demo-user-id").and_then(|v| v.to_str().ok());
    envelope::resolve_principal(
        &AuthorizerContext::default(),
        state.config.demo_mode,
        demo_header,
        &state.config.demo_user_id,
    )
    .ok_or_else(|| DomainError::AuthRequired("authenticated principal is required".to_string()))
}
