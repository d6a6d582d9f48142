//! Guard for the manual scheduled-sync trigger route (component L).
//!
//! Grounded on the teacher's `middleware/auth.rs::AdminApiKey` extractor,
//! adapted to this crate's `DomainError` taxonomy: the teacher's
//! `Forbidden`/`Unauthorized` variants don't exist here, so "disabled" maps
//! to `Misconfigured` (500 — matches spec §7's "missing config" kind) and
//! both a missing and a mismatched key map to `AuthRequired` (401), so a
//! caller can't distinguish "no key sent" from "wrong key" by status code.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use gurt_domain::DomainError;

use crate::state::AppState;

pub struct AdminApiKey;

impl FromRequestParts<Arc<AppState>> for AdminApiKey {
    type Rejection = DomainError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Err(DomainError::Misconfigured(
                "ADMIN_API_KEY is not set; the manual sync trigger is disabled".to_string(),
            ));
        };

        let provided = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DomainError::AuthRequired("missing x-admin-key header".to_string()))?;

        if provided != expected {
            return Err(DomainError::AuthRequired("invalid admin key".to_string()));
        }

        Ok(Self)
    }
}
