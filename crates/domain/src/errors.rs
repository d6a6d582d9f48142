//! Error taxonomy with HTTP status code mappings (spec §7 Kinds).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// API error response format: `{"error": "...", "details": [...]}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// Domain errors with HTTP status code mappings.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// ValidationError (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// ValidationError (400), multiple field failures
    #[error("Validation failed")]
    ValidationErrors(Vec<String>),

    /// AuthRequired (401) — no principal and demo mode is off.
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    /// NotFound (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 503 — a demo-mode-only feature was called with demo mode off.
    #[error("This endpoint is only available in demo mode")]
    DemoModeRequired,

    /// Misconfigured (500) — surfaced with the name of the missing config.
    #[error("Server misconfigured: {0}")]
    Misconfigured(String),

    /// UpstreamError (502) — LMS, LLM, KB, or OCR collaborator failure.
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    /// GuardrailBlocked — a safe refusal in chat context; 502 elsewhere.
    /// Chat handlers catch this variant before generic error conversion.
    #[error("The request was blocked by a content safety guardrail")]
    GuardrailBlocked,

    /// Transient — retried by the step orchestrator, not by the core.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Database error (500)
    #[error("Database error")]
    Database(String),

    /// Internal server error (500)
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DomainError::Validation(_) | DomainError::ValidationErrors(_) => {
                StatusCode::BAD_REQUEST
            }
            DomainError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::DemoModeRequired => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::UpstreamError(_) | DomainError::GuardrailBlocked => {
                StatusCode::BAD_GATEWAY
            }
            DomainError::Misconfigured(_)
            | DomainError::Transient(_)
            | DomainError::Database(_)
            | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a validation error from `validator` crate errors.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error
                            .message
                            .as_ref()
                            .unwrap_or(&std::borrow::Cow::Borrowed("validation failed"))
                    )
                })
            })
            .collect();

        if messages.is_empty() {
            DomainError::Validation("Invalid input".to_string())
        } else {
            DomainError::ValidationErrors(messages)
        }
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if matches!(
            self,
            DomainError::Internal(_) | DomainError::Database(_) | DomainError::Misconfigured(_)
        ) {
            tracing::error!("Internal error: {}", self);
        }

        let body = match &self {
            DomainError::ValidationErrors(details) => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(details.clone()),
            },
            _ => ErrorResponse {
                error: self.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Database(err.to_string())
    }
}
