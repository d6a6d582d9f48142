//! Configuration module: loads every spec §6 environment variable.
//!
//! Calendar-token minting env vars (`CALENDAR_TOKEN_MINTING_PATH`,
//! `CALENDAR_TOKEN`, `CALENDAR_TOKEN_USER_ID`) are parsed directly by
//! `gurt_calendar_tokens::MintingConfig::from_env` and are not duplicated
//! here.

use std::collections::HashSet;
use std::env;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

const DEMO_MODE_TRUE_VALUES: [&str; 4] = ["1", "true", "yes", "on"];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Address to bind the HTTP server to.
    pub bind_address: String,

    /// Whether fixture/demo fallbacks are active (`DEMO_MODE`, default true).
    pub demo_mode: bool,
    /// Principal used when no caller identity is present in demo mode.
    pub demo_user_id: String,
    /// Whether `/calendar/{token}.ics` falls back to fixture data when the
    /// token store has nothing (`CALENDAR_FIXTURE_FALLBACK`, default false).
    pub calendar_fixture_fallback: bool,

    pub cors_allow_origin: String,
    pub cors_allow_methods: String,
    pub cors_allow_headers: String,

    /// Override for self-referential URLs (calendar feed links, upload
    /// links). Empty means the API layer falls back to the request's Host
    /// header per call.
    pub public_base_url: Option<String>,

    /// DynamoDB table names from the original single-table design — kept
    /// only for env-var parity with spec §6; this workspace persists to
    /// Postgres via `gurt-storage`; these are not consulted by application
    /// logic.
    pub calendar_tokens_table: Option<String>,
    pub canvas_data_table: Option<String>,
    pub docs_table: Option<String>,
    pub cards_table: Option<String>,

    pub uploads_bucket: Option<String>,

    pub knowledge_base_id: Option<String>,
    pub knowledge_base_data_source_id: Option<String>,
    pub bedrock_model_id: Option<String>,
    pub bedrock_model_arn: Option<String>,
    pub bedrock_guardrail_id: Option<String>,
    pub bedrock_guardrail_version: Option<String>,
    pub ingest_state_machine_arn: Option<String>,

    /// Guards the manual scheduled-sync trigger route. Unset disables that
    /// route entirely (mirrors the teacher's `AdminApiKey` extractor).
    pub admin_api_key: Option<String>,

    pub canvas_user_agent: String,
    pub canvas_max_file_bytes: i64,
    pub canvas_max_files_per_course: usize,
    pub canvas_max_files_total: usize,
    pub canvas_allowed_material_content_types: HashSet<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env_var("DATABASE_URL")?,
            bind_address: env_var_or("BIND_ADDRESS", "0.0.0.0:8080"),

            demo_mode: bool_env("DEMO_MODE", true),
            demo_user_id: {
                let value = env_var_or("DEMO_USER_ID", "demo-user");
                if value.trim().is_empty() {
                    "demo-user".to_string()
                } else {
                    value.trim().to_string()
                }
            },
            calendar_fixture_fallback: bool_env("CALENDAR_FIXTURE_FALLBACK", false),

            cors_allow_origin: non_empty_env_or("CORS_ALLOW_ORIGIN", "*"),
            cors_allow_methods: non_empty_env_or("CORS_ALLOW_METHODS", "GET,POST,OPTIONS"),
            cors_allow_headers: non_empty_env_or(
                "CORS_ALLOW_HEADERS",
                "Content-Type,Authorization,X-Amz-Date,X-Api-Key,X-Amz-Security-Token,X-Gurt-Demo-User-Id",
            ),

            public_base_url: optional_env("PUBLIC_BASE_URL"),
            admin_api_key: optional_env("ADMIN_API_KEY"),

            calendar_tokens_table: optional_env("CALENDAR_TOKENS_TABLE"),
            canvas_data_table: optional_env("CANVAS_DATA_TABLE"),
            docs_table: optional_env("DOCS_TABLE"),
            cards_table: optional_env("CARDS_TABLE"),

            uploads_bucket: optional_env("UPLOADS_BUCKET"),

            knowledge_base_id: optional_env("KNOWLEDGE_BASE_ID"),
            knowledge_base_data_source_id: optional_env("KNOWLEDGE_BASE_DATA_SOURCE_ID")
                .or_else(|| optional_env("DATA_SOURCE_ID")),
            bedrock_model_id: optional_env("BEDROCK_MODEL_ID"),
            bedrock_model_arn: optional_env("BEDROCK_MODEL_ARN"),
            bedrock_guardrail_id: optional_env("BEDROCK_GUARDRAIL_ID"),
            bedrock_guardrail_version: optional_env("BEDROCK_GUARDRAIL_VERSION"),
            ingest_state_machine_arn: optional_env("INGEST_STATE_MACHINE_ARN"),

            canvas_user_agent: env_var_or("CANVAS_USER_AGENT", "GURT-DemoCanvasSync/0.1"),
            canvas_max_file_bytes: int_env("CANVAS_MAX_FILE_BYTES", 20_000_000),
            canvas_max_files_per_course: int_env("CANVAS_MAX_FILES_PER_COURSE", 5) as usize,
            canvas_max_files_total: int_env("CANVAS_MAX_FILES_TOTAL", 20) as usize,
            canvas_allowed_material_content_types: non_empty_env_or(
                "CANVAS_ALLOWED_MATERIAL_CONTENT_TYPES",
                "application/pdf,text/plain",
            )
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        })
    }
}

fn env_var(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn env_var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn non_empty_env_or(name: &str, default: &str) -> String {
    let value = env::var(name).unwrap_or_default();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

fn optional_env(name: &str) -> Option<String> {
    let value = env::var(name).unwrap_or_default();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn bool_env(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => DEMO_MODE_TRUE_VALUES.contains(&raw.trim().to_lowercase().as_str()),
        Err(_) => default,
    }
}

fn int_env(name: &str, default_value: i64) -> i64 {
    let raw = env::var(name).unwrap_or_default();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return default_value;
    }
    match trimmed.parse::<i64>() {
        Ok(parsed) if parsed > 0 => parsed,
        _ => default_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_or_uses_default() {
        let val = env_var_or("NON_EXISTENT_VAR_12345", "default_value");
        assert_eq!(val, "default_value");
    }

    #[test]
    fn bool_env_defaults_when_unset() {
        assert!(bool_env("GURT_CONFIG_TEST_BOOL_UNSET", true));
        assert!(!bool_env("GURT_CONFIG_TEST_BOOL_UNSET", false));
    }

    #[test]
    fn int_env_falls_back_on_non_positive_or_invalid_values() {
        assert_eq!(int_env("GURT_CONFIG_TEST_INT_UNSET", 20_000_000), 20_000_000);
    }
}
