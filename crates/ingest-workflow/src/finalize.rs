//! The `finalize` task handler (spec §4.G): ingestion failures never raise
//! from here — every outcome is recorded on the row so the workflow
//! converges, and the response always carries a terminal status.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::ports::{IngestJobStore, KbIngestionTrigger, TerminalIngestJobRow};

/// Pure idempotent client token for a KB ingestion job: the SHA-256 hex
/// digest of `{sourceKey}:{textLength}`. Same inputs always produce the
/// same token; any differing input produces a different one.
pub fn kb_client_token(source_key: &str, text_length: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{source_key}:{text_length}").as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct FinalizeInput {
    pub job_id: String,
    pub source_doc_id: String,
    pub course_id: String,
    pub source_key: String,
    pub text: String,
    pub used_textract: bool,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct FinalizeOutput {
    pub job_id: String,
    pub finished: bool,
    pub text_length: usize,
    pub used_textract: bool,
    pub updated_at: DateTime<Utc>,
    pub error: String,
}

/// KB configuration, resolved by the caller from environment (spec §6:
/// `KNOWLEDGE_BASE_ID`, `KNOWLEDGE_BASE_DATA_SOURCE_ID` with legacy
/// `DATA_SOURCE_ID` alias).
#[derive(Debug, Clone)]
pub struct KbIngestionConfig {
    pub knowledge_base_id: String,
    pub data_source_id: String,
}

pub async fn finalize(
    job_store: &dyn IngestJobStore,
    kb_trigger: &dyn KbIngestionTrigger,
    kb_config: Option<&KbIngestionConfig>,
    input: FinalizeInput,
) -> FinalizeOutput {
    let finished = input.error.is_empty();
    let text_length = input.text.len();

    let upsert_result = job_store
        .upsert_terminal(&TerminalIngestJobRow {
            job_id: input.job_id.clone(),
            source_doc_id: input.source_doc_id.clone(),
            course_id: input.course_id.clone(),
            source_key: input.source_key.clone(),
            status_finished: finished,
            text_length,
            used_textract: input.used_textract,
            error: input.error.clone(),
        })
        .await;
    if let Err(err) = upsert_result {
        tracing::error!(job_id = %input.job_id, %err, "ingest.finalize.failure");
    } else {
        tracing::info!(job_id = %input.job_id, finished, "ingest.finalize.success");
    }

    if finished {
        match kb_config {
            None => {
                let msg = "server misconfiguration: KNOWLEDGE_BASE_ID and \
                           KNOWLEDGE_BASE_DATA_SOURCE_ID (or DATA_SOURCE_ID) required for KB ingestion"
                    .to_string();
                tracing::error!(job_id = %input.job_id, "ingest.kb_trigger.missing_config");
                let _ = job_store.patch_kb_result(&input.job_id, None, Some(&msg)).await;
            }
            Some(config) => {
                let client_token = kb_client_token(&input.source_key, text_length);
                tracing::info!(job_id = %input.job_id, "ingest.kb_trigger.started");
                match kb_trigger
                    .start_ingestion_job(&config.knowledge_base_id, &config.data_source_id, &client_token)
                    .await
                {
                    Ok(ingestion_job_id) => {
                        tracing::info!(job_id = %input.job_id, ingestion_job_id = %ingestion_job_id, "ingest.kb_trigger.succeeded");
                        let _ = job_store
                            .patch_kb_result(&input.job_id, Some(&ingestion_job_id), None)
                            .await;
                    }
                    Err(err) => {
                        let msg = format!("KB ingestion trigger failed: {err}");
                        tracing::error!(job_id = %input.job_id, %err, "ingest.kb_trigger.failed");
                        let _ = job_store.patch_kb_result(&input.job_id, None, Some(&msg)).await;
                    }
                }
            }
        }
    }

    FinalizeOutput {
        job_id: input.job_id,
        finished,
        text_length,
        used_textract: input.used_textract,
        updated_at: Utc::now(),
        error: input.error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_a_pure_function_of_key_and_length() {
        let a = kb_client_token("uploads/c/d/f.pdf", 120);
        let b = kb_client_token("uploads/c/d/f.pdf", 120);
        let c = kb_client_token("uploads/c/d/f.pdf", 121);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
