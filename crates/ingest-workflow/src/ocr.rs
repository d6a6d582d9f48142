//! `start_ocr` and `poll_ocr` task handlers (spec §4.G).

use std::time::Duration;

use gurt_domain::DomainError;

use crate::ports::{OcrPollOutcome, OcrService};

const OCR_START_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct StartOcrResult {
    pub textract_job_id: String,
}

pub async fn start_ocr(ocr: &dyn OcrService, bucket: &str, textract_key: &str) -> Result<StartOcrResult, DomainError> {
    let job_id = tokio::time::timeout(OCR_START_TIMEOUT, ocr.start(bucket, textract_key))
        .await
        .map_err(|_| DomainError::UpstreamError("OCR start timed out after 30 seconds".to_string()))??;
    Ok(StartOcrResult {
        textract_job_id: job_id,
    })
}

#[derive(Debug, Clone)]
pub enum PollOcrResult {
    Running,
    Done { text: String, error: Option<String> },
}

/// Poll one OCR job. The caller loops on `Running` per the step
/// orchestrator's own retry/backoff topology — this handler does not wait.
pub async fn poll_ocr(ocr: &dyn OcrService, textract_job_id: &str) -> Result<PollOcrResult, DomainError> {
    match ocr.poll(textract_job_id).await? {
        OcrPollOutcome::Running => Ok(PollOcrResult::Running),
        OcrPollOutcome::Failed { error } => Ok(PollOcrResult::Done {
            text: String::new(),
            error: Some(error),
        }),
        OcrPollOutcome::Succeeded { text } => Ok(PollOcrResult::Done {
            text,
            error: None,
        }),
    }
}
