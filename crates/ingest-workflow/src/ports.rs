//! Collaborator ports for the ingestion task handlers: office-to-PDF
//! conversion, PDF text extraction, async OCR, and the KB ingestion
//! trigger. All out-of-scope external services (spec §1).

use async_trait::async_trait;
use gurt_domain::DomainError;

/// Converts an office document (pptx/docx/doc) to PDF bytes. Backed by an
/// offline converter in deployment; callers enforce the 90s timeout.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert_to_pdf(&self, bytes: Vec<u8>, source_extension: &str) -> Result<Vec<u8>, DomainError>;
}

/// Extracts text from PDF bytes using a local text-extraction library.
pub trait PdfTextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, DomainError>;
}

#[derive(Debug, Clone)]
pub enum OcrPollOutcome {
    Running,
    Failed { error: String },
    Succeeded { text: String },
}

/// Asynchronous OCR service (start + poll), used when extracted PDF text
/// falls under the configured threshold.
#[async_trait]
pub trait OcrService: Send + Sync {
    async fn start(&self, bucket: &str, key: &str) -> Result<String, DomainError>;
    async fn poll(&self, job_id: &str) -> Result<OcrPollOutcome, DomainError>;
}

/// Vector-index ingestion trigger (submits one ingestion job per document
/// revision, keyed by an idempotent client token).
#[async_trait]
pub trait KbIngestionTrigger: Send + Sync {
    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
        client_token: &str,
    ) -> Result<String, DomainError>;
}

/// Persists the terminal state of an `IngestJob` row and its KB-trigger
/// metadata. Implemented by `gurt-storage`.
#[async_trait]
pub trait IngestJobStore: Send + Sync {
    async fn upsert_terminal(&self, row: &TerminalIngestJobRow) -> Result<(), DomainError>;
    async fn patch_kb_result(
        &self,
        job_id: &str,
        ingestion_job_id: Option<&str>,
        ingestion_error: Option<&str>,
    ) -> Result<(), DomainError>;
}

#[derive(Debug, Clone)]
pub struct TerminalIngestJobRow {
    pub job_id: String,
    pub source_doc_id: String,
    pub course_id: String,
    pub source_key: String,
    pub status_finished: bool,
    pub text_length: usize,
    pub used_textract: bool,
    pub error: String,
}
