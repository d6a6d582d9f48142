//! Placeholder adapters for the collaborators spec §1 declares out of
//! scope (vector index, LLM, OCR service, KB ingestion trigger, office
//! conversion, step executor). The core only consumes their port traits;
//! no concrete cloud adapter lives in this workspace. These stand-ins let
//! `AppState` hold a `dyn Trait` object per port — uniformly wired,
//! uniformly erroring `Misconfigured` when a handler actually reaches
//! them — instead of threading `Option<Arc<dyn _>>` through every call
//! site.

use async_trait::async_trait;
use gurt_domain::DomainError;
use gurt_generation::model::{ContentBlock, LanguageModel, RetrieveAndGenerateResult};
use gurt_ingest_workflow::ports::{DocumentConverter, KbIngestionTrigger, OcrPollOutcome, OcrService, PdfTextExtractor};
use gurt_kb_retrieval::{KbChunk, KbError, KnowledgeBase};
use serde_json::Value;

fn misconfigured(collaborator: &'static str) -> DomainError {
    DomainError::Misconfigured(format!("{collaborator} is not wired in this deployment"))
}

pub struct UnavailableKnowledgeBase;

#[async_trait]
impl KnowledgeBase for UnavailableKnowledgeBase {
    async fn retrieve(&self, _query_text: &str, _num_results: usize, _filter_course_id: Option<&str>) -> Result<Vec<KbChunk>, KbError> {
        Err(KbError::Misconfigured("knowledge base"))
    }
}

pub struct UnavailableLanguageModel;

#[async_trait]
impl LanguageModel for UnavailableLanguageModel {
    async fn invoke(&self, _content: Vec<ContentBlock>, _system: Option<&str>, _max_tokens: u32, _temperature: f64) -> Result<Value, DomainError> {
        Err(misconfigured("the language model"))
    }

    async fn retrieve_and_generate(&self, _query: &str, _system_prompt: &str, _course_id: &str, _use_filter: bool) -> Result<RetrieveAndGenerateResult, DomainError> {
        Err(misconfigured("the language model"))
    }
}

pub struct UnavailableDocumentConverter;

#[async_trait]
impl DocumentConverter for UnavailableDocumentConverter {
    async fn convert_to_pdf(&self, _bytes: Vec<u8>, _source_extension: &str) -> Result<Vec<u8>, DomainError> {
        Err(misconfigured("the office-to-PDF converter"))
    }
}

pub struct UnavailablePdfTextExtractor;

impl PdfTextExtractor for UnavailablePdfTextExtractor {
    fn extract_text(&self, _bytes: &[u8]) -> Result<String, DomainError> {
        Err(misconfigured("the PDF text extractor"))
    }
}

pub struct UnavailableOcrService;

#[async_trait]
impl OcrService for UnavailableOcrService {
    async fn start(&self, _bucket: &str, _key: &str) -> Result<String, DomainError> {
        Err(misconfigured("the OCR service"))
    }

    async fn poll(&self, _job_id: &str) -> Result<OcrPollOutcome, DomainError> {
        Err(misconfigured("the OCR service"))
    }
}

pub struct UnavailableKbIngestionTrigger;

#[async_trait]
impl KbIngestionTrigger for UnavailableKbIngestionTrigger {
    async fn start_ingestion_job(&self, _knowledge_base_id: &str, _data_source_id: &str, _client_token: &str) -> Result<String, DomainError> {
        Err(misconfigured("the KB ingestion trigger"))
    }
}
