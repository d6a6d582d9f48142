//! Shared application state: the pool, one repository per entity, and a
//! `dyn Trait` slot per out-of-scope external collaborator (spec §1).

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;

use gurt_config::AppConfig;
use gurt_domain::ports::ObjectStore;
use gurt_generation::model::LanguageModel;
use gurt_ingest_workflow::ports::{DocumentConverter, KbIngestionTrigger, OcrService, PdfTextExtractor};
use gurt_kb_retrieval::KnowledgeBase;
use gurt_storage::{
    CalendarTokenRepository, CanvasConnectionRepository, CanvasItemRepository, CanvasMaterialRepository,
    CardRepository, CourseRepository, IngestJobRepository,
};

use crate::unavailable::{
    UnavailableDocumentConverter, UnavailableKbIngestionTrigger, UnavailableKnowledgeBase, UnavailableLanguageModel,
    UnavailableOcrService, UnavailablePdfTextExtractor,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub start_time: Instant,

    pub courses: CourseRepository,
    pub canvas_items: CanvasItemRepository,
    pub canvas_materials: CanvasMaterialRepository,
    pub canvas_connections: CanvasConnectionRepository,
    pub cards: CardRepository,
    pub ingest_jobs: IngestJobRepository,
    pub calendar_tokens: CalendarTokenRepository,

    pub object_store: Arc<dyn ObjectStore>,
    pub knowledge_base: Arc<dyn KnowledgeBase>,
    pub language_model: Arc<dyn LanguageModel>,
    pub document_converter: Arc<dyn DocumentConverter>,
    pub pdf_text_extractor: Arc<dyn PdfTextExtractor>,
    pub ocr_service: Arc<dyn OcrService>,
    pub kb_ingestion_trigger: Arc<dyn KbIngestionTrigger>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig, object_store: Arc<dyn ObjectStore>) -> Self {
        Self {
            courses: CourseRepository::new(pool.clone()),
            canvas_items: CanvasItemRepository::new(pool.clone()),
            canvas_materials: CanvasMaterialRepository::new(pool.clone()),
            canvas_connections: CanvasConnectionRepository::new(pool.clone()),
            cards: CardRepository::new(pool.clone()),
            ingest_jobs: IngestJobRepository::new(pool.clone()),
            calendar_tokens: CalendarTokenRepository::new(pool.clone()),
            pool,
            config,
            start_time: Instant::now(),
            object_store,
            knowledge_base: Arc::new(UnavailableKnowledgeBase),
            language_model: Arc::new(UnavailableLanguageModel),
            document_converter: Arc::new(UnavailableDocumentConverter),
            pdf_text_extractor: Arc::new(UnavailablePdfTextExtractor),
            ocr_service: Arc::new(UnavailableOcrService),
            kb_ingestion_trigger: Arc::new(UnavailableKbIngestionTrigger),
        }
    }
}
