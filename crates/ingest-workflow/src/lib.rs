//! Document-ingestion task handlers, driven by an external step
//! orchestrator: `extract -> (OCR start/poll)? -> finalize` (spec §4.G).
//! The core owns the topology; this crate only implements each handler's
//! pre/postconditions.

pub mod extract;
pub mod finalize;
pub mod ocr;
pub mod ports;

pub use extract::{extract, ExtractResult, DEFAULT_TEXTRACT_THRESHOLD};
pub use finalize::{finalize, kb_client_token, FinalizeInput, FinalizeOutput, KbIngestionConfig};
pub use ocr::{poll_ocr, start_ocr, PollOcrResult, StartOcrResult};
pub use ports::{DocumentConverter, IngestJobStore, KbIngestionTrigger, OcrPollOutcome, OcrService, TerminalIngestJobRow, PdfTextExtractor};
