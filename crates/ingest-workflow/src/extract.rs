//! The `extract` task handler (spec §4.G).

use std::time::Duration;

use gurt_domain::ports::ObjectStore;
use gurt_domain::DomainError;

use crate::ports::{DocumentConverter, PdfTextExtractor};

const MAX_OFFICE_DOC_BYTES: usize = 50 * 1024 * 1024;
const OFFICE_CONVERSION_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_TEXTRACT_THRESHOLD: usize = 200;

#[derive(Debug, Clone)]
pub struct ExtractResult {
    pub text: String,
    pub text_length: usize,
    pub used_textract: bool,
    pub needs_textract: bool,
    /// The key OCR should read from: the original key, or a converted
    /// `.converted.pdf` sibling for office documents.
    pub textract_key: String,
}

fn office_extension(key: &str) -> Option<&'static str> {
    let lower = key.to_lowercase();
    if lower.ends_with(".pptx") {
        Some("pptx")
    } else if lower.ends_with(".docx") {
        Some("docx")
    } else if lower.ends_with(".doc") {
        Some("doc")
    } else {
        None
    }
}

fn converted_pdf_key(key: &str) -> String {
    match key.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => format!("{stem}.converted.pdf"),
        _ => format!("{key}.converted.pdf"),
    }
}

/// Read the object at `key`, convert office documents to PDF when needed,
/// and extract text — returning enough state for the orchestrator to
/// decide whether OCR is required.
pub async fn extract(
    object_store: &dyn ObjectStore,
    converter: &dyn DocumentConverter,
    pdf_extractor: &dyn PdfTextExtractor,
    key: &str,
    threshold: usize,
) -> Result<ExtractResult, DomainError> {
    let object = object_store.get_object(key).await?;

    let (extraction_bytes, extraction_key, textract_key) = if let Some(extension) = office_extension(key) {
        if object.bytes.len() > MAX_OFFICE_DOC_BYTES {
            return Err(DomainError::Validation(format!(
                "'.{extension}' exceeds 50MB limit"
            )));
        }
        let converted = tokio::time::timeout(
            OFFICE_CONVERSION_TIMEOUT,
            converter.convert_to_pdf(object.bytes, extension),
        )
        .await
        .map_err(|_| DomainError::UpstreamError(format!("{extension} conversion timed out after 90 seconds")))??;

        let converted_key = converted_pdf_key(key);
        object_store
            .put_object(&converted_key, converted.clone(), "application/pdf", Default::default())
            .await?;
        (converted, converted_key.clone(), converted_key)
    } else {
        (object.bytes, key.to_string(), key.to_string())
    };

    let text = if extraction_key.to_lowercase().ends_with(".pdf") {
        pdf_extractor.extract_text(&extraction_bytes)?
    } else {
        String::from_utf8_lossy(&extraction_bytes).to_string()
    };
    let text_length = text.len();

    Ok(ExtractResult {
        needs_textract: text.trim().len() < threshold,
        text,
        text_length,
        used_textract: false,
        textract_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converted_key_replaces_extension() {
        assert_eq!(
            converted_pdf_key("uploads/c/d/slides.pptx"),
            "uploads/c/d/slides.converted.pdf"
        );
    }

    #[test]
    fn converted_key_appends_when_no_extension() {
        assert_eq!(converted_pdf_key("uploads/c/d/slides"), "uploads/c/d/slides.converted.pdf");
    }

    #[test]
    fn office_extension_is_case_insensitive() {
        assert_eq!(office_extension("Notes.DOCX"), Some("docx"));
        assert_eq!(office_extension("notes.pdf"), None);
    }
}
