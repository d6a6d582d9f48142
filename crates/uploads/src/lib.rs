//! Direct-upload validation and presigned-URL issuance (spec §4.M).

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gurt_domain::ports::ObjectStore;
use gurt_domain::DomainError;

const MAX_OFFICE_DOC_BYTES: i64 = 50 * 1024 * 1024;
const UPLOAD_URL_EXPIRY_SECONDS: u64 = 900;

static COURSE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid regex"));

/// The short wire-level content type tokens spec §4.M enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Pdf,
    Plain,
    Pptx,
    Docx,
    Doc,
}

impl ContentType {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pdf" => Some(Self::Pdf),
            "plain" => Some(Self::Plain),
            "pptx" => Some(Self::Pptx),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Plain => "plain",
            Self::Pptx => "pptx",
            Self::Docx => "docx",
            Self::Doc => "doc",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Plain => ".txt",
            Self::Pptx => ".pptx",
            Self::Docx => ".docx",
            Self::Doc => ".doc",
        }
    }

    fn is_office(self) -> bool {
        matches!(self, Self::Pptx | Self::Docx | Self::Doc)
    }

    /// MIME type stamped on the presigned PUT and the eventual object.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Plain => "text/plain",
            Self::Pptx => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::Doc => "application/msword",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadValidationError {
    #[error("'{0}' must be a non-empty string")]
    MissingField(&'static str),
    #[error("'courseId' must contain only letters, numbers, '.', '_' or '-'")]
    InvalidCourseId,
    #[error("'contentType' must be one of: pdf, plain, pptx, docx, doc")]
    InvalidContentType,
    #[error("'filename' must be a bare file name")]
    InvalidFilename,
    #[error("'filename' extension does not match contentType")]
    ExtensionMismatch,
    #[error("'contentLengthBytes' must be a positive integer for pptx/docx/doc uploads")]
    MissingContentLength,
    #[error("upload exceeds 50MB limit")]
    TooLarge,
}

impl From<UploadValidationError> for DomainError {
    fn from(err: UploadValidationError) -> Self {
        DomainError::Validation(err.to_string())
    }
}

/// Raw wire payload for `POST /uploads`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequestPayload {
    #[serde(rename = "courseId")]
    pub course_id: String,
    pub filename: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    #[serde(rename = "contentLengthBytes", default)]
    pub content_length_bytes: Option<i64>,
}

/// A validated upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub course_id: String,
    pub filename: String,
    pub content_type: ContentType,
    pub content_length_bytes: Option<i64>,
}

fn bare_filename(filename: &str) -> Option<&str> {
    if filename.is_empty() || filename == "." || filename == ".." {
        return None;
    }
    if filename.contains('/') || filename.contains('\\') {
        return None;
    }
    Some(filename)
}

/// Validate a raw upload payload against spec §4.M's rules.
pub fn parse_upload_request(payload: &UploadRequestPayload) -> Result<UploadRequest, UploadValidationError> {
    let course_id = payload.course_id.trim();
    if course_id.is_empty() {
        return Err(UploadValidationError::MissingField("courseId"));
    }
    if !COURSE_ID_PATTERN.is_match(course_id) {
        return Err(UploadValidationError::InvalidCourseId);
    }

    let filename = payload.filename.trim();
    if filename.is_empty() {
        return Err(UploadValidationError::MissingField("filename"));
    }
    let filename = bare_filename(filename).ok_or(UploadValidationError::InvalidFilename)?;

    let content_type_raw = payload.content_type.trim();
    if content_type_raw.is_empty() {
        return Err(UploadValidationError::MissingField("contentType"));
    }
    let content_type =
        ContentType::parse(content_type_raw).ok_or(UploadValidationError::InvalidContentType)?;

    if !filename.to_lowercase().ends_with(content_type.extension()) {
        return Err(UploadValidationError::ExtensionMismatch);
    }

    if content_type.is_office() {
        match payload.content_length_bytes {
            Some(len) if len > 0 => {
                if len > MAX_OFFICE_DOC_BYTES {
                    return Err(UploadValidationError::TooLarge);
                }
            }
            _ => return Err(UploadValidationError::MissingContentLength),
        }
    }

    Ok(UploadRequest {
        course_id: course_id.to_string(),
        filename: filename.to_string(),
        content_type,
        content_length_bytes: payload.content_length_bytes,
    })
}

/// Canonical object-store key for a direct upload: `uploads/{courseId}/{docId}/{filename}`.
pub fn build_upload_key(upload: &UploadRequest, doc_id: &str) -> String {
    gurt_domain::keys::upload_object_key(&upload.course_id, doc_id, &upload.filename)
}

/// Response body for a successful `POST /uploads`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    #[serde(rename = "docId")]
    pub doc_id: String,
    pub key: String,
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(rename = "expiresInSeconds")]
    pub expires_in_seconds: u64,
    #[serde(rename = "contentType")]
    pub content_type: &'static str,
}

/// Validate `payload`, mint a `docId`, and presign a PUT URL for the
/// canonical upload key.
pub async fn create_upload(
    payload: &UploadRequestPayload,
    object_store: &dyn ObjectStore,
) -> Result<UploadResponse, DomainError> {
    let upload = parse_upload_request(payload)?;
    let doc_id = format!("doc-{}", uuid::Uuid::new_v4());
    let key = build_upload_key(&upload, &doc_id);

    let upload_url = object_store
        .presign_put(
            &key,
            upload.content_type.mime(),
            Duration::from_secs(UPLOAD_URL_EXPIRY_SECONDS),
        )
        .await?;

    Ok(UploadResponse {
        doc_id,
        key,
        upload_url,
        expires_in_seconds: UPLOAD_URL_EXPIRY_SECONDS,
        content_type: upload.content_type.as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(course_id: &str, filename: &str, content_type: &str) -> UploadRequestPayload {
        UploadRequestPayload {
            course_id: course_id.to_string(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            content_length_bytes: None,
        }
    }

    #[test]
    fn accepts_valid_pdf_upload() {
        let req = parse_upload_request(&payload("c1", "notes.pdf", "pdf")).unwrap();
        assert_eq!(req.content_type, ContentType::Pdf);
    }

    #[test]
    fn rejects_path_separators_in_filename() {
        assert_eq!(
            parse_upload_request(&payload("c1", "../../etc/passwd", "pdf")),
            Err(UploadValidationError::InvalidFilename)
        );
    }

    #[test]
    fn rejects_mismatched_course_id_pattern() {
        assert_eq!(
            parse_upload_request(&payload("c 1", "notes.pdf", "pdf")),
            Err(UploadValidationError::InvalidCourseId)
        );
    }

    #[test]
    fn rejects_extension_mismatch() {
        assert_eq!(
            parse_upload_request(&payload("c1", "notes.docx", "pdf")),
            Err(UploadValidationError::ExtensionMismatch)
        );
    }

    #[test]
    fn office_uploads_require_positive_content_length() {
        let mut payload = payload("c1", "slides.pptx", "pptx");
        assert_eq!(
            parse_upload_request(&payload),
            Err(UploadValidationError::MissingContentLength)
        );
        payload.content_length_bytes = Some(0);
        assert_eq!(
            parse_upload_request(&payload),
            Err(UploadValidationError::MissingContentLength)
        );
        payload.content_length_bytes = Some(10);
        assert!(parse_upload_request(&payload).is_ok());
    }

    #[test]
    fn office_uploads_reject_over_50mb() {
        let mut payload = payload("c1", "slides.pptx", "pptx");
        payload.content_length_bytes = Some(51 * 1024 * 1024);
        assert_eq!(
            parse_upload_request(&payload),
            Err(UploadValidationError::TooLarge)
        );
    }

    #[test]
    fn build_upload_key_matches_canonical_layout() {
        let req = parse_upload_request(&payload("c1", "notes.pdf", "pdf")).unwrap();
        assert_eq!(build_upload_key(&req, "doc-1"), "uploads/c1/doc-1/notes.pdf");
    }
}
