//! Per-user LMS sync fan-out (spec §4.H): courses -> assignments ->
//! materials -> one aggregate KB re-index trigger.

use std::collections::HashSet;

use gurt_canvas_client::{CanvasClient, CanvasError};
use gurt_domain::ports::ObjectStore;
use gurt_domain::{keys, CanvasMaterial, DomainError};
use gurt_ingest_workflow::finalize::KbIngestionConfig;
use gurt_ingest_workflow::ports::KbIngestionTrigger;

use crate::ports::{CanvasItemStore, CanvasMaterialStore, CourseStore};

/// Tunables resolved from spec §6 environment variables by `gurt-config`.
#[derive(Debug, Clone)]
pub struct SyncLimits {
    pub max_material_bytes: i64,
    pub max_files_per_course: usize,
    pub max_files_total: usize,
    pub allowed_content_types: HashSet<String>,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            max_material_bytes: 20_000_000,
            max_files_per_course: 5,
            max_files_total: 20,
            allowed_content_types: ["application/pdf", "text/plain"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Outcome of one user's sync (spec §4.H step 5).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutcome {
    pub courses_upserted: usize,
    pub items_upserted: usize,
    pub materials_upserted: usize,
    pub materials_mirrored: usize,
    pub kb_started: bool,
    pub kb_job_id: Option<String>,
    pub kb_error: Option<String>,
    pub failed_course_ids: Vec<String>,
}

fn content_type_allowed(limits: &SyncLimits, content_type: &str, display_name: &str) -> bool {
    if limits.allowed_content_types.contains(content_type) {
        return true;
    }
    display_name.to_lowercase().ends_with(".pdf")
}

/// Run a full sync for one user holding a `CanvasConnection`.
#[allow(clippy::too_many_arguments)]
pub async fn sync_user(
    canvas: &CanvasClient,
    object_store: &dyn ObjectStore,
    course_store: &dyn CourseStore,
    item_store: &dyn CanvasItemStore,
    material_store: &dyn CanvasMaterialStore,
    kb_trigger: &dyn KbIngestionTrigger,
    kb_config: Option<&KbIngestionConfig>,
    user_id: &str,
    limits: &SyncLimits,
) -> Result<SyncOutcome, DomainError> {
    let mut outcome = SyncOutcome::default();
    let mut failed: Vec<String> = Vec::new();

    let courses = canvas
        .fetch_active_courses()
        .await
        .map_err(canvas_error_to_domain)?;
    for course in &courses {
        course_store.upsert(user_id, course).await?;
    }
    outcome.courses_upserted = courses.len();

    for course in &courses {
        match canvas.fetch_course_assignments(&course.id).await {
            Ok(items) => {
                for item in &items {
                    item_store.upsert(user_id, item).await?;
                    outcome.items_upserted += 1;
                }
            }
            Err(CanvasError::AccessDenied { .. }) => {
                tracing::info!(course_id = %course.id, "lms_sync.assignments.access_denied");
            }
            Err(err) => {
                tracing::warn!(course_id = %course.id, %err, "lms_sync.assignments.failed");
                failed.push(course.id.clone());
            }
        }
    }

    'courses: for course in &courses {
        if limits.max_files_total > 0 && outcome.materials_upserted >= limits.max_files_total {
            break;
        }
        let files = match canvas.fetch_course_files(&course.id).await {
            Ok(files) => files,
            Err(CanvasError::AccessDenied { .. }) => {
                tracing::info!(course_id = %course.id, "lms_sync.materials.access_denied");
                continue;
            }
            Err(err) => {
                tracing::warn!(course_id = %course.id, %err, "lms_sync.materials.failed");
                if !failed.contains(&course.id) {
                    failed.push(course.id.clone());
                }
                continue;
            }
        };

        let clipped = if limits.max_files_per_course > 0 {
            &files[..files.len().min(limits.max_files_per_course)]
        } else {
            &files[..]
        };

        for file in clipped {
            if limits.max_files_total > 0 && outcome.materials_upserted >= limits.max_files_total {
                break 'courses;
            }
            if file.size_bytes > limits.max_material_bytes {
                continue;
            }
            if !content_type_allowed(limits, &file.content_type, &file.display_name) {
                continue;
            }

            let (bytes, downloaded_content_type) = match canvas.fetch_file_bytes(&file.download_url).await {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(
                        course_id = %course.id,
                        canvas_file_id = %file.canvas_file_id,
                        %err,
                        "lms_sync.material.download_failed"
                    );
                    if !failed.contains(&course.id) {
                        failed.push(course.id.clone());
                    }
                    continue;
                }
            };
            if bytes.len() as i64 > limits.max_material_bytes {
                continue;
            }

            let s3_key = keys::material_object_key(
                user_id,
                &course.id,
                &file.canvas_file_id,
                &file.display_name,
            );
            let content_type = if downloaded_content_type.is_empty() {
                file.content_type.clone()
            } else {
                downloaded_content_type
            };

            let mut metadata = std::collections::HashMap::new();
            metadata.insert("source".to_string(), "canvas".to_string());
            metadata.insert("userid".to_string(), user_id.to_string());
            metadata.insert("courseid".to_string(), course.id.clone());
            metadata.insert("canvasfileid".to_string(), file.canvas_file_id.clone());

            if let Err(err) = object_store
                .put_object(&s3_key, bytes, &content_type, metadata)
                .await
            {
                tracing::warn!(course_id = %course.id, %err, "lms_sync.material.put_failed");
                if !failed.contains(&course.id) {
                    failed.push(course.id.clone());
                }
                continue;
            }

            let material = CanvasMaterial {
                canvas_file_id: file.canvas_file_id.clone(),
                course_id: course.id.clone(),
                display_name: file.display_name.clone(),
                content_type: file.content_type.clone(),
                size_bytes: file.size_bytes,
                updated_at: file.updated_at.clone(),
                download_url: file.download_url.clone(),
                s3_key,
            };
            material_store.upsert(user_id, &material).await?;
            outcome.materials_upserted += 1;
            outcome.materials_mirrored += 1;
        }
    }

    failed.sort();
    failed.dedup();
    outcome.failed_course_ids = failed;

    if outcome.materials_mirrored > 0 {
        match kb_config {
            None => {
                outcome.kb_error = Some(
                    "server misconfiguration: KNOWLEDGE_BASE_ID and KNOWLEDGE_BASE_DATA_SOURCE_ID required"
                        .to_string(),
                );
            }
            Some(config) => {
                let client_token = uuid::Uuid::new_v4().to_string();
                match kb_trigger
                    .start_ingestion_job(&config.knowledge_base_id, &config.data_source_id, &client_token)
                    .await
                {
                    Ok(job_id) => {
                        outcome.kb_started = true;
                        outcome.kb_job_id = Some(job_id);
                    }
                    Err(err) => {
                        outcome.kb_error = Some(err.to_string());
                    }
                }
            }
        }
    }

    Ok(outcome)
}

fn canvas_error_to_domain(err: CanvasError) -> DomainError {
    match err {
        CanvasError::AccessDenied { url } => DomainError::UpstreamError(format!("canvas access denied: {url}")),
        other => DomainError::UpstreamError(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_allowlist_has_pdf_filename_escape_hatch() {
        let limits = SyncLimits::default();
        assert!(content_type_allowed(&limits, "application/pdf", "notes.pdf"));
        assert!(!content_type_allowed(&limits, "application/zip", "bundle.zip"));
        assert!(content_type_allowed(&limits, "application/zip", "Notes.PDF"));
    }
}
