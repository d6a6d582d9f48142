//! Scheduled-event entrypoint (component L): invokes §4.H for every stored
//! LMS connection, tallying totals and continuing past per-user failures.

use std::collections::HashMap;

use gurt_canvas_client::CanvasClient;
use gurt_domain::ports::ObjectStore;
use gurt_domain::DomainError;
use gurt_ingest_workflow::finalize::KbIngestionConfig;
use gurt_ingest_workflow::ports::KbIngestionTrigger;

use crate::ports::{CanvasConnectionStore, CanvasItemStore, CanvasMaterialStore, CourseStore};
use crate::sync::{sync_user, SyncLimits, SyncOutcome};

/// Aggregate result of one scheduled sync run over every stored connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduledSyncReport {
    pub users_succeeded: usize,
    pub users_failed: usize,
    pub courses_total: usize,
    pub items_total: usize,
    pub materials_total: usize,
    pub materials_mirrored_total: usize,
    pub failed_course_ids_by_user: HashMap<String, Vec<String>>,
    pub user_errors: HashMap<String, String>,
}

/// Iterate every stored connection, running a sync for each and
/// continuing on partial failure (spec §4.H component L).
#[allow(clippy::too_many_arguments)]
pub async fn run_scheduled_sync(
    connection_store: &dyn CanvasConnectionStore,
    object_store: &dyn ObjectStore,
    course_store: &dyn CourseStore,
    item_store: &dyn CanvasItemStore,
    material_store: &dyn CanvasMaterialStore,
    kb_trigger: &dyn KbIngestionTrigger,
    kb_config: Option<&KbIngestionConfig>,
    user_agent: &str,
    limits: &SyncLimits,
) -> Result<ScheduledSyncReport, DomainError> {
    let connections = connection_store.list_all().await?;
    let mut report = ScheduledSyncReport::default();

    for connection in connections {
        let user_id = connection.user_id.clone();
        let outcome = run_one_connection(
            &connection,
            object_store,
            course_store,
            item_store,
            material_store,
            kb_trigger,
            kb_config,
            user_agent,
            limits,
        )
        .await;

        match outcome {
            Ok(outcome) => {
                report.users_succeeded += 1;
                report.courses_total += outcome.courses_upserted;
                report.items_total += outcome.items_upserted;
                report.materials_total += outcome.materials_upserted;
                report.materials_mirrored_total += outcome.materials_mirrored;
                if !outcome.failed_course_ids.is_empty() {
                    report
                        .failed_course_ids_by_user
                        .insert(user_id, outcome.failed_course_ids);
                }
            }
            Err(err) => {
                tracing::error!(user_id = %user_id, %err, "lms_sync.scheduled.user_failed");
                report.users_failed += 1;
                report.user_errors.insert(user_id, err.to_string());
            }
        }
    }

    Ok(report)
}

#[allow(clippy::too_many_arguments)]
async fn run_one_connection(
    connection: &gurt_domain::CanvasConnection,
    object_store: &dyn ObjectStore,
    course_store: &dyn CourseStore,
    item_store: &dyn CanvasItemStore,
    material_store: &dyn CanvasMaterialStore,
    kb_trigger: &dyn KbIngestionTrigger,
    kb_config: Option<&KbIngestionConfig>,
    user_agent: &str,
    limits: &SyncLimits,
) -> Result<SyncOutcome, DomainError> {
    let canvas = CanvasClient::new(&connection.canvas_base_url, &connection.access_token, user_agent)
        .map_err(|err| DomainError::UpstreamError(err.to_string()))?;
    sync_user(
        &canvas,
        object_store,
        course_store,
        item_store,
        material_store,
        kb_trigger,
        kb_config,
        &connection.user_id,
        limits,
    )
    .await
}
