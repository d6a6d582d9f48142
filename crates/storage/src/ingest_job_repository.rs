//! `IngestJob` persistence and the `IngestJobStore` port for
//! `gurt-ingest-workflow`.

use async_trait::async_trait;
use chrono::Utc;
use gurt_domain::{DomainError, IngestJob, IngestJobStatus};
use gurt_ingest_workflow::ports::{IngestJobStore, TerminalIngestJobRow};
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
struct JobRow {
    job_id: String,
    source_doc_id: String,
    course_id: String,
    source_key: String,
    status: String,
    text_length: i64,
    used_textract: bool,
    updated_at: chrono::DateTime<Utc>,
    error: Option<String>,
    kb_ingestion_job_id: Option<String>,
    kb_ingestion_error: Option<String>,
}

fn parse_status(value: &str) -> IngestJobStatus {
    match value {
        "FINISHED" => IngestJobStatus::Finished,
        "FAILED" => IngestJobStatus::Failed,
        _ => IngestJobStatus::Running,
    }
}

fn status_str(status: IngestJobStatus) -> &'static str {
    match status {
        IngestJobStatus::Running => "RUNNING",
        IngestJobStatus::Finished => "FINISHED",
        IngestJobStatus::Failed => "FAILED",
    }
}

impl From<JobRow> for IngestJob {
    fn from(row: JobRow) -> Self {
        Self {
            job_id: row.job_id,
            source_doc_id: row.source_doc_id,
            course_id: row.course_id,
            source_key: row.source_key,
            status: parse_status(&row.status),
            text_length: row.text_length,
            used_textract: row.used_textract,
            updated_at: row.updated_at,
            error: row.error,
            kb_ingestion_job_id: row.kb_ingestion_job_id,
            kb_ingestion_error: row.kb_ingestion_error,
        }
    }
}

#[derive(Clone)]
pub struct IngestJobRepository {
    pool: PgPool,
}

impl IngestJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<IngestJob>, DomainError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT job_id, source_doc_id, course_id, source_key, status, text_length,
                   used_textract, updated_at, error, kb_ingestion_job_id, kb_ingestion_error
            FROM ingest_jobs WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(IngestJob::from))
    }

    /// Seed a `RUNNING` row at submission time, before the background
    /// pipeline reaches `finalize` — so `GET /docs/ingest/{jobId}` has
    /// something to return while the job is in flight.
    pub async fn insert_running(
        &self,
        job_id: &str,
        source_doc_id: &str,
        course_id: &str,
        source_key: &str,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO ingest_jobs
                (job_id, source_doc_id, course_id, source_key, status, text_length, used_textract, updated_at)
            VALUES ($1, $2, $3, $4, 'RUNNING', 0, false, now())
            ON CONFLICT (job_id) DO NOTHING
            "#,
        )
        .bind(job_id)
        .bind(source_doc_id)
        .bind(course_id)
        .bind(source_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl IngestJobStore for IngestJobRepository {
    async fn upsert_terminal(&self, row: &TerminalIngestJobRow) -> Result<(), DomainError> {
        let status = status_str(if row.status_finished {
            IngestJobStatus::Finished
        } else {
            IngestJobStatus::Failed
        });
        sqlx::query(
            r#"
            INSERT INTO ingest_jobs
                (job_id, source_doc_id, course_id, source_key, status, text_length,
                 used_textract, updated_at, error)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (job_id) DO UPDATE SET
                source_doc_id = EXCLUDED.source_doc_id,
                course_id = EXCLUDED.course_id,
                source_key = EXCLUDED.source_key,
                status = EXCLUDED.status,
                text_length = EXCLUDED.text_length,
                used_textract = EXCLUDED.used_textract,
                updated_at = EXCLUDED.updated_at,
                error = EXCLUDED.error
            "#,
        )
        .bind(&row.job_id)
        .bind(&row.source_doc_id)
        .bind(&row.course_id)
        .bind(&row.source_key)
        .bind(status)
        .bind(row.text_length as i64)
        .bind(row.used_textract)
        .bind(Utc::now())
        .bind(if row.error.is_empty() { None } else { Some(&row.error) })
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn patch_kb_result(
        &self,
        job_id: &str,
        ingestion_job_id: Option<&str>,
        ingestion_error: Option<&str>,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE ingest_jobs SET kb_ingestion_job_id = $1, kb_ingestion_error = $2 WHERE job_id = $3",
        )
        .bind(ingestion_job_id)
        .bind(ingestion_error)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::unreachable_pool;

    #[tokio::test]
    async fn repository_methods_return_database_errors_without_a_live_connection() {
        let repo = IngestJobRepository::new(unreachable_pool());
        assert!(matches!(repo.get("job1").await, Err(DomainError::Database(_))));
        let row = TerminalIngestJobRow {
            job_id: "job1".to_string(),
            source_doc_id: "doc1".to_string(),
            course_id: "c1".to_string(),
            source_key: "uploads/c1/doc1/f.pdf".to_string(),
            status_finished: true,
            text_length: 100,
            used_textract: false,
            error: String::new(),
        };
        assert!(matches!(repo.upsert_terminal(&row).await, Err(DomainError::Database(_))));
        assert!(matches!(
            repo.patch_kb_result("job1", Some("kbjob"), None).await,
            Err(DomainError::Database(_))
        ));
    }
}
