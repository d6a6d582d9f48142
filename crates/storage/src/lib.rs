//! Postgres-backed storage layer: one repository per §3 entity, each
//! implementing the port trait its owning crate declared.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod calendar_token_repository;
pub mod canvas_connection_repository;
pub mod canvas_item_repository;
pub mod canvas_material_repository;
pub mod card_repository;
pub mod course_repository;
pub mod error;
pub mod ingest_job_repository;
pub mod object_store;

#[cfg(test)]
mod tests_support;

pub use calendar_token_repository::CalendarTokenRepository;
pub use canvas_connection_repository::CanvasConnectionRepository;
pub use canvas_item_repository::{CanvasItemRepository, UserScopedExamWindowSource};
pub use canvas_material_repository::CanvasMaterialRepository;
pub use card_repository::CardRepository;
pub use course_repository::CourseRepository;
pub use error::StorageError;
pub use ingest_job_repository::IngestJobRepository;
pub use object_store::LocalObjectStore;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool, StorageError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(StorageError::Connection)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(StorageError::Migration)
}

/// Check database connectivity.
pub async fn check_connection(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(StorageError::Query)?;
    Ok(())
}
