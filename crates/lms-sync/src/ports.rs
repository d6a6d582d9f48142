//! Storage collaborator traits for the LMS mirror sync engine, implemented
//! by `gurt-storage`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gurt_domain::{CanvasConnection, DomainError};

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn upsert(&self, user_id: &str, course: &gurt_canvas_client::CourseRow) -> Result<(), DomainError>;
}

#[async_trait]
pub trait CanvasItemStore: Send + Sync {
    async fn upsert(
        &self,
        user_id: &str,
        item: &gurt_canvas_client::CanvasItemRow,
    ) -> Result<(), DomainError>;
}

#[async_trait]
pub trait CanvasMaterialStore: Send + Sync {
    async fn upsert(
        &self,
        user_id: &str,
        material: &gurt_domain::CanvasMaterial,
    ) -> Result<(), DomainError>;
}

#[async_trait]
pub trait CanvasConnectionStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<CanvasConnection>, DomainError>;
    async fn upsert(&self, connection: &CanvasConnection) -> Result<(), DomainError>;
    async fn list_all(&self) -> Result<Vec<CanvasConnection>, DomainError>;
}

/// When a review was last taken — used only to stamp `updatedAt` on
/// mirrored rows; injected so the crate stays free of a direct clock read.
pub fn now_rfc3339(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
