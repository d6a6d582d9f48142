//! Port traits for external collaborators the core only consumes the
//! interface of (object store, document conversion, OCR, KB, LLM, step
//! orchestrator). No concrete cloud-vendor adapter lives in this workspace —
//! those integrations are explicitly out of scope (spec §1).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::DomainError;

/// A previously-stored object's bytes plus the content type it was put
/// under.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Binary object storage (uploads bucket). Implementations back this with
/// whatever the deployment environment provides (S3, local disk, etc.).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, key: &str) -> Result<StoredObject, DomainError>;

    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), DomainError>;

    /// A presigned PUT URL for `key`, valid for `expires_in`.
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String, DomainError>;
}
