//! Filesystem-backed `ObjectStore` for local/dev use. The real uploads
//! bucket is an out-of-scope external collaborator (spec §1); this
//! adapter exists so the API binary has something concrete to run
//! against, the same way the teacher's pack handlers wrote packs to a
//! configurable local directory instead of talking to a real bucket.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use gurt_domain::ports::{ObjectStore, StoredObject};
use gurt_domain::DomainError;

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_object(&self, key: &str) -> Result<StoredObject, DomainError> {
        let path = self.path_for(key);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| DomainError::NotFound(format!("{key}: {err}")))?;
        let content_type = sniff_content_type(&path, &bytes);
        Ok(StoredObject { bytes, content_type })
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
        _metadata: HashMap<String, String>,
    ) -> Result<(), DomainError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| DomainError::Internal(err.into()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| DomainError::Internal(err.into()))?;
        Ok(())
    }

    async fn presign_put(
        &self,
        key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> Result<String, DomainError> {
        let _ = expires_in;
        Ok(format!("{}/uploads/{key}", self.public_base_url.trim_end_matches('/')))
    }
}

fn sniff_content_type(path: &Path, bytes: &[u8]) -> String {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("pdf") => "application/pdf".to_string(),
        Some("txt") => "text/plain".to_string(),
        Some("pptx") => "application/vnd.openxmlformats-officedocument.presentationml.presentation".to_string(),
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
        Some("doc") => "application/msword".to_string(),
        _ if bytes.starts_with(b"%PDF") => "application/pdf".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes_through_the_local_filesystem() {
        let dir = tempdir();
        let store = LocalObjectStore::new(dir.clone(), "http://localhost:8080");
        store
            .put_object("c1/doc1/notes.pdf", b"%PDF-1.4 hello".to_vec(), "application/pdf", HashMap::new())
            .await
            .unwrap();

        let stored = store.get_object("c1/doc1/notes.pdf").await.unwrap();
        assert_eq!(stored.bytes, b"%PDF-1.4 hello");
        assert_eq!(stored.content_type, "application/pdf");

        let url = store
            .presign_put("c1/doc1/notes.pdf", "application/pdf", Duration::from_secs(900))
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:8080/uploads/c1/doc1/notes.pdf");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let dir = tempdir();
        let store = LocalObjectStore::new(dir.clone(), "http://localhost:8080");
        assert!(matches!(
            store.get_object("missing").await,
            Err(DomainError::NotFound(_))
        ));
        let _ = std::fs::remove_dir_all(dir);
    }

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("gurt-object-store-test-{}", uuid_like()));
        dir
    }

    fn uuid_like() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        format!("{nanos}")
    }
}
