//! Course-scoped vector retrieval: filter-first, unfiltered fallback, then
//! scope-then-fallback partitioning of results (spec §4.E).

use async_trait::async_trait;
use gurt_domain::keys::source_in_course_scope;
use gurt_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KbError {
    #[error("server misconfiguration: {0}")]
    Misconfigured(&'static str),
    #[error("knowledge base retrieval failed: {0}")]
    Retrieval(String),
}

impl From<KbError> for DomainError {
    fn from(err: KbError) -> Self {
        match err {
            KbError::Misconfigured(field) => DomainError::Misconfigured(field.to_string()),
            KbError::Retrieval(msg) => DomainError::UpstreamError(msg),
        }
    }
}

/// A single retrieval hit: grounded text plus its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbChunk {
    pub text: String,
    pub source: String,
}

/// Vector index port. `filter_course_id = None` requests an unfiltered
/// query; `Some(id)` requests the KB's own `courseId` metadata filter.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn retrieve(
        &self,
        query_text: &str,
        num_results: usize,
        filter_course_id: Option<&str>,
    ) -> Result<Vec<KbChunk>, KbError>;
}

/// `numberOfResults = clamp(k * 5, 50, 100)` (spec §4.E step 1).
pub fn num_results_for(k: usize) -> usize {
    (k.saturating_mul(5)).clamp(50, 100)
}

/// Filter-first / unfiltered-fallback query text prefix: `course:{id}\n`.
pub fn scoped_query_text(course_id: &str, query: &str) -> String {
    format!("course:{course_id}\n{query}")
}

/// Retrieve up to `k` chunks for `course_id`, preferring in-scope sources.
///
/// 1. Query with the KB's own `courseId` filter.
/// 2. If that call errors or returns zero rows, retry unfiltered.
/// 3. Partition results into in-scope vs. all valid; return the first `k`
///    in-scope rows if any exist, else the first `k` of all valid rows
///    (tolerates KB/scope drift), else empty.
pub async fn retrieve_context(
    kb: &dyn KnowledgeBase,
    course_id: &str,
    query: &str,
    k: usize,
) -> Result<Vec<KbChunk>, KbError> {
    let num_results = num_results_for(k);
    let query_text = scoped_query_text(course_id, query);

    let filtered = kb
        .retrieve(&query_text, num_results, Some(course_id))
        .await;
    let results = match filtered {
        Ok(rows) if !rows.is_empty() => rows,
        Ok(_) => {
            tracing::debug!(course_id, "filtered kb query returned 0 rows, retrying unfiltered");
            kb.retrieve(&query_text, num_results, None).await?
        }
        Err(err) => {
            tracing::debug!(course_id, %err, "filtered kb query failed, retrying unfiltered");
            kb.retrieve(&query_text, num_results, None).await?
        }
    };

    let mut scoped = Vec::new();
    let mut all_valid = Vec::new();
    for row in results {
        if row.text.trim().is_empty() {
            continue;
        }
        if source_in_course_scope(&row.source, course_id) {
            scoped.push(row.clone());
        }
        all_valid.push(row);
    }

    let context = if !scoped.is_empty() { scoped } else { all_valid };
    Ok(context.into_iter().take(k).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct StubKb {
        filtered: Vec<KbChunk>,
        unfiltered: Vec<KbChunk>,
        filtered_calls: Mutex<u32>,
    }

    #[async_trait]
    impl KnowledgeBase for StubKb {
        async fn retrieve(
            &self,
            _query_text: &str,
            _num_results: usize,
            filter_course_id: Option<&str>,
        ) -> Result<Vec<KbChunk>, KbError> {
            if filter_course_id.is_some() {
                *self.filtered_calls.lock().unwrap() += 1;
                Ok(self.filtered.clone())
            } else {
                Ok(self.unfiltered.clone())
            }
        }
    }

    fn chunk(text: &str, source: &str) -> KbChunk {
        KbChunk {
            text: text.to_string(),
            source: source.to_string(),
        }
    }

    #[test]
    fn num_results_is_clamped() {
        assert_eq!(num_results_for(1), 50);
        assert_eq!(num_results_for(8), 50);
        assert_eq!(num_results_for(30), 100);
    }

    #[tokio::test]
    async fn scope_fallback_returns_exactly_in_scope_chunks_in_order() {
        let kb = StubKb {
            filtered: vec![
                chunk("a", "s3://bucket/170880/doc1/a.pdf"),
                chunk("b", "s3://bucket/170880/doc2/b.pdf"),
                chunk("c", "s3://bucket/424242/doc1/c.pdf"),
            ],
            unfiltered: vec![],
            filtered_calls: Mutex::new(0),
        };
        let rows = retrieve_context(&kb, "170880", "q", 2).await.unwrap();
        assert_eq!(
            rows,
            vec![
                chunk("a", "s3://bucket/170880/doc1/a.pdf"),
                chunk("b", "s3://bucket/170880/doc2/b.pdf"),
            ]
        );
    }

    #[tokio::test]
    async fn falls_back_to_all_valid_when_scope_eliminates_everything() {
        let kb = StubKb {
            filtered: vec![chunk("c", "s3://bucket/424242/doc1/c.pdf")],
            unfiltered: vec![],
            filtered_calls: Mutex::new(0),
        };
        let rows = retrieve_context(&kb, "170880", "q", 5).await.unwrap();
        assert_eq!(rows, vec![chunk("c", "s3://bucket/424242/doc1/c.pdf")]);
    }

    #[tokio::test]
    async fn empty_filtered_result_retries_unfiltered() {
        let kb = StubKb {
            filtered: vec![],
            unfiltered: vec![chunk("a", "s3://bucket/170880/doc1/a.pdf")],
            filtered_calls: Mutex::new(0),
        };
        let rows = retrieve_context(&kb, "170880", "q", 5).await.unwrap();
        assert_eq!(rows, vec![chunk("a", "s3://bucket/170880/doc1/a.pdf")]);
        assert_eq!(*kb.filtered_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_text_rows_are_dropped() {
        let kb = StubKb {
            filtered: vec![chunk("   ", "s3://bucket/170880/doc1/a.pdf")],
            unfiltered: vec![],
            filtered_calls: Mutex::new(0),
        };
        let rows = retrieve_context(&kb, "170880", "q", 5).await.unwrap();
        assert!(rows.is_empty());
    }
}
