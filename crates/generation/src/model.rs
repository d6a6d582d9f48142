//! Language-model invocation port (spec §4.F common infrastructure).

use async_trait::async_trait;
use gurt_domain::DomainError;
use serde_json::Value;

use crate::json_extract::extract_json;
use crate::safety::raise_if_guardrail_intervened;

/// A single multimodal content block sent to the model: plain text or a
/// base64-encoded document (e.g. a PDF).
#[derive(Debug, Clone)]
pub enum ContentBlock {
    Text(String),
    Base64Document { media_type: String, data: String },
}

/// A retrieved reference location, for citation reconciliation.
#[derive(Debug, Clone, Default)]
pub struct RetrievedReference {
    pub source: String,
}

/// The result of an end-to-end retrieve-and-generate call.
#[derive(Debug, Clone, Default)]
pub struct RetrieveAndGenerateResult {
    pub answer: String,
    pub citations: Vec<RetrievedReference>,
    /// The raw response payload, inspected for guardrail-intervention
    /// markers by the caller.
    pub raw: Value,
}

/// Large-language-model invocation port.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Single-turn message; returns the raw response payload so callers
    /// can check for guardrail markers before extracting content.
    async fn invoke(
        &self,
        content: Vec<ContentBlock>,
        system: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<Value, DomainError>;

    /// End-to-end KB-backed retrieve-and-generate.
    async fn retrieve_and_generate(
        &self,
        query: &str,
        system_prompt: &str,
        course_id: &str,
        use_filter: bool,
    ) -> Result<RetrieveAndGenerateResult, DomainError>;
}

/// Pull the first `type = "text"` content block's text out of a Bedrock-
/// shaped `{"content": [...]}` response payload.
fn first_text_block(payload: &Value) -> Option<&str> {
    let chunks = payload.get("content")?.as_array()?;
    if chunks.is_empty() {
        return None;
    }
    chunks
        .iter()
        .find(|c| c.get("type").and_then(Value::as_str) == Some("text"))
        .or_else(|| chunks.first())
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
}

/// Invoke the model with a single text prompt and parse its JSON response,
/// applying the guardrail check and the fallback JSON extraction chain.
pub async fn invoke_model_json(
    model: &dyn LanguageModel,
    prompt: &str,
    system: Option<&str>,
    max_tokens: u32,
) -> Result<Value, DomainError> {
    let payload = model
        .invoke(vec![ContentBlock::Text(prompt.to_string())], system, max_tokens, 0.2)
        .await?;
    raise_if_guardrail_intervened(&payload)?;

    let text = first_text_block(&payload)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| DomainError::UpstreamError("model returned non-text response".to_string()))?;

    extract_json(text).ok_or_else(|| DomainError::UpstreamError("model returned invalid JSON payload".to_string()))
}

/// Invoke the model with multimodal content blocks and parse its JSON
/// response the same way as [`invoke_model_json`].
pub async fn invoke_model_multimodal_json(
    model: &dyn LanguageModel,
    content: Vec<ContentBlock>,
    system: Option<&str>,
    max_tokens: u32,
) -> Result<Value, DomainError> {
    let payload = model.invoke(content, system, max_tokens, 0.2).await?;
    raise_if_guardrail_intervened(&payload)?;

    let text = first_text_block(&payload)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| DomainError::UpstreamError("model returned non-text response".to_string()))?;

    extract_json(text).ok_or_else(|| DomainError::UpstreamError("model returned invalid JSON payload".to_string()))
}

/// Normalize a citations array to non-empty strings, falling back to
/// `fallback` when `raw` isn't a non-empty array of strings.
pub fn normalize_citations(raw: Option<&Value>, fallback: &[String]) -> Vec<String> {
    let citations: Vec<String> = raw
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if citations.is_empty() {
        fallback.to_vec()
    } else {
        citations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_first_text_block_over_thinking_blocks() {
        let payload = json!({"content": [
            {"type": "thinking", "text": "hmm"},
            {"type": "text", "text": "{\"a\":1}"}
        ]});
        assert_eq!(first_text_block(&payload), Some("{\"a\":1}"));
    }

    #[test]
    fn falls_back_to_first_chunk_without_a_text_type() {
        let payload = json!({"content": [{"text": "hello"}]});
        assert_eq!(first_text_block(&payload), Some("hello"));
    }

    #[test]
    fn normalize_citations_falls_back_when_empty() {
        let fallback = vec!["s3://a".to_string()];
        assert_eq!(normalize_citations(Some(&json!([])), &fallback), fallback);
        assert_eq!(normalize_citations(None, &fallback), fallback);
        assert_eq!(
            normalize_citations(Some(&json!(["s3://b"])), &fallback),
            vec!["s3://b".to_string()]
        );
    }
}
