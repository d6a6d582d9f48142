//! Pure request-shape helpers (spec §4.K): stage-prefix stripping and
//! principal extraction. Kept independent of axum's extractor plumbing so
//! the same logic is exercisable from any Lambda-shaped event with only
//! trivial field mapping, per spec §6's request envelope.
//!
//! Grounded on `runtime.py`'s `_normalized_path`/`_extract_authenticated_user_id`/
//! `_demo_user_id_from_headers`.

use std::sync::LazyLock;

use regex::Regex;

static DEMO_USER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9:_-]{1,128}$").expect("valid regex"));

/// Authorizer-shaped principal fields, as an API Gateway custom authorizer
/// would attach them to `requestContext`. A plain axum deployment has no
/// such authorizer in front of it, so these are always `None` unless a
/// caller maps them in from wherever the deployment's authorizer lives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizerContext {
    pub principal_id: Option<String>,
    pub claims_sub: Option<String>,
    pub jwt_claims_sub: Option<String>,
    pub user_arn: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Strip a single `/{stage}` prefix from `path` (spec §4.K).
pub fn normalized_path(path: &str, stage: Option<&str>) -> String {
    let Some(stage) = stage.map(str::trim).filter(|s| !s.is_empty()) else {
        return path.to_string();
    };
    let prefix = format!("/{stage}");
    if path == prefix {
        "/".to_string()
    } else if let Some(rest) = path.strip_prefix(&format!("{prefix}/")) {
        format!("/{rest}")
    } else {
        path.to_string()
    }
}

/// §4.K authorizer-chain extraction: principalId, then claims.sub, then
/// jwt.claims.sub, then an IAM identity ARN, in that order.
pub fn extract_authenticated_user_id(authorizer: &AuthorizerContext) -> Option<String> {
    non_empty(authorizer.principal_id.as_deref())
        .or_else(|| non_empty(authorizer.claims_sub.as_deref()))
        .or_else(|| non_empty(authorizer.jwt_claims_sub.as_deref()))
        .or_else(|| non_empty(authorizer.user_arn.as_deref()))
}

/// The `X-Gurt-Demo-User-Id` header value, validated against
/// `[A-Za-z0-9:_-]{1,128}`. Returns `None` for missing/invalid headers.
pub fn demo_user_id_from_header(header_value: Option<&str>) -> Option<String> {
    let raw = header_value?.trim();
    if raw.is_empty() || !DEMO_USER_ID_PATTERN.is_match(raw) {
        return None;
    }
    Some(raw.to_string())
}

/// Resolve the effective principal id: authorizer chain first; in demo
/// mode, the demo-user header, else the configured default user id. `None`
/// when outside demo mode with no authorizer-derived principal (→ 401).
pub fn resolve_principal(
    authorizer: &AuthorizerContext,
    demo_mode: bool,
    demo_user_id_header: Option<&str>,
    configured_demo_user_id: &str,
) -> Option<String> {
    if let Some(user_id) = extract_authenticated_user_id(authorizer) {
        return Some(user_id);
    }
    if !demo_mode {
        return None;
    }
    demo_user_id_from_header(demo_user_id_header).or_else(|| Some(configured_demo_user_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_path_strips_stage_prefix() {
        assert_eq!(normalized_path("/prod/courses", Some("prod")), "/courses");
        assert_eq!(normalized_path("/prod", Some("prod")), "/");
        assert_eq!(normalized_path("/courses", Some("prod")), "/courses");
        assert_eq!(normalized_path("/courses", None), "/courses");
    }

    #[test]
    fn authorizer_chain_prefers_principal_id_then_falls_through() {
        let mut ctx = AuthorizerContext::default();
        assert_eq!(extract_authenticated_user_id(&ctx), None);

        ctx.user_arn = Some("arn:aws:iam::1:user/bob".to_string());
        assert_eq!(extract_authenticated_user_id(&ctx), ctx.user_arn.clone());

        ctx.jwt_claims_sub = Some("jwt-sub".to_string());
        assert_eq!(extract_authenticated_user_id(&ctx), Some("jwt-sub".to_string()));

        ctx.claims_sub = Some("claims-sub".to_string());
        assert_eq!(extract_authenticated_user_id(&ctx), Some("claims-sub".to_string()));

        ctx.principal_id = Some("principal-1".to_string());
        assert_eq!(extract_authenticated_user_id(&ctx), Some("principal-1".to_string()));
    }

    #[test]
    fn demo_header_is_validated_against_the_id_pattern() {
        assert_eq!(demo_user_id_from_header(Some("u-1:ok_99")), Some("u-1:ok_99".to_string()));
        assert_eq!(demo_user_id_from_header(Some("bad header!")), None);
        assert_eq!(demo_user_id_from_header(None), None);
        assert_eq!(demo_user_id_from_header(Some("   ")), None);
    }

    #[test]
    fn resolve_principal_falls_back_through_demo_chain() {
        let ctx = AuthorizerContext::default();
        assert_eq!(resolve_principal(&ctx, false, None, "demo-user"), None);
        assert_eq!(resolve_principal(&ctx, true, None, "demo-user"), Some("demo-user".to_string()));
        assert_eq!(
            resolve_principal(&ctx, true, Some("hinted-1"), "demo-user"),
            Some("hinted-1".to_string())
        );
    }
}
