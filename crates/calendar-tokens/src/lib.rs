//! Calendar token minting, validation, and storage trait.

use std::env;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarTokenError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("revoked_at is required when revoked is true")]
    MissingRevokedAt,
    #[error("revoked_at must be omitted when revoked is false")]
    UnexpectedRevokedAt,
    #[error("updated_at must be >= created_at")]
    UpdatedBeforeCreated,
    #[error("revoked_at must be >= created_at")]
    RevokedBeforeCreated,
    #[error("revoked_at must be >= updated_at")]
    RevokedBeforeUpdated,
}

/// A minted calendar token mapping an opaque feed token to a user.
///
/// `revoked ⇔ revoked_at.is_some()`; `updated_at >= created_at`;
/// `revoked_at >= updated_at >= created_at` when present.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarTokenRecord {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl CalendarTokenRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        token: impl Into<String>,
        user_id: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        revoked: bool,
        revoked_at: Option<DateTime<Utc>>,
    ) -> Result<Self, CalendarTokenError> {
        let token = token.into();
        let user_id = user_id.into();
        if token.trim().is_empty() {
            return Err(CalendarTokenError::Empty("token"));
        }
        if user_id.trim().is_empty() {
            return Err(CalendarTokenError::Empty("user_id"));
        }
        if revoked && revoked_at.is_none() {
            return Err(CalendarTokenError::MissingRevokedAt);
        }
        if !revoked && revoked_at.is_some() {
            return Err(CalendarTokenError::UnexpectedRevokedAt);
        }
        if updated_at < created_at {
            return Err(CalendarTokenError::UpdatedBeforeCreated);
        }
        if let Some(revoked_at) = revoked_at {
            if revoked_at < created_at {
                return Err(CalendarTokenError::RevokedBeforeCreated);
            }
            if revoked_at < updated_at {
                return Err(CalendarTokenError::RevokedBeforeUpdated);
            }
        }
        Ok(Self {
            token,
            user_id,
            created_at,
            updated_at,
            revoked,
            revoked_at,
        })
    }

    /// Construct a freshly minted, unrevoked record.
    pub fn mint(token: impl Into<String>, user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::new(token, user_id, now, now, false, None)
            .expect("freshly minted record always satisfies its own invariants")
    }

    /// Return a new record marked revoked at `revoked_at`.
    pub fn revoke(&self, revoked_at: DateTime<Utc>) -> Self {
        Self::new(
            self.token.clone(),
            self.user_id.clone(),
            self.created_at,
            revoked_at,
            true,
            Some(revoked_at),
        )
        .expect("revoking preserves the record's invariants")
    }
}

/// Storage interface for calendar token records, implemented by `gurt-storage`.
#[async_trait]
pub trait CalendarTokenStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn save(&self, record: &CalendarTokenRecord) -> Result<(), Self::Error>;
    async fn get(&self, token: &str) -> Result<Option<CalendarTokenRecord>, Self::Error>;
}

#[derive(Debug, Error)]
pub enum MintingError {
    #[error("CALENDAR_TOKEN_MINTING_PATH must be 'endpoint' or 'env'")]
    InvalidPath,
    #[error("CALENDAR_TOKEN is required when CALENDAR_TOKEN_MINTING_PATH=env")]
    MissingSeededToken,
    #[error("CALENDAR_TOKEN_USER_ID does not match requested user_id")]
    SeededUserMismatch,
    #[error("user_id is required")]
    MissingUserId,
    #[error(transparent)]
    Record(#[from] CalendarTokenError),
    #[error("storage error: {0}")]
    Store(String),
}

/// Wiring that selects between endpoint-minted and environment-seeded tokens.
#[derive(Debug, Clone, Default)]
pub struct MintingConfig {
    pub path_kind: Option<TokenMintingPathValue>,
    pub seeded_token: Option<String>,
    pub seeded_user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenMintingPathValue {
    #[default]
    Endpoint,
    Env,
}

impl MintingConfig {
    pub fn from_env() -> Result<Self, MintingError> {
        let raw_path = env::var("CALENDAR_TOKEN_MINTING_PATH")
            .unwrap_or_else(|_| "endpoint".to_string());
        let path_kind = match raw_path.trim().to_lowercase().as_str() {
            "endpoint" => TokenMintingPathValue::Endpoint,
            "env" => TokenMintingPathValue::Env,
            _ => return Err(MintingError::InvalidPath),
        };
        let seeded_token = env::var("CALENDAR_TOKEN")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let seeded_user_id = env::var("CALENDAR_TOKEN_USER_ID")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(Self {
            path_kind: Some(path_kind),
            seeded_token,
            seeded_user_id,
        })
    }

    fn path(&self) -> TokenMintingPathValue {
        self.path_kind.unwrap_or_default()
    }
}

/// Generate a random URL-safe opaque token suitable for ICS feed URLs.
pub fn default_token_factory() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn resolve_seeded_token(user_id: &str, config: &MintingConfig) -> Result<String, MintingError> {
    let token = config
        .seeded_token
        .clone()
        .ok_or(MintingError::MissingSeededToken)?;
    if let Some(seeded_user) = &config.seeded_user_id {
        if seeded_user != user_id {
            return Err(MintingError::SeededUserMismatch);
        }
    }
    Ok(token)
}

/// Mint and persist a calendar token for `user_id`.
pub async fn mint_calendar_token<S: CalendarTokenStore>(
    user_id: &str,
    store: &S,
    config: &MintingConfig,
    now: DateTime<Utc>,
) -> Result<CalendarTokenRecord, MintingError> {
    mint_calendar_token_with(user_id, store, config, now, default_token_factory).await
}

/// Same as [`mint_calendar_token`] but with an injectable token factory, used
/// by tests to produce deterministic tokens.
pub async fn mint_calendar_token_with<S: CalendarTokenStore>(
    user_id: &str,
    store: &S,
    config: &MintingConfig,
    now: DateTime<Utc>,
    token_factory: impl FnOnce() -> String,
) -> Result<CalendarTokenRecord, MintingError> {
    if user_id.trim().is_empty() {
        return Err(MintingError::MissingUserId);
    }

    let token = match config.path() {
        TokenMintingPathValue::Env => resolve_seeded_token(user_id, config)?,
        TokenMintingPathValue::Endpoint => {
            let token = token_factory();
            if token.trim().is_empty() {
                return Err(MintingError::MissingSeededToken);
            }
            token
        }
    };

    let record = CalendarTokenRecord::mint(token, user_id, now);
    store
        .save(&record)
        .await
        .map_err(|e| MintingError::Store(e.to_string()))?;
    Ok(record)
}

/// Look up a token, treating revoked tokens as missing — used by the feed
/// lookup path where a revoked token must 404 just like an unknown one.
pub async fn get_active<S: CalendarTokenStore>(
    store: &S,
    token: &str,
) -> Result<Option<CalendarTokenRecord>, S::Error> {
    Ok(store
        .get(token)
        .await?
        .filter(|record| !record.revoked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn dt(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn mint_produces_unrevoked_record() {
        let record = CalendarTokenRecord::mint("tok", "user-1", dt("2026-01-01T00:00:00Z"));
        assert!(!record.revoked);
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(record.revoked_at, None);
    }

    #[test]
    fn revoke_preserves_created_at_and_sets_revoked_at() {
        let record = CalendarTokenRecord::mint("tok", "user-1", dt("2026-01-01T00:00:00Z"));
        let revoked = record.revoke(dt("2026-01-02T00:00:00Z"));
        assert!(revoked.revoked);
        assert_eq!(revoked.created_at, dt("2026-01-01T00:00:00Z"));
        assert_eq!(revoked.updated_at, dt("2026-01-02T00:00:00Z"));
        assert_eq!(revoked.revoked_at, Some(dt("2026-01-02T00:00:00Z")));
    }

    #[test]
    fn rejects_inconsistent_revoked_flag() {
        assert_eq!(
            CalendarTokenRecord::new(
                "tok",
                "user",
                dt("2026-01-01T00:00:00Z"),
                dt("2026-01-01T00:00:00Z"),
                true,
                None,
            ),
            Err(CalendarTokenError::MissingRevokedAt)
        );
    }

    #[test]
    fn rejects_revoked_at_before_updated_at() {
        assert_eq!(
            CalendarTokenRecord::new(
                "tok",
                "user",
                dt("2026-01-01T00:00:00Z"),
                dt("2026-01-03T00:00:00Z"),
                true,
                Some(dt("2026-01-02T00:00:00Z")),
            ),
            Err(CalendarTokenError::RevokedBeforeUpdated)
        );
    }

    struct InMemoryStore {
        records: Mutex<Vec<CalendarTokenRecord>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("in-memory store error")]
    struct InMemoryError;

    #[async_trait]
    impl CalendarTokenStore for InMemoryStore {
        type Error = InMemoryError;

        async fn save(&self, record: &CalendarTokenRecord) -> Result<(), Self::Error> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn get(&self, token: &str) -> Result<Option<CalendarTokenRecord>, Self::Error> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|r| r.token == token)
                .cloned())
        }
    }

    #[tokio::test]
    async fn endpoint_path_mints_a_fresh_random_token() {
        let store = InMemoryStore {
            records: Mutex::new(vec![]),
        };
        let config = MintingConfig {
            path_kind: Some(TokenMintingPathValue::Endpoint),
            ..Default::default()
        };
        let record = mint_calendar_token("user-1", &store, &config, dt("2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert!(!record.token.is_empty());
        assert_eq!(record.user_id, "user-1");
    }

    #[tokio::test]
    async fn env_path_requires_seeded_token() {
        let store = InMemoryStore {
            records: Mutex::new(vec![]),
        };
        let config = MintingConfig {
            path_kind: Some(TokenMintingPathValue::Env),
            ..Default::default()
        };
        let err = mint_calendar_token("user-1", &store, &config, dt("2026-01-01T00:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, MintingError::MissingSeededToken));
    }

    #[tokio::test]
    async fn env_path_rejects_user_mismatch() {
        let store = InMemoryStore {
            records: Mutex::new(vec![]),
        };
        let config = MintingConfig {
            path_kind: Some(TokenMintingPathValue::Env),
            seeded_token: Some("seeded-tok".to_string()),
            seeded_user_id: Some("user-a".to_string()),
        };
        let err = mint_calendar_token("user-b", &store, &config, dt("2026-01-01T00:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, MintingError::SeededUserMismatch));
    }

    #[tokio::test]
    async fn get_active_filters_out_revoked_tokens() {
        let store = InMemoryStore {
            records: Mutex::new(vec![]),
        };
        let record = CalendarTokenRecord::mint("tok", "user-1", dt("2026-01-01T00:00:00Z"));
        store.save(&record).await.unwrap();
        assert!(get_active(&store, "tok").await.unwrap().is_some());

        let revoked = record.revoke(dt("2026-01-02T00:00:00Z"));
        store.save(&revoked).await.unwrap();
        assert!(get_active(&store, "tok").await.unwrap().is_none());
    }
}
