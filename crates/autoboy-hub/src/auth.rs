// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token, session and origin checks for the hub's HTTP surface.
//!
//! WebSocket upgrades authenticate with a `?token=` query parameter (browsers
//! cannot set headers on the upgrade request). Admin endpoints use
//! `Authorization: Bearer <token>` and additionally require the admin user
//! type.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autoboy_core::document::timestamp_value;
use autoboy_core::{
    AutoboyError, Claims, Clock, DocumentStore, Filter, SessionLookup, TokenValidator, within,
};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::DateTime;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Claims carried inside an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    #[serde(default)]
    pub user_type: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// HS256 JWT validator.
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("key", &"[redacted]")
            .finish()
    }
}

impl TokenValidator for JwtValidator {
    fn validate(&self, token: &str) -> Result<Claims, AutoboyError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| AutoboyError::Unauthorized(e.to_string()))?;
        let claims = data.claims;
        if claims.user_id.is_empty() {
            return Err(AutoboyError::Unauthorized("token has no user_id".into()));
        }
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AutoboyError::Unauthorized("exp out of range".into()))?;
        Ok(Claims {
            user_id: claims.user_id,
            user_type: claims.user_type,
            expires_at,
        })
    }
}

/// Lowercase hex SHA-256 of a token, as stored in `sessions.token_hash`.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Checks tokens against the `sessions` collection so that logged-out
/// tokens stop working before they expire.
pub struct StoreSessionLookup {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl StoreSessionLookup {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            store,
            clock,
            timeout,
        }
    }
}

#[async_trait]
impl SessionLookup for StoreSessionLookup {
    async fn is_active(&self, user_id: &str, token: &str) -> bool {
        let now = timestamp_value(self.clock.now());
        let filter = Filter::eq("user_id", user_id)
            .and(Filter::eq("token_hash", hash_token(token)))
            .and(Filter::eq("is_active", true))
            .and(Filter::Or(vec![
                Filter::exists("expires_at", false),
                Filter::gt("expires_at", now),
            ]));
        match within(self.timeout, self.store.find_one("sessions", &filter)).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(user_id, "session lookup failed, denying: {e}");
                false
            }
        }
    }
}

/// Browser origin allow-list for WebSocket upgrades.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    allow_any: bool,
}

impl OriginPolicy {
    pub fn new(allowlist: &[String]) -> Self {
        Self {
            allow_any: allowlist.iter().any(|o| o == "*"),
            allowed: allowlist.iter().map(|o| o.to_ascii_lowercase()).collect(),
        }
    }

    /// Requests without an `Origin` header come from non-browser clients and
    /// are allowed.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(_) if self.allow_any => true,
            Some(origin) => {
                let origin = origin.trim_end_matches('/').to_ascii_lowercase();
                self.allowed.iter().any(|a| a.trim_end_matches('/') == origin)
            }
        }
    }
}

/// Authentication state for admin routes.
#[derive(Clone)]
pub struct AdminAuth {
    pub tokens: Arc<dyn TokenValidator>,
    pub admin_user_type: String,
}

impl std::fmt::Debug for AdminAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuth")
            .field("admin_user_type", &self.admin_user_type)
            .finish()
    }
}

/// Middleware admitting only bearer tokens of the admin user type.
///
/// Missing or invalid tokens get 401; valid non-admin tokens get 403.
pub async fn admin_middleware(
    State(auth): State<AdminAuth>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = auth.tokens.validate(token).map_err(|e| {
        debug!("admin request rejected: {e}");
        StatusCode::UNAUTHORIZED
    })?;
    if claims.user_type != auth.admin_user_type {
        debug!(user_id = %claims.user_id, "admin request from non-admin user");
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoboy_core::ManualClock;
    use autoboy_store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn mint(secret: &[u8], user_id: &str, exp: i64) -> String {
        let claims = TokenClaims {
            user_id: user_id.into(),
            user_type: "buyer".into(),
            exp,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_claims() {
        let exp = Utc::now().timestamp() + 3600;
        let claims = JwtValidator::new(SECRET)
            .validate(&mint(SECRET, "u1", exp))
            .unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.user_type, "buyer");
        assert_eq!(claims.expires_at.timestamp(), exp);
    }

    #[test]
    fn expired_forged_and_garbage_tokens_are_rejected() {
        let v = JwtValidator::new(SECRET);
        let expired = mint(SECRET, "u1", Utc::now().timestamp() - 10);
        let forged = mint(b"another-secret-another-secret!!", "u1", Utc::now().timestamp() + 60);
        for token in [expired.as_str(), forged.as_str(), "not-a-jwt", ""] {
            assert!(matches!(
                v.validate(token),
                Err(AutoboyError::Unauthorized(_))
            ));
        }
    }

    #[test]
    fn token_hash_is_hex_sha256() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn session_lookup_checks_hash_flag_and_expiry() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        for (id, token, active, expires) in [
            ("s1", "live", true, "2026-03-02T00:00:00.000Z"),
            ("s2", "revoked", false, "2026-03-02T00:00:00.000Z"),
            ("s3", "stale", true, "2026-02-01T00:00:00.000Z"),
        ] {
            store
                .insert_one(
                    "sessions",
                    json!({
                        "_id": id,
                        "user_id": "u1",
                        "token_hash": hash_token(token),
                        "is_active": active,
                        "expires_at": expires,
                    })
                    .as_object()
                    .cloned()
                    .unwrap(),
                )
                .await
                .unwrap();
        }
        let sessions = StoreSessionLookup::new(store, clock.clone(), Duration::from_secs(1));

        assert!(sessions.is_active("u1", "live").await);
        assert!(!sessions.is_active("u2", "live").await);
        assert!(!sessions.is_active("u1", "revoked").await);
        assert!(!sessions.is_active("u1", "stale").await);
        assert!(!sessions.is_active("u1", "unknown").await);

        clock.advance(chrono::Duration::days(2));
        assert!(!sessions.is_active("u1", "live").await);
    }

    #[test]
    fn origin_policy() {
        let policy = OriginPolicy::new(&["https://app.autoboy.example".to_string()]);
        assert!(policy.allows(None));
        assert!(policy.allows(Some("https://app.autoboy.example")));
        assert!(policy.allows(Some("HTTPS://APP.AUTOBOY.EXAMPLE/")));
        assert!(!policy.allows(Some("https://evil.example")));

        let open = OriginPolicy::new(&["*".to_string()]);
        assert!(open.allows(Some("https://anything.example")));

        let closed = OriginPolicy::default();
        assert!(!closed.allows(Some("https://app.autoboy.example")));
    }
}
