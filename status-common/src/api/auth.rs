//! Signed tokens and password hashing
//!
//! # Token format
//!
//! `base64url(canonical-json(claims)) + "." + hex(sha256(canonical-json + secret))`
//!
//! Canonical JSON has keys sorted alphabetically and no whitespace, so the
//! signature is independent of serializer field order.
//!
//! # Pure Functions
//!
//! Token and password functions are pure. Secret storage lives behind the
//! `sqlx` feature; HTTP extraction lives in the server crate.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;

/// SHA-256 rounds applied to salted passwords
const PASSWORD_HASH_ROUNDS: u32 = 10_000;

/// Settings-table key holding the generated signing secret
pub const TOKEN_SECRET_KEY: &str = "token_secret";

// ========================================
// Error Types
// ========================================

/// Token validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Not two dot-separated parts, bad base64, or bad claims JSON
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Signature does not match the claims
    #[error("Invalid token signature")]
    InvalidSignature,

    /// `exp` is in the past
    #[error("Token expired at {exp} (now {now})")]
    Expired { exp: i64, now: i64 },

    /// Token is valid but of the wrong kind for this use
    #[error("Invalid token type: expected {expected}, got {actual}")]
    WrongKind { expected: TokenKind, actual: TokenKind },

    /// Database error loading the signing secret
    #[error("Database error: {0}")]
    DatabaseError(String),
}

// ========================================
// Claims
// ========================================

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "access")]
    Access,
    #[serde(rename = "refresh")]
    Refresh,
    #[serde(rename = "magic-link")]
    MagicLink,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::MagicLink => "magic-link",
        })
    }
}

/// Signed token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Team the token is scoped to (magic links and submission tokens)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Expiry, unix seconds
    pub exp: i64,
}

impl Claims {
    pub fn new(
        sub: impl Into<String>,
        kind: TokenKind,
        team_id: Option<String>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: sub.into(),
            team_id,
            kind,
            exp: now
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
        }
    }

    /// Fail unless the token is of the expected kind
    pub fn require_kind(&self, expected: TokenKind) -> Result<(), TokenError> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(TokenError::WrongKind {
                expected,
                actual: self.kind,
            })
        }
    }
}

// ========================================
// Signing and Verification
// ========================================

/// Sign claims into a token string
pub fn issue_token(claims: &Claims, secret: &str) -> String {
    // Claims always serialize to an object
    let value = serde_json::to_value(claims).unwrap_or(Value::Null);
    let canonical = to_canonical_json(&value);
    let payload = URL_SAFE_NO_PAD.encode(canonical.as_bytes());
    format!("{}.{}", payload, sign(&canonical, secret))
}

/// Check signature and expiry, returning the claims
pub fn verify_token(token: &str, secret: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
    let (payload, signature) = token
        .split_once('.')
        .ok_or_else(|| TokenError::Malformed("missing signature".to_string()))?;

    let canonical_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::Malformed(format!("payload encoding: {}", e)))?;
    let canonical = String::from_utf8(canonical_bytes)
        .map_err(|e| TokenError::Malformed(format!("payload utf-8: {}", e)))?;

    if !constant_time_eq(sign(&canonical, secret).as_bytes(), signature.as_bytes()) {
        return Err(TokenError::InvalidSignature);
    }

    let claims: Claims = serde_json::from_str(&canonical)
        .map_err(|e| TokenError::Malformed(format!("claims: {}", e)))?;

    let now = now.timestamp();
    if claims.exp <= now {
        return Err(TokenError::Expired {
            exp: claims.exp,
            now,
        });
    }

    Ok(claims)
}

fn sign(canonical: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Convert JSON to canonical form (sorted keys, no whitespace)
///
/// # Examples
///
/// ```
/// use status_common::api::auth::to_canonical_json;
/// use serde_json::json;
///
/// let canonical = to_canonical_json(&json!({"z": 3, "a": 1, "m": 2}));
/// assert_eq!(canonical, r#"{"a":1,"m":2,"z":3}"#);
/// ```
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let items: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), to_canonical_json(v)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        // serde_json's own escaping for scalars
        other => other.to_string(),
    }
}

// ========================================
// Passwords
// ========================================

/// Hash a password with a fresh random salt, returning `(hash, salt)`
pub fn hash_password(password: &str) -> (String, String) {
    let salt = random_hex(16);
    (hash_password_with_salt(password, &salt), salt)
}

/// Salted, iterated SHA-256 as 64 hex characters
pub fn hash_password_with_salt(password: &str, salt: &str) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..PASSWORD_HASH_ROUNDS {
        digest = Sha256::new()
            .chain_update(digest)
            .chain_update(salt.as_bytes())
            .finalize();
    }
    format!("{:x}", digest)
}

/// Compare a password against a stored hash and salt
pub fn verify_password(password: &str, hash: &str, salt: &str) -> bool {
    constant_time_eq(hash_password_with_salt(password, salt).as_bytes(), hash.as_bytes())
}

fn random_hex(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..bytes).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

// ========================================
// Secret Management
// ========================================

/// Load the signing secret from the settings table, generating one if absent
#[cfg(feature = "sqlx")]
pub async fn load_token_secret(db: &SqlitePool) -> Result<String, TokenError> {
    let result: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(TOKEN_SECRET_KEY)
        .fetch_optional(db)
        .await
        .map_err(|e| TokenError::DatabaseError(e.to_string()))?;

    match result {
        Some((value,)) if !value.is_empty() => Ok(value),
        _ => initialize_token_secret(db).await,
    }
}

/// Generate and store a random 256-bit signing secret
#[cfg(feature = "sqlx")]
pub async fn initialize_token_secret(db: &SqlitePool) -> Result<String, TokenError> {
    let secret = random_hex(32);

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(TOKEN_SECRET_KEY)
        .bind(&secret)
        .execute(db)
        .await
        .map_err(|e| TokenError::DatabaseError(e.to_string()))?;

    Ok(secret)
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "test-secret";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    fn access_claims() -> Claims {
        Claims::new("user-1", TokenKind::Access, None, Duration::minutes(30), now())
    }

    #[test]
    fn test_issued_token_verifies() {
        let token = issue_token(&access_claims(), SECRET);
        let claims = verify_token(&token, SECRET, now()).unwrap();
        assert_eq!(claims, access_claims());
    }

    #[test]
    fn test_team_scope_survives_signing() {
        let claims = Claims::new(
            "user-1",
            TokenKind::MagicLink,
            Some("team-1".to_string()),
            Duration::hours(72),
            now(),
        );
        let token = issue_token(&claims, SECRET);
        let verified = verify_token(&token, SECRET, now()).unwrap();
        assert_eq!(verified.team_id.as_deref(), Some("team-1"));
        assert_eq!(verified.kind, TokenKind::MagicLink);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(&access_claims(), SECRET);
        assert_eq!(
            verify_token(&token, "other-secret", now()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = issue_token(&access_claims(), SECRET);
        let (_, signature) = token.split_once('.').unwrap();
        let forged = Claims::new("admin", TokenKind::Access, None, Duration::minutes(30), now());
        let forged_payload = URL_SAFE_NO_PAD
            .encode(to_canonical_json(&serde_json::to_value(&forged).unwrap()).as_bytes());
        let tampered = format!("{}.{}", forged_payload, signature);
        assert_eq!(
            verify_token(&tampered, SECRET, now()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token(&access_claims(), SECRET);
        let later = now() + Duration::minutes(31);
        assert!(matches!(
            verify_token(&token, SECRET, later),
            Err(TokenError::Expired { .. })
        ));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert!(matches!(
            verify_token("no-dot-here", SECRET, now()),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            verify_token("!!!.abc", SECRET, now()),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_require_kind() {
        let claims = access_claims();
        assert!(claims.require_kind(TokenKind::Access).is_ok());
        assert_eq!(
            claims.require_kind(TokenKind::Refresh),
            Err(TokenError::WrongKind {
                expected: TokenKind::Refresh,
                actual: TokenKind::Access
            })
        );
    }

    #[test]
    fn test_kind_serializes_like_wire_names() {
        let json = serde_json::to_value(&access_claims()).unwrap();
        assert_eq!(json["type"], "access");
        assert!(json.get("team_id").is_none());
    }

    #[test]
    fn test_canonical_json_sorting_and_escaping() {
        let json = serde_json::json!({
            "z_field": "say \"hi\"",
            "a_field": [1, {"b": true, "a": null}],
        });
        assert_eq!(
            to_canonical_json(&json),
            r#"{"a_field":[1,{"a":null,"b":true}],"z_field":"say \"hi\""}"#
        );
    }

    #[test]
    fn test_password_round_trip() {
        let (hash, salt) = hash_password("testpass123");
        assert_eq!(hash.len(), 64);
        assert!(verify_password("testpass123", &hash, &salt));
        assert!(!verify_password("wrong", &hash, &salt));
    }

    #[test]
    fn test_password_salts_differ() {
        let (hash1, salt1) = hash_password("same");
        let (hash2, salt2) = hash_password("same");
        assert_ne!(salt1, salt2);
        assert_ne!(hash1, hash2);
    }
}
