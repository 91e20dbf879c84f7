//! Session token storage and JWT inspection.
//!
//! The console authenticates every request with a bearer token obtained from
//! `POST users/login`. Where that token lives is a front-end concern, so it is reached through
//! the [`SessionProvider`] capability: [`MemorySession`] for tests and embedded use,
//! [`FileSession`] for the command line.
//!
//! The token itself is a JWT. The client never verifies its signature (the backend does); it
//! only peeks at the claims to decide whether signing in again is required before calling out.

use crate::error::{LabError, LabResult};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use snplab_types::SubjectId;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Where the bearer token is kept between requests.
pub trait SessionProvider {
    fn token(&self) -> Option<String>;

    fn store(&self, token: &str) -> LabResult<()>;

    /// Forget the token; the user has to sign in again.
    fn clear(&self);

    /// The stored token, provided it has not expired at `now`.
    ///
    /// An expired or undecodable token is removed so the next attempt starts signed out.
    ///
    /// # Errors
    ///
    /// - [`LabError::MissingToken`] if nothing is stored
    /// - [`LabError::Unauthorized`] if the stored token had expired
    fn valid_token(&self, now: DateTime<Utc>) -> LabResult<String> {
        let token = self.token().ok_or(LabError::MissingToken)?;
        if is_token_expired(&token, now) {
            tracing::info!("stored session token has expired; removing it");
            self.clear();
            return Err(LabError::Unauthorized);
        }
        Ok(token)
    }

    /// Claims of the valid stored token. See [`SessionProvider::valid_token`].
    fn claims(&self, now: DateTime<Utc>) -> LabResult<Claims> {
        decode_claims(&self.valid_token(now)?)
    }
}

/// In-memory token holder.
#[derive(Debug, Default)]
pub struct MemorySession {
    token: Mutex<Option<String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl SessionProvider for MemorySession {
    fn token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn store(&self, token: &str) -> LabResult<()> {
        if let Ok(mut t) = self.token.lock() {
            *t = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) {
        if let Ok(mut t) = self.token.lock() {
            *t = None;
        }
    }
}

/// Token persisted in a single file, read on every access.
#[derive(Debug, Clone)]
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionProvider for FileSession {
    fn token(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Some(raw.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("failed to read token file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn store(&self, token: &str) -> LabResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(LabError::TokenWrite)?;
        }
        fs::write(&self.path, token.trim()).map_err(LabError::TokenWrite)
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to remove token file {}: {}", self.path.display(), e),
        }
    }
}

/// The JWT claims the console cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub id: Option<SubjectId>,
    #[serde(default)]
    pub role: Option<String>,
    /// Expiry, seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    /// Admin tokens never expire; any other token without `exp` is treated as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.is_admin() {
            return false;
        }
        match self.exp {
            Some(exp) => exp.saturating_mul(1000) < now.timestamp_millis(),
            None => true,
        }
    }
}

/// Decode the payload segment of a JWT without verifying it.
pub fn decode_claims(token: &str) -> LabResult<Claims> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| LabError::MalformedToken("missing payload segment".into()))?;

    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| LabError::MalformedToken(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| LabError::MalformedToken(e.to_string()))
}

/// Whether `token` must be replaced before use. Undecodable tokens count as expired.
pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    match decode_claims(token) {
        Ok(claims) => claims.is_expired_at(now),
        Err(e) => {
            tracing::debug!("treating undecodable token as expired: {}", e);
            true
        }
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: serde_json::Value) -> String {
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("eyJhbGciOiJIUzI1NiJ9.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn decode_claims_reads_payload() {
        let token = encode_test_token(serde_json::json!({"id": 7, "role": "user", "exp": 100}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.id, Some(SubjectId::new(7)));
        assert_eq!(claims.role.as_deref(), Some("user"));
        assert_eq!(claims.exp, Some(100));
    }

    #[test]
    fn decode_claims_rejects_malformed_tokens() {
        assert!(matches!(
            decode_claims("no-dots-here"),
            Err(LabError::MalformedToken(_))
        ));
        assert!(matches!(
            decode_claims("a.!!!.c"),
            Err(LabError::MalformedToken(_))
        ));
    }

    #[test]
    fn expiry_rules() {
        let user = encode_test_token(serde_json::json!({"role": "user", "exp": 100}));
        assert!(!is_token_expired(&user, at(99)));
        assert!(is_token_expired(&user, at(101)));

        let admin = encode_test_token(serde_json::json!({"role": "admin"}));
        assert!(!is_token_expired(&admin, at(i64::from(i32::MAX))));

        let no_exp = encode_test_token(serde_json::json!({"role": "user"}));
        assert!(is_token_expired(&no_exp, at(0)));

        assert!(is_token_expired("garbage", at(0)));
    }

    #[test]
    fn valid_token_removes_expired_tokens() {
        let token = encode_test_token(serde_json::json!({"id": 7, "role": "user", "exp": 100}));
        let session = MemorySession::with_token(token.clone());

        assert_eq!(session.valid_token(at(99)).unwrap(), token);
        assert_eq!(session.claims(at(99)).unwrap().id, Some(SubjectId::new(7)));
        assert_eq!(session.token().as_deref(), Some(token.as_str()));

        assert!(matches!(
            session.valid_token(at(101)),
            Err(LabError::Unauthorized)
        ));
        assert_eq!(session.token(), None);
        assert!(matches!(
            session.valid_token(at(0)),
            Err(LabError::MissingToken)
        ));
    }

    #[test]
    fn valid_token_removes_undecodable_tokens() {
        let session = MemorySession::with_token("not-a-jwt");
        assert!(session.valid_token(at(0)).is_err());
        assert_eq!(session.token(), None);
    }

    #[test]
    fn memory_session_store_and_clear() {
        let session = MemorySession::new();
        assert_eq!(session.token(), None);
        session.store("abc").unwrap();
        assert_eq!(session.token().as_deref(), Some("abc"));
        session.clear();
        assert_eq!(session.token(), None);
    }

    #[test]
    fn file_session_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let session = FileSession::new(dir.path().join("nested").join("token"));
        assert_eq!(session.token(), None);

        session.store(" tok.en.value \n").unwrap();
        assert_eq!(session.token().as_deref(), Some("tok.en.value"));

        session.clear();
        assert_eq!(session.token(), None);
        // clearing twice is harmless
        session.clear();
    }
}
