//! CSRF token generation and verification.
//!
//! One token is issued per session and reused by every form rendered in that
//! session. Replacing it would invalidate forms already open in other tabs.

use anyhow::{Context, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tower_sessions::Session;

/// Session key for storing the CSRF token.
const CSRF_SESSION_KEY: &str = "csrf_token";

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Characters of the token kept in log output.
const LOG_PREFIX_LEN: usize = 16;

/// Anti-forgery check failures.
///
/// Both variants show the user the same text; the variant only matters in
/// logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("Security token validation failed. Please refresh the page and try again.")]
    MissingToken,

    #[error("Security token validation failed. Please refresh the page and try again.")]
    TokenMismatch,
}

/// A session's anti-forgery token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Generate a fresh random token, hex encoded.
    pub fn generate() -> Self {
        let mut random_bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut random_bytes);
        Self(hex::encode(random_bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check a submitted token against this one in constant time.
    pub fn verify(&self, submitted: Option<&str>) -> Result<(), SecurityError> {
        let submitted = match submitted {
            Some(s) if !s.is_empty() => s,
            _ => return Err(SecurityError::MissingToken),
        };

        if bool::from(self.0.as_bytes().ct_eq(submitted.as_bytes())) {
            Ok(())
        } else {
            Err(SecurityError::TokenMismatch)
        }
    }

    /// Shortened form for log output.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(LOG_PREFIX_LEN).collect();
        format!("{prefix}...")
    }
}

impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CsrfToken").field(&self.redacted()).finish()
    }
}

/// Return the session's CSRF token, issuing one if the session has none.
pub async fn ensure_csrf_token(session: &Session) -> Result<CsrfToken> {
    let existing: Option<CsrfToken> = session
        .get(CSRF_SESSION_KEY)
        .await
        .context("failed to read CSRF token from session")?;

    if let Some(token) = existing {
        return Ok(token);
    }

    let token = CsrfToken::generate();
    session
        .insert(CSRF_SESSION_KEY, &token)
        .await
        .context("failed to store CSRF token")?;

    tracing::debug!(token = %token.redacted(), "issued CSRF token");

    Ok(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[test]
    fn test_token_format() {
        let token = CsrfToken::generate();
        assert_eq!(token.as_str().len(), 64);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(CsrfToken::generate(), CsrfToken::generate());
    }

    #[test]
    fn test_verify_accepts_exact_match() {
        let token = CsrfToken::generate();
        let copy = token.as_str().to_string();
        assert_eq!(token.verify(Some(&copy)), Ok(()));
    }

    #[test]
    fn test_verify_rejects_missing_and_empty() {
        let token = CsrfToken::generate();
        assert_eq!(token.verify(None), Err(SecurityError::MissingToken));
        assert_eq!(token.verify(Some("")), Err(SecurityError::MissingToken));
    }

    #[test]
    fn test_verify_rejects_single_char_difference() {
        let token = CsrfToken::generate();
        let mut tampered: Vec<char> = token.as_str().chars().collect();
        tampered[10] = if tampered[10] == 'a' { 'b' } else { 'a' };
        let tampered: String = tampered.into_iter().collect();
        assert_eq!(
            token.verify(Some(&tampered)),
            Err(SecurityError::TokenMismatch)
        );
    }

    #[test]
    fn test_verify_rejects_prefix_and_extension() {
        let token = CsrfToken::generate();
        let prefix = &token.as_str()[..63];
        let extended = format!("{}0", token.as_str());
        assert_eq!(
            token.verify(Some(prefix)),
            Err(SecurityError::TokenMismatch)
        );
        assert_eq!(
            token.verify(Some(&extended)),
            Err(SecurityError::TokenMismatch)
        );
    }

    #[test]
    fn test_redacted_keeps_prefix_only() {
        let token = CsrfToken::generate();
        let redacted = token.redacted();
        assert_eq!(redacted.len(), 19);
        assert!(redacted.ends_with("..."));
        assert!(token.as_str().starts_with(&redacted[..16]));
        assert!(!format!("{token:?}").contains(token.as_str()));
    }

    #[tokio::test]
    async fn test_ensure_token_is_stable_per_session() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let first = ensure_csrf_token(&session).await.unwrap();
        let second = ensure_csrf_token(&session).await.unwrap();
        assert_eq!(first, second);
    }
}
