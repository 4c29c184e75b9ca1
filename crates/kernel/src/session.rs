//! Session management.
//!
//! Sessions live in memory by default, or in Redis when `REDIS_URL` is set.

use anyhow::{Context, Result};
use fred::prelude::*;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer, SessionStore};
use tower_sessions_redis_store::RedisStore;

use crate::config::Config;
use crate::form::csrf::{CsrfToken, ensure_csrf_token};

/// Per-request view of the session state the submission flow needs.
///
/// Handlers build this from the live session and pass it down explicitly.
#[derive(Debug, Clone)]
pub struct SessionContext {
    csrf_token: CsrfToken,
}

impl SessionContext {
    pub fn new(csrf_token: CsrfToken) -> Self {
        Self { csrf_token }
    }

    /// Load the context, issuing a CSRF token if the session has none.
    pub async fn load(session: &Session) -> Result<Self> {
        let csrf_token = ensure_csrf_token(session).await?;
        Ok(Self { csrf_token })
    }

    pub fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

/// Parse the configured SameSite policy. Unknown values fall back to strict.
pub fn same_site_policy(value: &str) -> SameSite {
    match value {
        "lax" => SameSite::Lax,
        "none" => SameSite::None,
        _ => SameSite::Strict,
    }
}

/// Apply cookie policy from configuration to a session layer.
fn configure<S: SessionStore>(store: S, config: &Config) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_secure(config.cookie_secure)
        .with_http_only(true)
        .with_same_site(same_site_policy(&config.cookie_same_site))
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            config.session_expiry_hours,
        )))
}

/// Create the session layer backed by process memory.
pub fn create_memory_session_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    configure(MemoryStore::default(), config)
}

/// Create the session layer using Redis as the backend.
pub async fn create_redis_session_layer(
    redis_url: &str,
    config: &Config,
) -> Result<SessionManagerLayer<RedisStore<Pool>>> {
    let redis_config =
        fred::prelude::Config::from_url(redis_url).context("failed to parse Redis URL")?;

    let pool = Builder::from_config(redis_config)
        .build_pool(1)
        .context("failed to create Redis pool")?;

    pool.init()
        .await
        .context("failed to connect to Redis for sessions")?;

    Ok(configure(RedisStore::new(pool), config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_site_policy() {
        assert_eq!(same_site_policy("lax"), SameSite::Lax);
        assert_eq!(same_site_policy("none"), SameSite::None);
        assert_eq!(same_site_policy("strict"), SameSite::Strict);
        assert_eq!(same_site_policy("bogus"), SameSite::Strict);
    }

    #[test]
    fn test_context_exposes_token() {
        let token = CsrfToken::generate();
        let ctx = SessionContext::new(token.clone());
        assert_eq!(ctx.csrf_token(), &token);
    }
}
