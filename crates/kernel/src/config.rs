//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Redis connection URL. When None, sessions are kept in memory.
    pub redis_url: Option<String>,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "strict").
    pub cookie_same_site: String,

    /// Whether the session cookie carries the Secure attribute (default: true).
    pub cookie_secure: bool,

    /// Session inactivity expiry in hours (default: 24).
    pub session_expiry_hours: i64,

    /// Directory of Tera templates overriding the built-in ones.
    pub templates_dir: Option<PathBuf>,

    /// File that accepted registrations are appended to as JSON lines.
    pub registrations_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            redis_url: None,
            cookie_same_site: "strict".to_string(),
            cookie_secure: true,
            session_expiry_hours: 24,
            templates_dir: None,
            registrations_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let redis_url = non_empty_var("REDIS_URL");

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "strict".to_string())
            .to_lowercase();

        let cookie_secure = match env::var("COOKIE_SECURE") {
            Ok(v) => parse_bool(&v).context("COOKIE_SECURE must be true or false")?,
            Err(_) => true,
        };

        let session_expiry_hours: i64 = env::var("SESSION_EXPIRY_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .context("SESSION_EXPIRY_HOURS must be a valid integer")?;
        if session_expiry_hours <= 0 {
            bail!("SESSION_EXPIRY_HOURS must be positive");
        }

        let templates_dir = non_empty_var("TEMPLATES_DIR").map(PathBuf::from);
        let registrations_file = non_empty_var("REGISTRATIONS_FILE").map(PathBuf::from);

        Ok(Self {
            port,
            redis_url,
            cookie_same_site,
            cookie_secure,
            session_expiry_hours,
            templates_dir,
            registrations_file,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("invalid boolean: {other}"),
    }
}
