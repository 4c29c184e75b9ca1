//! Registration sinks.
//!
//! Finalization hands each accepted registration to a sink. The default sink
//! only logs; the JSON-lines sink appends to a file for deployments that want
//! a durable record.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// An accepted registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    /// Sanitized field values keyed by field name.
    pub values: BTreeMap<String, String>,
}

impl Registration {
    /// Create a registration with a fresh id and the current time.
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            submitted_at: Utc::now(),
            values,
        }
    }
}

/// Destination for finalized registrations.
#[async_trait]
pub trait RegistrationSink: Send + Sync {
    /// Accept a registration. An error aborts finalization.
    async fn accept(&self, registration: &Registration) -> Result<()>;

    /// Short name for logs (e.g., "log", "jsonl").
    fn name(&self) -> &'static str;
}

/// Sink that records registrations in the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl RegistrationSink for LogSink {
    async fn accept(&self, registration: &Registration) -> Result<()> {
        info!(
            registration_id = %registration.id,
            submitted_at = %registration.submitted_at.to_rfc3339(),
            values = ?registration.values,
            "registration received"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Sink that appends one JSON object per line to a file.
pub struct JsonLinesSink {
    path: PathBuf,
    /// Serializes appends so concurrent requests never interleave lines.
    write_lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl RegistrationSink for JsonLinesSink {
    async fn accept(&self, registration: &Registration) -> Result<()> {
        let mut line =
            serde_json::to_string(registration).context("failed to serialize registration")?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context("failed to create registrations directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open {}", self.path.display()))?;

        file.write_all(line.as_bytes())
            .await
            .context("failed to append registration")?;
        file.flush().await.context("failed to flush registration")?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

impl std::fmt::Debug for JsonLinesSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("path", &self.path)
            .finish()
    }
}
