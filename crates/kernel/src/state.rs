//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::form::{JsonLinesSink, LogSink, RegistrationSink, RuleTable};
use crate::theme::ThemeEngine;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap. Everything in here is
/// read-only after startup.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Compiled field rules.
    rules: RuleTable,

    /// Client schema JSON, serialized once for embedding in pages.
    client_schema: String,

    /// Theme engine for template rendering.
    theme: ThemeEngine,

    /// Destination for finalized registrations.
    sink: Arc<dyn RegistrationSink>,
}

impl AppState {
    /// Create application state from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let rules = RuleTable::registration().context("failed to load registration rules")?;

        let theme = match &config.templates_dir {
            Some(dir) => ThemeEngine::new(dir).context("failed to load templates")?,
            None => ThemeEngine::embedded()?,
        };

        let sink: Arc<dyn RegistrationSink> = match &config.registrations_file {
            Some(path) => Arc::new(JsonLinesSink::new(path)),
            None => Arc::new(LogSink),
        };

        info!(rules = rules.len(), sink = sink.name(), "application state ready");

        Self::from_parts(rules, theme, sink)
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        rules: RuleTable,
        theme: ThemeEngine,
        sink: Arc<dyn RegistrationSink>,
    ) -> Result<Self> {
        let client_schema = embeddable_json(&rules.client_schema())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                rules,
                client_schema,
                theme,
                sink,
            }),
        })
    }

    pub fn rules(&self) -> &RuleTable {
        &self.inner.rules
    }

    /// Client schema as JSON text safe to place inside a `<script>` element.
    pub fn client_schema(&self) -> &str {
        &self.inner.client_schema
    }

    pub fn theme(&self) -> &ThemeEngine {
        &self.inner.theme
    }

    pub fn sink(&self) -> &dyn RegistrationSink {
        self.inner.sink.as_ref()
    }
}

/// Serialize JSON so it cannot close the surrounding script element.
fn embeddable_json(value: &serde_json::Value) -> Result<String> {
    let json = serde_json::to_string(value).context("failed to serialize client schema")?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}
