//! Theme engine with Tera templates.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tera::Tera;
use tracing::debug;

/// Templates compiled into the binary.
const EMBEDDED_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../../../templates/base.html")),
    (
        "registration/form.html",
        include_str!("../../../../templates/registration/form.html"),
    ),
    (
        "registration/review.html",
        include_str!("../../../../templates/registration/review.html"),
    ),
    (
        "registration/success.html",
        include_str!("../../../../templates/registration/success.html"),
    ),
];

/// Characters per group when displaying an account number.
const ACCOUNT_GROUP_SIZE: usize = 4;

/// Theme engine for rendering templates.
pub struct ThemeEngine {
    /// Tera template engine instance.
    tera: Tera,
}

impl ThemeEngine {
    /// Create a theme engine from the built-in templates.
    pub fn embedded() -> Result<Self> {
        let mut tera = Self::embedded_tera()?;
        Self::register_filters(&mut tera);
        Ok(Self { tera })
    }

    /// Create a theme engine loading templates from the given directory.
    ///
    /// Templates found on disk replace built-in templates of the same name;
    /// any template the directory lacks falls back to the built-in one.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let pattern = template_dir.join("**/*.html");
        let pattern_str = pattern
            .to_str()
            .context("invalid template directory path")?;

        let mut tera = Tera::parse(pattern_str).context("failed to parse Tera templates")?;
        tera.extend(&Self::embedded_tera()?)
            .context("failed to merge built-in templates")?;

        Self::register_filters(&mut tera);

        let template_names: Vec<_> = tera.get_template_names().collect();
        debug!(
            count = template_names.len(),
            dir = %template_dir.display(),
            "loaded templates"
        );

        Ok(Self { tera })
    }

    fn embedded_tera() -> Result<Tera> {
        let mut tera = Tera::default();
        tera.add_raw_templates(EMBEDDED_TEMPLATES.to_vec())
            .context("failed to load built-in templates")?;
        Ok(tera)
    }

    /// Register custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        // Group an account number for display, e.g. ABCD-1234-EFGH
        tera.register_filter(
            "account_groups",
            |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
                let raw = tera::try_get_value!("account_groups", "value", String, value);
                Ok(tera::Value::String(group_account_number(&raw)))
            },
        );
    }

    /// Get the underlying Tera instance for custom operations.
    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    /// Render a template by name.
    pub fn render(&self, template: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(template, context)
            .with_context(|| format!("failed to render template {template}"))
    }
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine").finish()
    }
}

/// Split an account number into dash-separated groups.
///
/// Values reach templates HTML-escaped, so an entity such as `&lt;` counts as
/// a single character and is never split across groups.
pub fn group_account_number(value: &str) -> String {
    let mut units: Vec<&str> = Vec::new();
    let mut rest = value;
    while let Some(first) = rest.chars().next() {
        let len = match (first, rest.find(';')) {
            ('&', Some(end)) => end + 1,
            _ => first.len_utf8(),
        };
        let (unit, tail) = rest.split_at(len);
        units.push(unit);
        rest = tail;
    }

    units
        .chunks(ACCOUNT_GROUP_SIZE)
        .map(|chunk| chunk.concat())
        .collect::<Vec<_>>()
        .join("-")
}
