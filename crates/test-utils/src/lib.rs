//! Registra test utilities.
//!
//! Fixtures for registration submissions and helpers for picking values out
//! of rendered pages.

use std::collections::HashMap;

/// Field values that satisfy every registration rule.
pub const VALID_FIELDS: [(&str, &str); 5] = [
    ("firstName", "Ann"),
    ("lastName", "Lee"),
    ("email", "a@b.com"),
    ("accountNumber", "AB12CD34EF56"),
    ("year", "2024"),
];

/// Start from a submission where every field is valid.
pub fn valid_registration() -> TestRegistration {
    TestRegistration {
        fields: VALID_FIELDS
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
        csrf_token: None,
        confirmed: None,
    }
}

/// A registration form post builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestRegistration {
    pub fields: Vec<(String, String)>,
    pub csrf_token: Option<String>,
    pub confirmed: Option<String>,
}

impl TestRegistration {
    /// Set (or replace) a field value.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
        self
    }

    /// Remove a field entirely.
    pub fn without(mut self, name: &str) -> Self {
        self.fields.retain(|(k, _)| k != name);
        self
    }

    /// Attach a CSRF token.
    pub fn with_token(mut self, token: &str) -> Self {
        self.csrf_token = Some(token.to_string());
        self
    }

    /// Set the raw `confirmed` value.
    pub fn confirmed_as(mut self, value: &str) -> Self {
        self.confirmed = Some(value.to_string());
        self
    }

    /// Mark the submission as confirmed.
    pub fn confirmed(self) -> Self {
        self.confirmed_as("true")
    }

    /// Data fields only, as a map.
    pub fn field_map(&self) -> HashMap<String, String> {
        self.fields.iter().cloned().collect()
    }

    /// Every posted field, including control fields.
    pub fn form_map(&self) -> HashMap<String, String> {
        let mut map = self.field_map();
        if let Some(token) = &self.csrf_token {
            map.insert("csrf_token".to_string(), token.clone());
        }
        if let Some(confirmed) = &self.confirmed {
            map.insert("confirmed".to_string(), confirmed.clone());
        }
        map
    }

    /// URL-encoded request body.
    pub fn form_body(&self) -> String {
        let mut pairs: Vec<(String, String)> = self.fields.clone();
        if let Some(token) = &self.csrf_token {
            pairs.push(("csrf_token".to_string(), token.clone()));
        }
        if let Some(confirmed) = &self.confirmed {
            pairs.push(("confirmed".to_string(), confirmed.clone()));
        }
        encode_pairs(&pairs)
    }
}

/// URL-encode key/value pairs as a form body.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Extract the CSRF token from a rendered form.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    extract_hidden_value(html, "csrf_token")
}

/// Extract the value of a hidden input by name.
pub fn extract_hidden_value(html: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"<input type="hidden" name="{}" value="([^"]*)""#,
        regex::escape(name)
    );
    let re = regex::Regex::new(&pattern).ok()?;
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
