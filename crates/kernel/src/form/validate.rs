//! Field validation against the rule table.

use std::collections::HashMap;

use super::rules::{FieldRule, RuleTable};
use super::sanitize::sanitize_input;

/// Validation result for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOutcome {
    /// Field name.
    pub name: String,

    /// Sanitized value, safe to render without further escaping.
    pub value: String,

    /// `Err` carries the message to show next to the field.
    pub result: Result<(), String>,
}

impl FieldOutcome {
    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }
}

/// Per-field outcomes for a whole submission, in rule table order.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub all_valid: bool,
    pub fields: Vec<FieldOutcome>,
}

impl ValidationReport {
    /// Find the outcome for a field.
    pub fn field(&self, name: &str) -> Option<&FieldOutcome> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Iterate `(field, message)` pairs for failing fields.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter_map(|f| f.error().map(|msg| (f.name.as_str(), msg)))
    }

    /// Names of failing fields.
    pub fn failed_fields(&self) -> Vec<&str> {
        self.errors().map(|(name, _)| name).collect()
    }
}

/// Validate raw form values against every rule in the table.
///
/// Fields missing from `raw` are treated as empty. Keys in `raw` that have no
/// rule are ignored.
pub fn validate(rules: &RuleTable, raw: &HashMap<String, String>) -> ValidationReport {
    let fields: Vec<FieldOutcome> = rules
        .iter()
        .map(|rule| {
            let value = raw.get(&rule.name).map(String::as_str).unwrap_or("");
            check_field(rule, value)
        })
        .collect();

    let all_valid = fields.iter().all(FieldOutcome::is_valid);

    ValidationReport { all_valid, fields }
}

/// Validate one raw value against its rule.
///
/// The matcher sees the trimmed text; the outcome carries the escaped form.
pub fn check_field(rule: &FieldRule, raw: &str) -> FieldOutcome {
    let trimmed = raw.trim();
    let value = sanitize_input(trimmed);

    let result = if trimmed.is_empty() {
        if rule.required {
            Err(rule.required_message())
        } else {
            Ok(())
        }
    } else if rule.matcher.matches(trimmed) {
        Ok(())
    } else {
        Err(rule.message.clone())
    };

    FieldOutcome {
        name: rule.name.clone(),
        value,
        result,
    }
}
