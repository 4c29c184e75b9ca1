//! Shared route helpers for page rendering.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;

use crate::error::AppResult;
use crate::form::{FieldRule, FormSubmission, InputKind, RuleTable};
use crate::state::AppState;

/// Template-facing view of one form field.
#[derive(Debug, Serialize)]
pub struct FieldView<'a> {
    pub name: &'a str,
    pub label: &'a str,
    pub required: bool,
    pub input: InputKind,
    pub placeholder: Option<&'a str>,
    pub autocomplete: Option<&'a str>,
    pub max_length: Option<u32>,
    pub options: &'a [String],
    /// Sanitized value; templates emit it with `| safe`.
    pub value: &'a str,
    pub error: Option<&'a str>,
}

impl<'a> FieldView<'a> {
    fn new(rule: &'a FieldRule, submission: &'a FormSubmission) -> Self {
        Self {
            name: &rule.name,
            label: &rule.label,
            required: rule.required,
            input: rule.input,
            placeholder: rule.placeholder.as_deref(),
            autocomplete: rule.autocomplete.as_deref(),
            max_length: rule.max_length,
            options: rule.options(),
            value: submission.value(&rule.name),
            error: submission.error(&rule.name),
        }
    }
}

/// Build field views in rule table order.
pub fn field_views<'a>(rules: &'a RuleTable, submission: &'a FormSubmission) -> Vec<FieldView<'a>> {
    rules
        .iter()
        .map(|rule| FieldView::new(rule, submission))
        .collect()
}

/// Render a template into an HTML response with the given status.
pub fn render_page(
    state: &AppState,
    template: &str,
    context: &tera::Context,
    status: StatusCode,
) -> AppResult<Response> {
    let html = state.theme().render(template, context)?;
    Ok((status, Html(html)).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_field_views_follow_rule_order() {
        let rules = RuleTable::registration().unwrap();
        let mut submission = FormSubmission::default();
        submission
            .values
            .insert("year".to_string(), "2024".to_string());
        submission
            .errors
            .insert("email".to_string(), "Please enter a valid email address".to_string());

        let views = field_views(&rules, &submission);
        let names: Vec<_> = views.iter().map(|v| v.name).collect();
        assert_eq!(
            names,
            ["firstName", "lastName", "email", "accountNumber", "year"]
        );

        assert_eq!(views[4].value, "2024");
        assert_eq!(views[4].options.len(), 5);
        assert_eq!(views[2].error, Some("Please enter a valid email address"));
        assert_eq!(views[0].value, "");
        assert!(views[0].error.is_none());
    }

    #[test]
    fn test_field_view_serializes_input_kind() {
        let rules = RuleTable::registration().unwrap();
        let submission = FormSubmission::default();
        let views = field_views(&rules, &submission);
        let json = serde_json::to_value(&views[2]).unwrap();
        assert_eq!(json["input"], "email");
    }
}
