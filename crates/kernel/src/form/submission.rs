//! Two-phase submission flow.
//!
//! A submission is validated first and only finalized once the user has
//! reviewed the values and posted them again with `confirmed=true`:
//!
//! ```text
//! Idle -> Validating -> AwaitingConfirmation
//!                    -> Finalized
//!                    -> Rejected   (bad CSRF token, invalid field, sink failure)
//! ```
//!
//! Finalization is not idempotent. Posting the same confirmed values twice
//! produces two registrations.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::session::SessionContext;

use super::csrf::SecurityError;
use super::rules::RuleTable;
use super::sanitize::sanitize_input;
use super::sink::{Registration, RegistrationSink};
use super::validate::{ValidationReport, validate};

/// Message shown once a registration has been finalized.
pub const SUCCESS_MESSAGE: &str =
    "Registration completed successfully! Your information has been processed.";

/// Message shown when the sink refuses a registration.
pub const PROCESSING_FAILED_MESSAGE: &str =
    "Your registration could not be processed. Please try again.";

/// Message shown when a post cannot be read as a form.
pub const UNREADABLE_SUBMISSION_MESSAGE: &str =
    "Your submission could not be read. Please fill out the form and try again.";

/// Form field carrying the CSRF token.
pub const CSRF_FIELD: &str = "csrf_token";

/// Form field carrying the confirmation flag.
pub const CONFIRMED_FIELD: &str = "confirmed";

/// States of a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    Validating,
    AwaitingConfirmation,
    Finalized,
    Rejected,
}

impl FlowState {
    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: FlowState) -> bool {
        matches!(
            (self, next),
            (FlowState::Idle, FlowState::Validating)
                | (FlowState::Validating, FlowState::AwaitingConfirmation)
                | (FlowState::Validating, FlowState::Finalized)
                | (FlowState::Validating, FlowState::Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FlowState::AwaitingConfirmation | FlowState::Finalized | FlowState::Rejected
        )
    }
}

/// Values and messages for re-displaying a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormSubmission {
    /// Sanitized values keyed by field name.
    pub values: BTreeMap<String, String>,

    /// Per-field error messages.
    pub errors: BTreeMap<String, String>,

    /// Error not tied to any field.
    pub general_error: Option<String>,
}

impl FormSubmission {
    /// Build a submission from a validation report.
    pub fn from_report(report: &ValidationReport) -> Self {
        let values = report
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect();
        let errors = report
            .errors()
            .map(|(name, msg)| (name.to_string(), msg.to_string()))
            .collect();

        Self {
            values,
            errors,
            general_error: None,
        }
    }

    /// Sanitize known fields from `raw` without validating them.
    ///
    /// Used to pre-fill a form and to preserve input when no validation ran.
    pub fn prefill(rules: &RuleTable, raw: &HashMap<String, String>) -> Self {
        let values = rules
            .iter()
            .filter_map(|rule| {
                raw.get(&rule.name)
                    .map(|v| (rule.name.clone(), sanitize_input(v)))
            })
            .filter(|(_, v)| !v.is_empty())
            .collect();

        Self {
            values,
            ..Self::default()
        }
    }

    pub fn with_general_error(mut self, message: impl Into<String>) -> Self {
        self.general_error = Some(message.into());
        self
    }

    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.general_error.is_some()
    }
}

/// A parsed form post.
#[derive(Debug, Clone, Default)]
pub struct SubmissionRequest {
    /// Data fields, raw as posted.
    pub fields: HashMap<String, String>,

    /// Submitted CSRF token, if any.
    pub csrf_token: Option<String>,

    /// True only when the post carried `confirmed=true`.
    pub confirmed: bool,
}

impl SubmissionRequest {
    /// Split a posted form into control fields and data fields.
    pub fn from_form(mut form: HashMap<String, String>) -> Self {
        let csrf_token = form.remove(CSRF_FIELD);
        let confirmed = form.remove(CONFIRMED_FIELD).as_deref() == Some("true");

        Self {
            fields: form,
            csrf_token,
            confirmed,
        }
    }
}

/// Why a submission was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// CSRF check failed; no validation was performed.
    Security(SecurityError),

    /// One or more fields failed validation.
    Validation,

    /// The sink refused the registration.
    Processing,
}

/// Terminal result of a submission.
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    Rejected {
        reason: Rejection,
        submission: FormSubmission,
    },

    /// Validation passed; the values await the user's confirmation.
    AwaitingConfirmation { submission: FormSubmission },

    /// The registration was handed to the sink. No values are retained.
    Finalized { registration_id: Uuid },
}

impl SubmissionOutcome {
    /// The state the flow ended in.
    pub fn state(&self) -> FlowState {
        match self {
            SubmissionOutcome::Rejected { .. } => FlowState::Rejected,
            SubmissionOutcome::AwaitingConfirmation { .. } => FlowState::AwaitingConfirmation,
            SubmissionOutcome::Finalized { .. } => FlowState::Finalized,
        }
    }
}

/// Drives one submission from `Idle` to a terminal state.
///
/// The flow is consumed by [`SubmissionFlow::submit`], so a single flow can
/// never be submitted twice.
pub struct SubmissionFlow<'a> {
    rules: &'a RuleTable,
    session: &'a SessionContext,
    state: FlowState,
}

impl<'a> SubmissionFlow<'a> {
    pub fn new(rules: &'a RuleTable, session: &'a SessionContext) -> Self {
        Self {
            rules,
            session,
            state: FlowState::Idle,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    fn transition(&mut self, next: FlowState) {
        if !self.state.can_transition_to(next) {
            error!(from = ?self.state, to = ?next, "refused illegal submission state transition");
            return;
        }
        debug!(from = ?self.state, to = ?next, "submission state transition");
        self.state = next;
    }

    /// Run the submission to completion.
    pub async fn submit(
        mut self,
        request: SubmissionRequest,
        sink: &dyn RegistrationSink,
    ) -> SubmissionOutcome {
        self.transition(FlowState::Validating);

        // The token gates everything else: on failure no field is checked.
        if let Err(err) = self
            .session
            .csrf_token()
            .verify(request.csrf_token.as_deref())
        {
            warn!(reason = ?err, "rejected submission with invalid CSRF token");
            self.transition(FlowState::Rejected);
            let submission = FormSubmission::prefill(self.rules, &request.fields)
                .with_general_error(err.to_string());
            return SubmissionOutcome::Rejected {
                reason: Rejection::Security(err),
                submission,
            };
        }

        let report = validate(self.rules, &request.fields);
        let submission = FormSubmission::from_report(&report);

        if !report.all_valid {
            info!(fields = ?report.failed_fields(), "submission failed validation");
            self.transition(FlowState::Rejected);
            return SubmissionOutcome::Rejected {
                reason: Rejection::Validation,
                submission,
            };
        }

        if !request.confirmed {
            self.transition(FlowState::AwaitingConfirmation);
            return SubmissionOutcome::AwaitingConfirmation { submission };
        }

        let registration = Registration::new(submission.values.clone());
        if let Err(e) = sink.accept(&registration).await {
            error!(
                error = %format!("{e:#}"),
                sink = sink.name(),
                registration_id = %registration.id,
                "failed to finalize registration"
            );
            self.transition(FlowState::Rejected);
            return SubmissionOutcome::Rejected {
                reason: Rejection::Processing,
                submission: submission.with_general_error(PROCESSING_FAILED_MESSAGE),
            };
        }

        info!(
            registration_id = %registration.id,
            sink = sink.name(),
            values = ?registration.values,
            csrf_token = %self.session.csrf_token().redacted(),
            "registration finalized"
        );
        self.transition(FlowState::Finalized);

        SubmissionOutcome::Finalized {
            registration_id: registration.id,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use FlowState::*;

        assert!(Idle.can_transition_to(Validating));
        assert!(Validating.can_transition_to(AwaitingConfirmation));
        assert!(Validating.can_transition_to(Finalized));
        assert!(Validating.can_transition_to(Rejected));

        assert!(!Idle.can_transition_to(Rejected));
        assert!(!Idle.can_transition_to(Finalized));
        assert!(!Idle.can_transition_to(AwaitingConfirmation));
        assert!(!AwaitingConfirmation.can_transition_to(Finalized));
        assert!(!Rejected.can_transition_to(Validating));
        assert!(!Finalized.can_transition_to(Idle));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!FlowState::Idle.is_terminal());
        assert!(!FlowState::Validating.is_terminal());
        assert!(FlowState::AwaitingConfirmation.is_terminal());
        assert!(FlowState::Finalized.is_terminal());
        assert!(FlowState::Rejected.is_terminal());
    }

    #[test]
    fn test_request_from_form() {
        let mut form = HashMap::new();
        form.insert("csrf_token".to_string(), "abc".to_string());
        form.insert("confirmed".to_string(), "true".to_string());
        form.insert("firstName".to_string(), "Ann".to_string());

        let request = SubmissionRequest::from_form(form);
        assert_eq!(request.csrf_token.as_deref(), Some("abc"));
        assert!(request.confirmed);
        assert_eq!(request.fields.len(), 1);
        assert!(!request.fields.contains_key("csrf_token"));
    }

    #[test]
    fn test_confirmed_requires_exact_true() {
        for value in ["false", "TRUE", "1", "yes", ""] {
            let mut form = HashMap::new();
            form.insert("confirmed".to_string(), value.to_string());
            assert!(!SubmissionRequest::from_form(form).confirmed, "{value}");
        }
        assert!(!SubmissionRequest::from_form(HashMap::new()).confirmed);
    }

    #[test]
    fn test_prefill_keeps_known_fields_only() {
        let rules = RuleTable::registration().unwrap();
        let mut raw = HashMap::new();
        raw.insert("firstName".to_string(), " <Ann> ".to_string());
        raw.insert("lastName".to_string(), "   ".to_string());
        raw.insert("unknown".to_string(), "x".to_string());

        let prefilled = FormSubmission::prefill(&rules, &raw);
        assert_eq!(prefilled.value("firstName"), "&lt;Ann&gt;");
        assert!(!prefilled.values.contains_key("lastName"));
        assert!(!prefilled.values.contains_key("unknown"));
        assert!(!prefilled.has_errors());
    }

    #[test]
    fn test_flow_starts_idle() {
        let rules = RuleTable::registration().unwrap();
        let ctx = SessionContext::new(crate::form::csrf::CsrfToken::generate());
        let flow = SubmissionFlow::new(&rules, &ctx);
        assert_eq!(flow.state(), FlowState::Idle);
    }
}
