//! Registration form: rules, validation, CSRF guard, and submission flow.
//!
//! The form system is split into:
//! - A rule table compiled from a TOML schema and shared with the browser
//! - A pure validator over raw posted values
//! - A per-session CSRF token with constant-time verification
//! - A two-phase submission flow that finalizes into a pluggable sink

pub mod csrf;
pub mod rules;
pub mod sanitize;
pub mod sink;
pub mod submission;
pub mod validate;

pub use csrf::{CsrfToken, SecurityError, ensure_csrf_token};
pub use rules::{FieldRule, InputKind, Matcher, RuleError, RuleTable};
pub use sanitize::{escape_html, sanitize_input};
pub use sink::{JsonLinesSink, LogSink, Registration, RegistrationSink};
pub use submission::{
    FlowState, FormSubmission, Rejection, SubmissionFlow, SubmissionOutcome, SubmissionRequest,
};
pub use validate::{FieldOutcome, ValidationReport, check_field, validate};
