//! Registration form routes.
//!
//! GET / renders the form, POST / runs the submission flow. Every outcome
//! renders HTML; rejected submissions re-display the form with the user's
//! input preserved.

use std::collections::HashMap;

use axum::Router;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::form::submission::{SUCCESS_MESSAGE, UNREADABLE_SUBMISSION_MESSAGE};
use crate::form::{FormSubmission, Rejection, SubmissionFlow, SubmissionOutcome, SubmissionRequest};
use crate::session::SessionContext;
use crate::state::AppState;

use super::helpers::{field_views, render_page};

/// Create the registration router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(show_form).post(submit_form))
}

/// Registration form handler.
///
/// GET /
/// - Issues the session's CSRF token if it has none
/// - Pre-fills known fields from the query string
async fn show_form(
    State(state): State<AppState>,
    session: Session,
    Query(prefill): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let ctx = SessionContext::load(&session).await?;
    let submission = FormSubmission::prefill(state.rules(), &prefill);
    render_form(&state, &ctx, &submission, StatusCode::OK)
}

/// Registration submit handler.
///
/// POST / (form data)
///
/// A body that is not a readable urlencoded form re-renders the empty form
/// with a general error.
async fn submit_form(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> AppResult<Response> {
    let ctx = SessionContext::load(&session).await?;
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "unreadable registration post");
            let submission =
                FormSubmission::default().with_general_error(UNREADABLE_SUBMISSION_MESSAGE);
            return render_form(&state, &ctx, &submission, rejection.status());
        }
    };
    let request = SubmissionRequest::from_form(form);
    debug!(confirmed = request.confirmed, "registration submitted");

    let outcome = SubmissionFlow::new(state.rules(), &ctx)
        .submit(request, state.sink())
        .await;

    match outcome {
        SubmissionOutcome::Rejected { reason, submission } => {
            let status = match reason {
                Rejection::Security(_) => StatusCode::FORBIDDEN,
                Rejection::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                Rejection::Processing => StatusCode::INTERNAL_SERVER_ERROR,
            };
            render_form(&state, &ctx, &submission, status)
        }
        SubmissionOutcome::AwaitingConfirmation { submission } => {
            let mut context = tera::Context::new();
            context.insert("fields", &field_views(state.rules(), &submission));
            context.insert("csrf_token", ctx.csrf_token().as_str());
            context.insert("general_error", &None::<String>);
            render_page(
                &state,
                "registration/review.html",
                &context,
                StatusCode::OK,
            )
        }
        SubmissionOutcome::Finalized { .. } => {
            let mut context = tera::Context::new();
            context.insert("message", SUCCESS_MESSAGE);
            context.insert("general_error", &None::<String>);
            render_page(
                &state,
                "registration/success.html",
                &context,
                StatusCode::OK,
            )
        }
    }
}

/// Render the form with values, inline errors, and any general error.
fn render_form(
    state: &AppState,
    ctx: &SessionContext,
    submission: &FormSubmission,
    status: StatusCode,
) -> AppResult<Response> {
    let mut context = tera::Context::new();
    context.insert("fields", &field_views(state.rules(), submission));
    context.insert("csrf_token", ctx.csrf_token().as_str());
    context.insert("general_error", &submission.general_error);
    context.insert("client_schema", state.client_schema());

    render_page(state, "registration/form.html", &context, status)
}
