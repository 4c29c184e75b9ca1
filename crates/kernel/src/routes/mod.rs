//! HTTP route handlers.

pub mod health;
pub mod helpers;
pub mod registration;
pub mod static_files;

use axum::Router;

use crate::state::AppState;

/// Build the application router with all routes and state attached.
///
/// Session and tracing layers are added by the caller, since the session
/// store depends on configuration.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(registration::router())
        .merge(health::router())
        .merge(static_files::router())
        .with_state(state)
}
