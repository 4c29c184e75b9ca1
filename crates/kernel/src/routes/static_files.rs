//! Static asset serving.
//!
//! The form's script and stylesheet are compiled into the binary so the
//! server has no runtime file dependencies.

use axum::Router;
use axum::extract::Path;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Embedded assets: (file name, contents).
const ASSETS: &[(&str, &str)] = &[
    (
        "registration.js",
        include_str!("../../../../static/registration.js"),
    ),
    (
        "registration.css",
        include_str!("../../../../static/registration.css"),
    ),
];

/// Create the static files router.
pub fn router() -> Router<AppState> {
    Router::new().route("/static/{file}", get(serve_static))
}

/// Serve an embedded asset.
async fn serve_static(Path(file): Path<String>) -> AppResult<Response> {
    let Some((name, body)) = ASSETS.iter().find(|(name, _)| *name == file) else {
        return Err(AppError::NotFound);
    };

    Ok((
        [
            (header::CONTENT_TYPE, mime_from_name(name)),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        *body,
    )
        .into_response())
}

fn mime_from_name(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js") => "application/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        _ => "application/octet-stream",
    }
}
