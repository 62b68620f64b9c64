mod admin;
mod middleware;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use public::{HttpState, build_router};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Request values that fail domain validation.
fn invalid_request(source: &'static str, err: DomainError) -> HttpError {
    HttpError::from_error(source, StatusCode::BAD_REQUEST, "Invalid request", &err)
}

/// Lenient positive integer query parameter: anything unparsable is ignored.
fn positive_param(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|parsed| *parsed > 0)
}
