use std::num::NonZeroUsize;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::application::error::HttpError;

use super::AdminState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RecomputeQuery {
    invalidate: bool,
    concurrency: Option<NonZeroUsize>,
}

#[derive(Debug, Serialize)]
struct RemovedResponse {
    removed: u64,
}

/// Recompute every listing, optionally after clearing all rows first.
pub(super) async fn recompute(
    State(state): State<AdminState>,
    Query(query): Query<RecomputeQuery>,
) -> Response {
    if query.invalidate {
        if let Err(err) = state.proximity.invalidate_all().await {
            return HttpError::from(err).into_response();
        }
    }

    let concurrency = query.concurrency.unwrap_or(NonZeroUsize::MIN);
    match state.proximity.compute_all(concurrency).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn invalidate_all(State(state): State<AdminState>) -> Response {
    match state.proximity.invalidate_all().await {
        Ok(removed) => Json(RemovedResponse { removed }).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// Dropping a row that does not exist is a no-op, not an error.
pub(super) async fn invalidate_listing(
    State(state): State<AdminState>,
    Path(listing_id): Path<i64>,
) -> Response {
    match state.proximity.invalidate(listing_id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}
