use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::application::distances::DistanceSelection;
use crate::application::error::HttpError;

use super::AdminState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct UpdateQuery {
    listing_id: Option<i64>,
    limit: Option<u32>,
    all: bool,
}

/// Refresh stored nearest distances. Without `listing_id` or `all`, only the
/// most recently updated listings are touched.
pub(super) async fn update(
    State(state): State<AdminState>,
    Query(query): Query<UpdateQuery>,
) -> Response {
    let selection = match DistanceSelection::from_parts(query.listing_id, query.all, query.limit) {
        Ok(selection) => selection,
        Err(err) => return HttpError::from(err).into_response(),
    };

    match state.distances.update(selection).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}
