use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::application::distances::NearestDistanceService;
use crate::application::error::HttpError;
use crate::application::listings::ListingFeedService;
use crate::application::nearby::NearbyService;
use crate::application::proximity::ProximityCacheService;
use crate::application::repos::{HealthRepo, ListingsRepo};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
    positive_param,
};

const SOURCE: &str = "infra::http::public";

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<ListingFeedService>,
    pub nearby: Arc<NearbyService>,
    pub proximity: Arc<ProximityCacheService>,
    pub distances: Arc<NearestDistanceService>,
    pub listings: Arc<dyn ListingsRepo>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/listings.geojson", get(listings_geojson))
        .route("/api/listings/{id}/proximity", get(listing_proximity))
        .route("/api/listings/{id}/distances", get(listing_distances))
        .route("/api/nearby", get(nearby_amenities))
        .route("/_health/db", get(public_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn listings_geojson(State(state): State<HttpState>) -> Response {
    match state.feed.feature_collection().await {
        Ok(collection) => Json(collection).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn listing_proximity(State(state): State<HttpState>, Path(id): Path<i64>) -> Response {
    let listing = match state.listings.find_listing(id).await {
        Ok(Some(listing)) => listing,
        Ok(None) => {
            return HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Listing not found",
                format!("listing {id} does not exist"),
            )
            .into_response();
        }
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &err,
            )
            .into_response();
        }
    };

    match state.proximity.get_cached(&listing).await {
        Ok(ids) => Json(ids).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// Stored distances only; nothing is computed on read.
async fn listing_distances(State(state): State<HttpState>, Path(id): Path<i64>) -> Response {
    match state.distances.find(id).await {
        Ok(Some(distances)) => Json(distances).into_response(),
        Ok(None) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "No distances stored for listing",
            format!("no nearest distances stored for listing {id}"),
        )
        .into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NearbyQuery {
    location: Option<String>,
    q: Option<String>,
    radius_m: Option<String>,
    max_results: Option<String>,
}

async fn nearby_amenities(
    State(state): State<HttpState>,
    Query(query): Query<NearbyQuery>,
) -> Response {
    let input = query.location.or(query.q).unwrap_or_default();
    let radius = positive_param(query.radius_m.as_deref());
    let max_results = positive_param(query.max_results.as_deref());

    match state.nearby.lookup(&input, radius, max_results).await {
        Ok(lookup) => Json(lookup).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}
