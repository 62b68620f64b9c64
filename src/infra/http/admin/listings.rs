use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::application::admin::listings::ListingCommand;
use crate::application::error::HttpError;
use crate::domain::types::GeoPoint;

use super::super::invalid_request;
use super::AdminState;

const SOURCE: &str = "infra::http::admin::listings";

#[derive(Debug, Deserialize)]
pub(super) struct ListingPayload {
    title: String,
    price: i64,
    size_sqm: i32,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl ListingPayload {
    fn into_command(self) -> Result<ListingCommand, HttpError> {
        let location = match (self.lon, self.lat) {
            (Some(lon), Some(lat)) => {
                Some(GeoPoint::new(lon, lat).map_err(|err| invalid_request(SOURCE, err))?)
            }
            (None, None) => None,
            _ => {
                return Err(HttpError::new(
                    SOURCE,
                    StatusCode::BAD_REQUEST,
                    "Invalid request",
                    "lat and lon must be given together",
                ));
            }
        };
        Ok(ListingCommand {
            title: self.title,
            price: self.price,
            size_sqm: self.size_sqm,
            location,
        })
    }
}

pub(super) async fn get_listing(State(state): State<AdminState>, Path(id): Path<i64>) -> Response {
    match state.listings.find(id).await {
        Ok(listing) => Json(listing).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn create_listing(
    State(state): State<AdminState>,
    Json(payload): Json<ListingPayload>,
) -> Response {
    let command = match payload.into_command() {
        Ok(command) => command,
        Err(err) => return err.into_response(),
    };
    match state.listings.create(command).await {
        Ok(listing) => (StatusCode::CREATED, Json(listing)).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn update_listing(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(payload): Json<ListingPayload>,
) -> Response {
    let command = match payload.into_command() {
        Ok(command) => command,
        Err(err) => return err.into_response(),
    };
    match state.listings.update(id, command).await {
        Ok(listing) => Json(listing).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn delete_listing(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Response {
    match state.listings.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}
