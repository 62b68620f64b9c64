use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::application::admin::amenities::AmenityCommand;
use crate::application::error::HttpError;
use crate::domain::types::{AmenityCategory, GeoPoint};

use super::super::invalid_request;
use super::AdminState;

const SOURCE: &str = "infra::http::admin::amenities";

#[derive(Debug, Deserialize)]
pub(super) struct AmenityPayload {
    name: String,
    lat: f64,
    lon: f64,
}

impl AmenityPayload {
    fn into_command(self) -> Result<AmenityCommand, HttpError> {
        let location = GeoPoint::new(self.lon, self.lat).map_err(|err| invalid_request(SOURCE, err))?;
        Ok(AmenityCommand {
            name: self.name,
            location,
        })
    }
}

fn category(raw: &str) -> Result<AmenityCategory, HttpError> {
    AmenityCategory::try_from(raw).map_err(|err| {
        HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Unknown amenity category", &err)
    })
}

pub(super) async fn get_amenity(
    State(state): State<AdminState>,
    Path((raw_category, id)): Path<(String, i64)>,
) -> Response {
    let category = match category(&raw_category) {
        Ok(category) => category,
        Err(err) => return err.into_response(),
    };
    match state.amenities.find(category, id).await {
        Ok(amenity) => Json(amenity).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn create_amenity(
    State(state): State<AdminState>,
    Path(raw_category): Path<String>,
    Json(payload): Json<AmenityPayload>,
) -> Response {
    let parsed = category(&raw_category).and_then(|c| Ok((c, payload.into_command()?)));
    let (category, command) = match parsed {
        Ok(parsed) => parsed,
        Err(err) => return err.into_response(),
    };
    match state.amenities.create(category, command).await {
        Ok(amenity) => (StatusCode::CREATED, Json(amenity)).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn update_amenity(
    State(state): State<AdminState>,
    Path((raw_category, id)): Path<(String, i64)>,
    Json(payload): Json<AmenityPayload>,
) -> Response {
    let parsed = category(&raw_category).and_then(|c| Ok((c, payload.into_command()?)));
    let (category, command) = match parsed {
        Ok(parsed) => parsed,
        Err(err) => return err.into_response(),
    };
    match state.amenities.update(category, id, command).await {
        Ok(amenity) => Json(amenity).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn delete_amenity(
    State(state): State<AdminState>,
    Path((raw_category, id)): Path<(String, i64)>,
) -> Response {
    let category = match category(&raw_category) {
        Ok(category) => category,
        Err(err) => return err.into_response(),
    };
    match state.amenities.delete(category, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}
