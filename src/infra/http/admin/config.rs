use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::application::admin::config::{
    UpdateDisplayConfigCommand, UpdateMapGenerationConfigCommand, UpdateNearbyConfigCommand,
};
use crate::application::error::HttpError;

use super::AdminState;

pub(super) async fn get_display(State(state): State<AdminState>) -> Response {
    match state.config.display().await {
        Ok(config) => Json(config).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn put_display(
    State(state): State<AdminState>,
    Json(command): Json<UpdateDisplayConfigCommand>,
) -> Response {
    match state.config.update_display(command).await {
        Ok(config) => Json(config).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn get_nearby(State(state): State<AdminState>) -> Response {
    match state.config.nearby().await {
        Ok(config) => Json(config).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn put_nearby(
    State(state): State<AdminState>,
    Json(command): Json<UpdateNearbyConfigCommand>,
) -> Response {
    match state.config.update_nearby(command).await {
        Ok(config) => Json(config).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn get_map_generation(State(state): State<AdminState>) -> Response {
    match state.config.map_generation().await {
        Ok(config) => Json(config).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn put_map_generation(
    State(state): State<AdminState>,
    Json(command): Json<UpdateMapGenerationConfigCommand>,
) -> Response {
    match state.config.update_map_generation(command).await {
        Ok(config) => Json(config).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}
