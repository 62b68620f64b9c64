use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::application::admin::amenities::AdminAmenityError;
use crate::application::admin::config::AdminConfigError;
use crate::application::admin::listings::AdminListingError;
use crate::application::distances::DistanceError;
use crate::application::listings::ListingFeedError;
use crate::application::nearby::NearbyError;
use crate::application::proximity::ProximityError;
use crate::application::repos::RepoError;
use crate::infra::error::InfraError;

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

const MAPPER: &str = "application::error::HttpError::from";

impl From<ProximityError> for HttpError {
    fn from(error: ProximityError) -> Self {
        match &error {
            ProximityError::MissingLocation { .. } => HttpError::from_error(
                MAPPER,
                StatusCode::UNPROCESSABLE_ENTITY,
                "Listing has no location",
                &error,
            ),
            ProximityError::SpatialQuery { .. }
            | ProximityError::Persistence(_)
            | ProximityError::InvalidConfig(_) => HttpError::from_error(
                MAPPER,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &error,
            ),
        }
    }
}

impl From<NearbyError> for HttpError {
    fn from(error: NearbyError) -> Self {
        match &error {
            NearbyError::MissingInput => HttpError::from_error(
                MAPPER,
                StatusCode::BAD_REQUEST,
                "Provide a location via 'location' or 'q'",
                &error,
            ),
            NearbyError::UnparsableLocation(_) | NearbyError::InvalidCoordinates(_) => {
                HttpError::from_error(
                    MAPPER,
                    StatusCode::BAD_REQUEST,
                    "Location must be coordinates or a maps link",
                    &error,
                )
            }
            NearbyError::Config(_) | NearbyError::SpatialQuery { .. } => HttpError::from_error(
                MAPPER,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &error,
            ),
        }
    }
}

impl From<DistanceError> for HttpError {
    fn from(error: DistanceError) -> Self {
        let (status, message) = match &error {
            DistanceError::ListingNotFound(_) => (StatusCode::NOT_FOUND, "Listing not found"),
            DistanceError::MissingLocation { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Listing has no location")
            }
            DistanceError::ConflictingSelection => (
                StatusCode::BAD_REQUEST,
                "Use either listing_id or all, not both",
            ),
            DistanceError::SpatialQuery { .. }
            | DistanceError::Persistence(_)
            | DistanceError::InvalidConfig(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        HttpError::from_error(MAPPER, status, message, &error)
    }
}

impl From<ListingFeedError> for HttpError {
    fn from(error: ListingFeedError) -> Self {
        HttpError::from_error(
            MAPPER,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &error,
        )
    }
}

impl From<AdminListingError> for HttpError {
    fn from(error: AdminListingError) -> Self {
        let (status, message) = match &error {
            AdminListingError::ConstraintViolation(_) => {
                (StatusCode::BAD_REQUEST, "Listing could not be saved")
            }
            AdminListingError::NotFound(_) => (StatusCode::NOT_FOUND, "Listing not found"),
            AdminListingError::Repo(err) => repo_status(err),
            AdminListingError::Invalidation(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        HttpError::from_error(MAPPER, status, message, &error)
    }
}

impl From<AdminAmenityError> for HttpError {
    fn from(error: AdminAmenityError) -> Self {
        let (status, message) = match &error {
            AdminAmenityError::ConstraintViolation(_) => {
                (StatusCode::BAD_REQUEST, "Amenity could not be saved")
            }
            AdminAmenityError::NotFound { .. } => (StatusCode::NOT_FOUND, "Amenity not found"),
            AdminAmenityError::Repo(err) => repo_status(err),
            AdminAmenityError::Invalidation(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        HttpError::from_error(MAPPER, status, message, &error)
    }
}

impl From<AdminConfigError> for HttpError {
    fn from(error: AdminConfigError) -> Self {
        let (status, message) = match &error {
            AdminConfigError::ConstraintViolation(_) => {
                (StatusCode::BAD_REQUEST, "Configuration value out of range")
            }
            AdminConfigError::Repo(err) => repo_status(err),
        };
        HttpError::from_error(MAPPER, status, message, &error)
    }
}

fn repo_status(error: &RepoError) -> (StatusCode, &'static str) {
    match error {
        RepoError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
        RepoError::Duplicate { .. } => (StatusCode::CONFLICT, "Resource already exists"),
        RepoError::InvalidInput { .. } | RepoError::Integrity { .. } => {
            (StatusCode::BAD_REQUEST, "Request could not be processed")
        }
        RepoError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable"),
        RepoError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
    }
}

/// Failures that end the process. Rendered once by `main`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Proximity(#[from] ProximityError),
    #[error(transparent)]
    Distances(#[from] DistanceError),
    #[error("{task} failed for {failed} of {total} listings")]
    BatchFailed {
        task: &'static str,
        failed: usize,
        total: usize,
    },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::AmenityCategory;

    #[test]
    fn report_walks_the_source_chain() {
        let error = ProximityError::Persistence(RepoError::Timeout);
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &error);
        assert_eq!(
            report.messages,
            vec![
                "proximity cache storage failed: database timeout".to_string(),
                "database timeout".to_string(),
            ]
        );
    }

    #[test]
    fn missing_location_is_unprocessable() {
        let response =
            HttpError::from(ProximityError::MissingLocation { listing_id: 4 }).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }

    #[test]
    fn spatial_failure_reports_each_cause_once() {
        let error = ProximityError::SpatialQuery {
            category: AmenityCategory::Clothing,
            source: RepoError::Timeout,
        };
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &error);
        assert_eq!(
            report.messages,
            vec![
                "clothing lookup failed".to_string(),
                "database timeout".to_string(),
            ]
        );
    }

    #[test]
    fn batch_failure_names_the_counts() {
        let error = AppError::BatchFailed {
            task: "proximity recompute",
            failed: 1,
            total: 5,
        };
        assert_eq!(
            error.to_string(),
            "proximity recompute failed for 1 of 5 listings"
        );
    }

    #[test]
    fn distance_selection_conflict_is_bad_request() {
        let response = HttpError::from(DistanceError::ConflictingSelection).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = HttpError::from(DistanceError::ListingNotFound(3)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unparsable_nearby_input_is_bad_request() {
        let response =
            HttpError::from(NearbyError::UnparsableLocation("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
