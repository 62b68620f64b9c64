use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::proximity::ProximityError;
use crate::application::repos::{
    AmenitiesWriteRepo, CreateAmenityParams, RepoError, UpdateAmenityParams,
};
use crate::cache::ProximityTrigger;
use crate::domain::entities::AmenityRecord;
use crate::domain::types::{AmenityCategory, GeoPoint};

const SOURCE: &str = "application::admin::amenities::AdminAmenityService";

#[derive(Debug, Error)]
pub enum AdminAmenityError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("{category} {id} not found")]
    NotFound { category: AmenityCategory, id: i64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("amenity saved but cache invalidation failed: {0}")]
    Invalidation(#[from] ProximityError),
}

#[derive(Debug, Clone)]
pub struct AmenityCommand {
    pub name: String,
    pub location: GeoPoint,
}

#[derive(Clone)]
pub struct AdminAmenityService {
    repo: Arc<dyn AmenitiesWriteRepo>,
    trigger: Option<Arc<ProximityTrigger>>,
}

impl AdminAmenityService {
    pub fn new(repo: Arc<dyn AmenitiesWriteRepo>) -> Self {
        Self {
            repo,
            trigger: None,
        }
    }

    pub fn with_trigger(mut self, trigger: Arc<ProximityTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub async fn find(
        &self,
        category: AmenityCategory,
        id: i64,
    ) -> Result<AmenityRecord, AdminAmenityError> {
        self.repo
            .find_amenity(category, id)
            .await?
            .ok_or(AdminAmenityError::NotFound { category, id })
    }

    pub async fn create(
        &self,
        category: AmenityCategory,
        command: AmenityCommand,
    ) -> Result<AmenityRecord, AdminAmenityError> {
        let name = validated_name(&command.name)?;
        let amenity = self
            .repo
            .create_amenity(CreateAmenityParams {
                category,
                name,
                location: command.location,
            })
            .await?;
        info!(
            target = SOURCE,
            category = category.as_str(),
            id = amenity.id,
            "amenity created"
        );

        if let Some(trigger) = &self.trigger {
            trigger.amenity_created(category, amenity.id).await?;
        }

        Ok(amenity)
    }

    pub async fn update(
        &self,
        category: AmenityCategory,
        id: i64,
        command: AmenityCommand,
    ) -> Result<AmenityRecord, AdminAmenityError> {
        let name = validated_name(&command.name)?;
        let amenity = self
            .repo
            .update_amenity(UpdateAmenityParams {
                category,
                id,
                name,
                location: command.location,
            })
            .await
            .map_err(|err| not_found_or(err, category, id))?;
        info!(target = SOURCE, category = category.as_str(), id, "amenity updated");

        if let Some(trigger) = &self.trigger {
            trigger.amenity_updated(category, id).await?;
        }

        Ok(amenity)
    }

    pub async fn delete(&self, category: AmenityCategory, id: i64) -> Result<(), AdminAmenityError> {
        self.repo
            .delete_amenity(category, id)
            .await
            .map_err(|err| not_found_or(err, category, id))?;
        info!(target = SOURCE, category = category.as_str(), id, "amenity deleted");

        if let Some(trigger) = &self.trigger {
            trigger.amenity_deleted(category, id).await?;
        }

        Ok(())
    }
}

fn not_found_or(err: RepoError, category: AmenityCategory, id: i64) -> AdminAmenityError {
    match err {
        RepoError::NotFound => AdminAmenityError::NotFound { category, id },
        other => AdminAmenityError::Repo(other),
    }
}

fn validated_name(name: &str) -> Result<String, AdminAmenityError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AdminAmenityError::ConstraintViolation("name"));
    }
    Ok(trimmed.to_string())
}
