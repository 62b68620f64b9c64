use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::proximity::ProximityError;
use crate::application::repos::{
    CreateListingParams, ListingsRepo, ListingsWriteRepo, RepoError, UpdateListingParams,
};
use crate::cache::ProximityTrigger;
use crate::domain::entities::ListingRecord;
use crate::domain::types::GeoPoint;

const SOURCE: &str = "application::admin::listings::AdminListingService";

#[derive(Debug, Error)]
pub enum AdminListingError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("listing {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("listing saved but cache invalidation failed: {0}")]
    Invalidation(#[from] ProximityError),
}

#[derive(Debug, Clone)]
pub struct ListingCommand {
    pub title: String,
    pub price: i64,
    pub size_sqm: i32,
    pub location: Option<GeoPoint>,
}

#[derive(Clone)]
pub struct AdminListingService {
    reader: Arc<dyn ListingsRepo>,
    writer: Arc<dyn ListingsWriteRepo>,
    trigger: Option<Arc<ProximityTrigger>>,
}

impl AdminListingService {
    pub fn new(reader: Arc<dyn ListingsRepo>, writer: Arc<dyn ListingsWriteRepo>) -> Self {
        Self {
            reader,
            writer,
            trigger: None,
        }
    }

    pub fn with_trigger(mut self, trigger: Arc<ProximityTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub async fn find(&self, id: i64) -> Result<ListingRecord, AdminListingError> {
        self.reader
            .find_listing(id)
            .await?
            .ok_or(AdminListingError::NotFound(id))
    }

    pub async fn create(&self, command: ListingCommand) -> Result<ListingRecord, AdminListingError> {
        validate(&command)?;
        let listing = self
            .writer
            .create_listing(CreateListingParams {
                title: command.title.trim().to_string(),
                price: command.price,
                size_sqm: command.size_sqm,
                location: command.location,
            })
            .await?;
        info!(target = SOURCE, listing_id = listing.id, "listing created");

        if let Some(trigger) = &self.trigger {
            trigger.listing_created(listing.id).await?;
        }

        Ok(listing)
    }

    pub async fn update(
        &self,
        id: i64,
        command: ListingCommand,
    ) -> Result<ListingRecord, AdminListingError> {
        validate(&command)?;
        let listing = self
            .writer
            .update_listing(UpdateListingParams {
                id,
                title: command.title.trim().to_string(),
                price: command.price,
                size_sqm: command.size_sqm,
                location: command.location,
            })
            .await
            .map_err(|err| match err {
                RepoError::NotFound => AdminListingError::NotFound(id),
                other => AdminListingError::Repo(other),
            })?;
        info!(target = SOURCE, listing_id = id, "listing updated");

        if let Some(trigger) = &self.trigger {
            trigger.listing_updated(id).await?;
        }

        Ok(listing)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AdminListingError> {
        self.writer
            .delete_listing(id)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => AdminListingError::NotFound(id),
                other => AdminListingError::Repo(other),
            })?;
        info!(target = SOURCE, listing_id = id, "listing deleted");

        if let Some(trigger) = &self.trigger {
            trigger.listing_deleted(id).await?;
        }

        Ok(())
    }
}

fn validate(command: &ListingCommand) -> Result<(), AdminListingError> {
    if command.title.trim().is_empty() {
        return Err(AdminListingError::ConstraintViolation("title"));
    }
    if command.price < 0 {
        return Err(AdminListingError::ConstraintViolation("price"));
    }
    if command.size_sqm < 0 {
        return Err(AdminListingError::ConstraintViolation("size_sqm"));
    }
    Ok(())
}
