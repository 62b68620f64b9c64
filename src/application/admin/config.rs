use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::application::repos::{ConfigRepo, RepoError};
use crate::domain::entities::{
    DisplayConfigRecord, LayerSearch, MapGenerationConfigRecord, NearbyAmenityConfigRecord,
};

const SOURCE: &str = "application::admin::config::AdminConfigService";

#[derive(Debug, Error)]
pub enum AdminConfigError {
    #[error("{0} is out of range")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDisplayConfigCommand {
    pub max_listings: i32,
    pub closest_grocery_stores: i32,
    pub closest_clothing_stores: i32,
    pub max_grocery_stores: i32,
    pub max_clothing_stores: i32,
    pub max_metro_stations: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNearbyConfigCommand {
    pub radius_m: i32,
    pub max_results: i32,
    pub enable_metro: bool,
    pub enable_metrobus: bool,
    pub enable_bus: bool,
    pub enable_taxi: bool,
    pub enable_grocery: bool,
    pub enable_clothing: bool,
    pub enable_malls: bool,
    pub enable_parks: bool,
    pub enable_schools: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMapGenerationConfigCommand {
    pub metro: LayerSearch,
    pub metrobus: LayerSearch,
    pub bus: LayerSearch,
    pub grocery: LayerSearch,
    pub clothing: LayerSearch,
    pub malls: LayerSearch,
    pub parks: LayerSearch,
    pub taxi: LayerSearch,
}

impl UpdateMapGenerationConfigCommand {
    fn validate(&self) -> Result<(), AdminConfigError> {
        let layers = [
            ("metro", &self.metro),
            ("metrobus", &self.metrobus),
            ("bus", &self.bus),
            ("grocery", &self.grocery),
            ("clothing", &self.clothing),
            ("malls", &self.malls),
            ("parks", &self.parks),
            ("taxi", &self.taxi),
        ];
        for (name, layer) in layers {
            if layer.radius_m < 0 || layer.max_results < 0 {
                return Err(AdminConfigError::ConstraintViolation(name));
            }
        }
        Ok(())
    }
}

/// Edits the singleton configuration rows.
///
/// Changing the per-listing store counts does not touch stored proximity rows;
/// run a recompute to apply new counts to existing listings.
#[derive(Clone)]
pub struct AdminConfigService {
    repo: Arc<dyn ConfigRepo>,
}

impl AdminConfigService {
    pub fn new(repo: Arc<dyn ConfigRepo>) -> Self {
        Self { repo }
    }

    pub async fn display(&self) -> Result<DisplayConfigRecord, AdminConfigError> {
        Ok(self.repo.load_display_config().await?)
    }

    pub async fn nearby(&self) -> Result<NearbyAmenityConfigRecord, AdminConfigError> {
        Ok(self.repo.load_nearby_config().await?)
    }

    pub async fn map_generation(&self) -> Result<MapGenerationConfigRecord, AdminConfigError> {
        Ok(self.repo.load_map_generation_config().await?)
    }

    pub async fn update_display(
        &self,
        command: UpdateDisplayConfigCommand,
    ) -> Result<DisplayConfigRecord, AdminConfigError> {
        ensure_at_least(command.max_listings, 1, "max_listings")?;
        ensure_at_least(command.closest_grocery_stores, 0, "closest_grocery_stores")?;
        ensure_at_least(command.closest_clothing_stores, 0, "closest_clothing_stores")?;
        ensure_at_least(command.max_grocery_stores, 0, "max_grocery_stores")?;
        ensure_at_least(command.max_clothing_stores, 0, "max_clothing_stores")?;
        ensure_at_least(command.max_metro_stations, 0, "max_metro_stations")?;

        let record = DisplayConfigRecord {
            max_listings: command.max_listings,
            closest_grocery_stores: command.closest_grocery_stores,
            closest_clothing_stores: command.closest_clothing_stores,
            max_grocery_stores: command.max_grocery_stores,
            max_clothing_stores: command.max_clothing_stores,
            max_metro_stations: command.max_metro_stations,
            updated_at: OffsetDateTime::now_utc(),
        };
        let saved = self.repo.upsert_display_config(record).await?;
        info!(
            target = SOURCE,
            closest_grocery_stores = saved.closest_grocery_stores,
            closest_clothing_stores = saved.closest_clothing_stores,
            "display config updated"
        );
        Ok(saved)
    }

    pub async fn update_nearby(
        &self,
        command: UpdateNearbyConfigCommand,
    ) -> Result<NearbyAmenityConfigRecord, AdminConfigError> {
        ensure_at_least(command.radius_m, 1, "radius_m")?;
        ensure_at_least(command.max_results, 1, "max_results")?;

        let record = NearbyAmenityConfigRecord {
            radius_m: command.radius_m,
            max_results: command.max_results,
            enable_metro: command.enable_metro,
            enable_metrobus: command.enable_metrobus,
            enable_bus: command.enable_bus,
            enable_taxi: command.enable_taxi,
            enable_grocery: command.enable_grocery,
            enable_clothing: command.enable_clothing,
            enable_malls: command.enable_malls,
            enable_parks: command.enable_parks,
            enable_schools: command.enable_schools,
            updated_at: OffsetDateTime::now_utc(),
        };
        let saved = self.repo.upsert_nearby_config(record).await?;
        info!(
            target = SOURCE,
            radius_m = saved.radius_m,
            max_results = saved.max_results,
            "nearby config updated"
        );
        Ok(saved)
    }

    /// Stored nearest distances keep their old values until the next
    /// distance update.
    pub async fn update_map_generation(
        &self,
        command: UpdateMapGenerationConfigCommand,
    ) -> Result<MapGenerationConfigRecord, AdminConfigError> {
        command.validate()?;

        let record = MapGenerationConfigRecord {
            metro: command.metro,
            metrobus: command.metrobus,
            bus: command.bus,
            grocery: command.grocery,
            clothing: command.clothing,
            malls: command.malls,
            parks: command.parks,
            taxi: command.taxi,
            updated_at: OffsetDateTime::now_utc(),
        };
        let saved = self.repo.upsert_map_generation_config(record).await?;
        info!(target = SOURCE, "map generation config updated");
        Ok(saved)
    }
}

fn ensure_at_least(value: i32, min: i32, field: &'static str) -> Result<(), AdminConfigError> {
    if value < min {
        return Err(AdminConfigError::ConstraintViolation(field));
    }
    Ok(())
}
