//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::distances::{LayerDistance, NearestDistances};
use crate::domain::entities::{
    AmenityDistance, AmenityRecord, DisplayConfigRecord, ListingImageRecord, ListingRecord,
    MapGenerationConfigRecord, NearbyAmenity, NearbyAmenityConfigRecord,
};
use crate::domain::proximity::ProximityCacheRecord;
use crate::domain::types::{AmenityCategory, GeoPoint};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateListingParams {
    pub title: String,
    pub price: i64,
    pub size_sqm: i32,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone)]
pub struct UpdateListingParams {
    pub id: i64,
    pub title: String,
    pub price: i64,
    pub size_sqm: i32,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone)]
pub struct CreateAmenityParams {
    pub category: AmenityCategory,
    pub name: String,
    pub location: GeoPoint,
}

#[derive(Debug, Clone)]
pub struct UpdateAmenityParams {
    pub category: AmenityCategory,
    pub id: i64,
    pub name: String,
    pub location: GeoPoint,
}

/// Result of writing a cache row.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub record: ProximityCacheRecord,
    /// `true` when no row existed for the listing before the write.
    pub created: bool,
}

#[async_trait]
pub trait ListingsRepo: Send + Sync {
    /// Listings ordered by id. `None` returns every listing.
    async fn list_listings(&self, limit: Option<u32>) -> Result<Vec<ListingRecord>, RepoError>;

    async fn find_listing(&self, id: i64) -> Result<Option<ListingRecord>, RepoError>;

    /// Images ordered primary first, then by sort order and id.
    async fn list_images(&self, listing_id: i64) -> Result<Vec<ListingImageRecord>, RepoError>;
}

#[async_trait]
pub trait ListingsWriteRepo: Send + Sync {
    async fn create_listing(&self, params: CreateListingParams)
    -> Result<ListingRecord, RepoError>;

    async fn update_listing(&self, params: UpdateListingParams)
    -> Result<ListingRecord, RepoError>;

    async fn delete_listing(&self, id: i64) -> Result<(), RepoError>;
}

/// Metric queries over amenity points.
///
/// Both queries order by ascending distance in meters and break ties by id,
/// so repeated calls against unchanged data return identical answers.
#[async_trait]
pub trait SpatialRepo: Send + Sync {
    async fn nearest(
        &self,
        category: AmenityCategory,
        point: GeoPoint,
        k: u32,
    ) -> Result<Vec<AmenityDistance>, RepoError>;

    async fn within_radius(
        &self,
        category: AmenityCategory,
        point: GeoPoint,
        radius_m: f64,
        limit: u32,
    ) -> Result<Vec<NearbyAmenity>, RepoError>;

    /// The single nearest amenity with its name, regardless of distance.
    async fn closest(
        &self,
        category: AmenityCategory,
        point: GeoPoint,
    ) -> Result<Option<NearbyAmenity>, RepoError>;
}

#[async_trait]
pub trait AmenitiesWriteRepo: Send + Sync {
    async fn find_amenity(
        &self,
        category: AmenityCategory,
        id: i64,
    ) -> Result<Option<AmenityRecord>, RepoError>;

    async fn create_amenity(&self, params: CreateAmenityParams)
    -> Result<AmenityRecord, RepoError>;

    async fn update_amenity(&self, params: UpdateAmenityParams)
    -> Result<AmenityRecord, RepoError>;

    async fn delete_amenity(&self, category: AmenityCategory, id: i64) -> Result<(), RepoError>;
}

/// Singleton configuration rows. Loads create the row with defaults when it
/// does not exist yet.
#[async_trait]
pub trait ConfigRepo: Send + Sync {
    async fn load_display_config(&self) -> Result<DisplayConfigRecord, RepoError>;

    async fn upsert_display_config(
        &self,
        config: DisplayConfigRecord,
    ) -> Result<DisplayConfigRecord, RepoError>;

    async fn load_nearby_config(&self) -> Result<NearbyAmenityConfigRecord, RepoError>;

    async fn upsert_nearby_config(
        &self,
        config: NearbyAmenityConfigRecord,
    ) -> Result<NearbyAmenityConfigRecord, RepoError>;

    async fn load_map_generation_config(&self) -> Result<MapGenerationConfigRecord, RepoError>;

    async fn upsert_map_generation_config(
        &self,
        config: MapGenerationConfigRecord,
    ) -> Result<MapGenerationConfigRecord, RepoError>;
}

#[async_trait]
pub trait NearestDistanceRepo: Send + Sync {
    /// Replace every stored layer distance of `listing_id` with `distances`.
    async fn replace_distances(
        &self,
        listing_id: i64,
        distances: &[LayerDistance],
    ) -> Result<NearestDistances, RepoError>;

    /// `None` when nothing has been stored for the listing.
    async fn find_distances(&self, listing_id: i64)
    -> Result<Option<NearestDistances>, RepoError>;
}

#[async_trait]
pub trait ProximityCacheRepo: Send + Sync {
    async fn find(&self, listing_id: i64) -> Result<Option<ProximityCacheRecord>, RepoError>;

    /// Insert or replace the row for `listing_id` in a single statement.
    async fn upsert(
        &self,
        listing_id: i64,
        grocery_ids: &[i64],
        clothing_ids: &[i64],
    ) -> Result<UpsertOutcome, RepoError>;

    /// Returns whether a row was removed.
    async fn delete(&self, listing_id: i64) -> Result<bool, RepoError>;

    async fn delete_all(&self) -> Result<u64, RepoError>;

    async fn count(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
