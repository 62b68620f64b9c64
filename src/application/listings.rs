//! GeoJSON feed of listings for the map.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::application::proximity::{ProximityCacheService, ProximityError};
use crate::application::repos::{ConfigRepo, ListingsRepo, RepoError, SpatialRepo};
use crate::domain::entities::{ListingImageRecord, ListingRecord};
use crate::domain::types::{AmenityCategory, GeoPoint};

const SOURCE: &str = "application::listings::ListingFeedService";
const MAX_IMAGES: usize = 3;

#[derive(Debug, Error)]
pub enum ListingFeedError {
    #[error("display config unavailable: {0}")]
    Config(#[source] RepoError),
    #[error("listings unavailable: {0}")]
    Listings(#[source] RepoError),
}

#[derive(Debug, Error)]
enum FeatureError {
    #[error("nearest metro station lookup failed: {0}")]
    Metro(#[source] RepoError),
    #[error(transparent)]
    Proximity(#[from] ProximityError),
    #[error("images unavailable: {0}")]
    Images(#[source] RepoError),
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<ListingFeature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingFeature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: PointGeometry,
    pub properties: ListingProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// `[lon, lat]`
    pub coordinates: [f64; 2],
}

impl From<GeoPoint> for PointGeometry {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: "Point",
            coordinates: [point.lon, point.lat],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingProperties {
    pub id: i64,
    pub title: String,
    pub price: i64,
    pub size_sqm: i32,
    pub closest_station_name: Option<String>,
    pub distance_to_station_m: Option<f64>,
    pub closest_grocery_store_ids: Vec<i64>,
    pub closest_clothing_store_ids: Vec<i64>,
    pub image_url: Option<String>,
    pub images: Vec<String>,
}

/// Primary image first, then the rest in order, without duplicate URLs.
fn carousel(images: &[ListingImageRecord]) -> (Option<String>, Vec<String>) {
    let primary = images
        .iter()
        .find(|image| image.is_primary)
        .map(|image| image.url.clone());

    let mut urls: Vec<String> = Vec::with_capacity(MAX_IMAGES);
    let ordered = primary
        .iter()
        .cloned()
        .chain(images.iter().map(|image| image.url.clone()));
    for url in ordered {
        if urls.len() == MAX_IMAGES {
            break;
        }
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    (primary, urls)
}

#[derive(Clone)]
pub struct ListingFeedService {
    listings: Arc<dyn ListingsRepo>,
    spatial: Arc<dyn SpatialRepo>,
    config: Arc<dyn ConfigRepo>,
    proximity: Arc<ProximityCacheService>,
}

impl ListingFeedService {
    pub fn new(
        listings: Arc<dyn ListingsRepo>,
        spatial: Arc<dyn SpatialRepo>,
        config: Arc<dyn ConfigRepo>,
        proximity: Arc<ProximityCacheService>,
    ) -> Self {
        Self {
            listings,
            spatial,
            config,
            proximity,
        }
    }

    pub async fn feature_collection(&self) -> Result<FeatureCollection, ListingFeedError> {
        let started = Instant::now();
        let config = self
            .config
            .load_display_config()
            .await
            .map_err(ListingFeedError::Config)?;
        let limit = u32::try_from(config.max_listings).unwrap_or(0);
        let listings = self
            .listings
            .list_listings(Some(limit))
            .await
            .map_err(ListingFeedError::Listings)?;
        let requested = listings.len();

        let mut features = Vec::with_capacity(requested);
        for (index, listing) in listings.iter().enumerate() {
            let Some(point) = listing.location else {
                debug!(target = SOURCE, listing_id = listing.id, "listing without location skipped");
                continue;
            };
            match self.feature(listing, point).await {
                Ok(feature) => features.push(feature),
                Err(err) => error!(
                    target = SOURCE,
                    listing_id = listing.id,
                    error = %err,
                    "listing feature failed"
                ),
            }
            if (index + 1) % 10 == 0 {
                info!(target = SOURCE, processed = index + 1, requested, "feed progress");
            }
        }

        info!(
            target = SOURCE,
            returned = features.len(),
            requested,
            max_listings = config.max_listings,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "listing feed built"
        );

        Ok(FeatureCollection {
            kind: "FeatureCollection",
            features,
        })
    }

    async fn feature(
        &self,
        listing: &ListingRecord,
        point: GeoPoint,
    ) -> Result<ListingFeature, FeatureError> {
        let station = self
            .spatial
            .closest(AmenityCategory::MetroStation, point)
            .await
            .map_err(FeatureError::Metro)?;
        let ids = self.proximity.get_cached(listing).await?;
        let images = self
            .listings
            .list_images(listing.id)
            .await
            .map_err(FeatureError::Images)?;
        let (image_url, images) = carousel(&images);

        Ok(ListingFeature {
            kind: "Feature",
            geometry: point.into(),
            properties: ListingProperties {
                id: listing.id,
                title: listing.title.clone(),
                price: listing.price,
                size_sqm: listing.size_sqm,
                distance_to_station_m: station.as_ref().map(|s| s.distance_m),
                closest_station_name: station.map(|s| s.name),
                closest_grocery_store_ids: ids.grocery_ids,
                closest_clothing_store_ids: ids.clothing_ids,
                image_url,
                images,
            },
        })
    }
}
