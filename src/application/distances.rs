//! Nearest-amenity distance per map layer, stored per listing.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::repos::{
    ConfigRepo, ListingsRepo, NearestDistanceRepo, RepoError, SpatialRepo,
};
use crate::domain::distances::{DistanceLayer, LayerDistance, NearestDistances};
use crate::domain::entities::ListingRecord;
use crate::domain::error::DomainError;
use crate::domain::types::{AmenityCategory, GeoPoint};

const SOURCE: &str = "application::distances::NearestDistanceService";

/// Listings refreshed when neither a listing nor `all` is requested.
pub const DEFAULT_LATEST_LIMIT: u32 = 200;

const METRIC_UPDATED: &str = "konut_distances_updated_total";
const METRIC_FAILED: &str = "konut_distances_failed_total";

#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("listing {0} not found")]
    ListingNotFound(i64),
    #[error("listing has no location")]
    MissingLocation { listing_id: i64 },
    #[error("choose either a single listing or all listings")]
    ConflictingSelection,
    #[error("{category} lookup failed")]
    SpatialQuery {
        category: AmenityCategory,
        source: RepoError,
    },
    #[error("nearest distance storage failed: {0}")]
    Persistence(#[source] RepoError),
    #[error("map generation config rejected: {0}")]
    InvalidConfig(#[from] DomainError),
}

/// Which listings a refresh touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceSelection {
    Listing(i64),
    All,
    /// Most recently updated listings first.
    Latest(u32),
}

impl DistanceSelection {
    pub fn from_parts(
        listing_id: Option<i64>,
        all: bool,
        limit: Option<u32>,
    ) -> Result<Self, DistanceError> {
        match (listing_id, all) {
            (Some(_), true) => Err(DistanceError::ConflictingSelection),
            (Some(id), false) => Ok(Self::Listing(id)),
            (None, true) => Ok(Self::All),
            (None, false) => Ok(Self::Latest(limit.unwrap_or(DEFAULT_LATEST_LIMIT))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DistanceReport {
    pub selected: usize,
    pub updated: usize,
    pub failed: usize,
    /// `"listing {id}: {error}"` in processing order.
    pub errors: Vec<String>,
    pub layers: Vec<AmenityCategory>,
    #[serde(serialize_with = "elapsed_ms")]
    pub elapsed: Duration,
}

impl DistanceReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for DistanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Updated nearest distances for {} listing(s).", self.updated)?;
        if self.failed > 0 {
            writeln!(f, "  failed: {}", self.failed)?;
            for message in &self.errors {
                writeln!(f, "    - {message}")?;
            }
        }
        Ok(())
    }
}

fn elapsed_ms<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

#[derive(Clone)]
pub struct NearestDistanceService {
    listings: Arc<dyn ListingsRepo>,
    spatial: Arc<dyn SpatialRepo>,
    config: Arc<dyn ConfigRepo>,
    distances: Arc<dyn NearestDistanceRepo>,
}

impl NearestDistanceService {
    pub fn new(
        listings: Arc<dyn ListingsRepo>,
        spatial: Arc<dyn SpatialRepo>,
        config: Arc<dyn ConfigRepo>,
        distances: Arc<dyn NearestDistanceRepo>,
    ) -> Self {
        Self {
            listings,
            spatial,
            config,
            distances,
        }
    }

    /// Enabled layers from the map generation config.
    pub async fn load_layers(&self) -> Result<Vec<DistanceLayer>, DistanceError> {
        let config = self
            .config
            .load_map_generation_config()
            .await
            .map_err(DistanceError::Persistence)?;
        Ok(DistanceLayer::enabled(&config)?)
    }

    /// Measure every layer around `listing` and replace its stored distances.
    pub async fn compute_for_listing(
        &self,
        listing: &ListingRecord,
        layers: &[DistanceLayer],
    ) -> Result<NearestDistances, DistanceError> {
        let point = listing.location.ok_or(DistanceError::MissingLocation {
            listing_id: listing.id,
        })?;

        let lookups = layers
            .iter()
            .map(|layer| self.nearest_distance(point, *layer));
        let measured = try_join_all(lookups).await?;

        debug!(
            target = SOURCE,
            listing_id = listing.id,
            layers = measured.len(),
            found = measured.iter().filter(|d| d.distance_m.is_some()).count(),
            "nearest distances measured"
        );

        self.distances
            .replace_distances(listing.id, &measured)
            .await
            .map_err(DistanceError::Persistence)
    }

    async fn nearest_distance(
        &self,
        point: GeoPoint,
        layer: DistanceLayer,
    ) -> Result<LayerDistance, DistanceError> {
        let category = layer.category;
        let rows = self
            .spatial
            .within_radius(category, point, layer.radius_m, layer.max_results)
            .await
            .map_err(|source| DistanceError::SpatialQuery { category, source })?;

        Ok(LayerDistance {
            category,
            distance_m: rows.iter().map(|row| row.distance_m).reduce(f64::min),
        })
    }

    async fn select(
        &self,
        selection: DistanceSelection,
    ) -> Result<Vec<ListingRecord>, DistanceError> {
        match selection {
            DistanceSelection::Listing(id) => {
                let listing = self
                    .listings
                    .find_listing(id)
                    .await
                    .map_err(DistanceError::Persistence)?
                    .ok_or(DistanceError::ListingNotFound(id))?;
                Ok(vec![listing])
            }
            DistanceSelection::All => self
                .listings
                .list_listings(None)
                .await
                .map_err(DistanceError::Persistence),
            DistanceSelection::Latest(limit) => {
                let mut listings = self
                    .listings
                    .list_listings(None)
                    .await
                    .map_err(DistanceError::Persistence)?;
                listings.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
                listings.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
                Ok(listings)
            }
        }
    }

    /// Refresh the selected listings one at a time. Per-listing failures land
    /// in the report.
    pub async fn update(
        &self,
        selection: DistanceSelection,
    ) -> Result<DistanceReport, DistanceError> {
        let started = Instant::now();
        let layers = self.load_layers().await?;
        let listings = self.select(selection).await?;
        let selected = listings.len();

        info!(
            target = SOURCE,
            selection = ?selection,
            selected,
            layers = layers.len(),
            "updating nearest distances"
        );

        let mut updated = 0usize;
        let mut errors = Vec::new();
        for listing in &listings {
            match self.compute_for_listing(listing, &layers).await {
                Ok(_) => {
                    updated += 1;
                    counter!(METRIC_UPDATED).increment(1);
                }
                Err(err) => {
                    counter!(METRIC_FAILED).increment(1);
                    warn!(
                        target = SOURCE,
                        listing_id = listing.id,
                        error = %err,
                        "nearest distance update failed"
                    );
                    errors.push(format!("listing {}: {err}", listing.id));
                }
            }
        }

        let report = DistanceReport {
            selected,
            updated,
            failed: errors.len(),
            errors,
            layers: layers.iter().map(|layer| layer.category).collect(),
            elapsed: started.elapsed(),
        };

        info!(
            target = SOURCE,
            selected = report.selected,
            updated = report.updated,
            failed = report.failed,
            "nearest distance update finished"
        );

        Ok(report)
    }

    pub async fn find(&self, listing_id: i64) -> Result<Option<NearestDistances>, DistanceError> {
        self.distances
            .find_distances(listing_id)
            .await
            .map_err(DistanceError::Persistence)
    }
}
