//! Read-through cache of the nearest grocery and clothing stores per listing.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{StreamExt, stream};
use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::repos::{
    ConfigRepo, ListingsRepo, ProximityCacheRepo, RepoError, SpatialRepo,
};
use crate::domain::entities::ListingRecord;
use crate::domain::error::DomainError;
use crate::domain::proximity::{ProximityCacheRecord, ProximityIds, ProximityLimits};
use crate::domain::types::{AmenityCategory, GeoPoint};

const SOURCE: &str = "application::proximity::ProximityCacheService";
const PROGRESS_EVERY: usize = 10;

/// Upper bound on concurrent per-listing computations in one batch.
pub const MAX_BATCH_CONCURRENCY: usize = 64;

const METRIC_HIT: &str = "konut_proximity_hit_total";
const METRIC_MISS: &str = "konut_proximity_miss_total";
const METRIC_INVALIDATED: &str = "konut_proximity_invalidated_total";
const METRIC_COMPUTE_FAILED: &str = "konut_proximity_compute_failed_total";
const METRIC_COMPUTE_MS: &str = "konut_proximity_compute_ms";
const METRIC_BATCH_MS: &str = "konut_proximity_batch_ms";

#[derive(Debug, Error)]
pub enum ProximityError {
    #[error("listing has no location")]
    MissingLocation { listing_id: i64 },
    #[error("{category} lookup failed")]
    SpatialQuery {
        category: AmenityCategory,
        source: RepoError,
    },
    #[error("proximity cache storage failed: {0}")]
    Persistence(#[source] RepoError),
    #[error("display config rejected: {0}")]
    InvalidConfig(#[from] DomainError),
}

/// Outcome of a full recompute. Failures are collected, never raised.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// `"listing {id}: {error}"`, ordered by listing id.
    pub errors: Vec<String>,
    /// Concurrency actually used, after clamping.
    pub concurrency: usize,
    pub limits: ProximityLimits,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Proximity recompute finished in {:.1}s",
            self.elapsed.as_secs_f64()
        )?;
        writeln!(f, "  listings:   {}", self.total)?;
        writeln!(f, "  successful: {}", self.successful)?;
        writeln!(f, "  failed:     {}", self.failed)?;
        for message in &self.errors {
            writeln!(f, "    - {message}")?;
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

#[derive(Clone)]
pub struct ProximityCacheService {
    listings: Arc<dyn ListingsRepo>,
    spatial: Arc<dyn SpatialRepo>,
    config: Arc<dyn ConfigRepo>,
    cache: Arc<dyn ProximityCacheRepo>,
}

impl ProximityCacheService {
    pub fn new(
        listings: Arc<dyn ListingsRepo>,
        spatial: Arc<dyn SpatialRepo>,
        config: Arc<dyn ConfigRepo>,
        cache: Arc<dyn ProximityCacheRepo>,
    ) -> Self {
        Self {
            listings,
            spatial,
            config,
            cache,
        }
    }

    /// Read the per-category limits from the display config, creating the
    /// config row with defaults if needed.
    pub async fn load_limits(&self) -> Result<ProximityLimits, ProximityError> {
        let config = self
            .config
            .load_display_config()
            .await
            .map_err(ProximityError::Persistence)?;
        Ok(ProximityLimits::try_from(&config)?)
    }

    /// Query the nearest stores for `listing` and store them, replacing any
    /// existing row. Nothing is written when a query fails.
    pub async fn compute_for_listing(
        &self,
        listing: &ListingRecord,
        limits: ProximityLimits,
    ) -> Result<ProximityCacheRecord, ProximityError> {
        let started = Instant::now();
        let point = listing.location.ok_or(ProximityError::MissingLocation {
            listing_id: listing.id,
        })?;

        debug!(
            target = SOURCE,
            listing_id = listing.id,
            grocery_k = limits.grocery,
            clothing_k = limits.clothing,
            "computing proximity"
        );

        let result = self.compute_ids(listing.id, point, limits).await;
        let (grocery_ids, clothing_ids) = match result {
            Ok(ids) => ids,
            Err(err) => {
                counter!(METRIC_COMPUTE_FAILED).increment(1);
                return Err(err);
            }
        };

        let outcome = self
            .cache
            .upsert(listing.id, &grocery_ids, &clothing_ids)
            .await
            .map_err(|err| {
                counter!(METRIC_COMPUTE_FAILED).increment(1);
                ProximityError::Persistence(err)
            })?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_COMPUTE_MS).record(elapsed_ms);
        info!(
            target = SOURCE,
            listing_id = listing.id,
            created = outcome.created,
            grocery = grocery_ids.len(),
            clothing = clothing_ids.len(),
            elapsed_ms,
            "{} proximity cache row",
            if outcome.created { "created" } else { "updated" }
        );

        Ok(outcome.record)
    }

    async fn compute_ids(
        &self,
        listing_id: i64,
        point: GeoPoint,
        limits: ProximityLimits,
    ) -> Result<(Vec<i64>, Vec<i64>), ProximityError> {
        let grocery_ids = self
            .nearest_ids(listing_id, AmenityCategory::Grocery, point, limits)
            .await?;
        let clothing_ids = self
            .nearest_ids(listing_id, AmenityCategory::Clothing, point, limits)
            .await?;
        Ok((grocery_ids, clothing_ids))
    }

    async fn nearest_ids(
        &self,
        listing_id: i64,
        category: AmenityCategory,
        point: GeoPoint,
        limits: ProximityLimits,
    ) -> Result<Vec<i64>, ProximityError> {
        let k = limits.for_category(category);
        let started = Instant::now();
        let rows = self
            .spatial
            .nearest(category, point, k)
            .await
            .map_err(|source| ProximityError::SpatialQuery { category, source })?;

        debug!(
            target = SOURCE,
            listing_id,
            category = category.as_str(),
            found = rows.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "nearest query finished"
        );

        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    /// Recompute every listing once. Per-listing failures land in the report.
    pub async fn compute_all(
        &self,
        concurrency: NonZeroUsize,
    ) -> Result<BatchReport, ProximityError> {
        let started = Instant::now();
        let concurrency = concurrency.get().min(MAX_BATCH_CONCURRENCY);
        let limits = self.load_limits().await?;
        let listings = self
            .listings
            .list_listings(None)
            .await
            .map_err(ProximityError::Persistence)?;
        let total = listings.len();

        info!(
            target = SOURCE,
            total,
            concurrency,
            grocery_k = limits.grocery,
            clothing_k = limits.clothing,
            "recomputing proximity cache"
        );

        let mut outcomes = stream::iter(listings)
            .map(|listing| {
                let service = self.clone();
                async move {
                    let result = service.compute_for_listing(&listing, limits).await;
                    (listing.id, result)
                }
            })
            .buffer_unordered(concurrency);

        let mut processed = 0usize;
        let mut successful = 0usize;
        let mut failures: Vec<(i64, String)> = Vec::new();

        while let Some((listing_id, result)) = outcomes.next().await {
            processed += 1;
            match result {
                Ok(_) => successful += 1,
                Err(err) => {
                    warn!(
                        target = SOURCE,
                        listing_id,
                        error = %err,
                        "proximity computation failed"
                    );
                    failures.push((listing_id, format!("listing {listing_id}: {err}")));
                }
            }
            if processed % PROGRESS_EVERY == 0 {
                info!(target = SOURCE, processed, total, "recompute progress");
            }
        }

        failures.sort_by_key(|(listing_id, _)| *listing_id);
        let elapsed = started.elapsed();
        histogram!(METRIC_BATCH_MS).record(elapsed.as_secs_f64() * 1000.0);

        let report = BatchReport {
            total,
            successful,
            failed: failures.len(),
            errors: failures.into_iter().map(|(_, message)| message).collect(),
            concurrency,
            limits,
            elapsed,
        };

        info!(
            target = SOURCE,
            total = report.total,
            successful = report.successful,
            failed = report.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "proximity recompute finished"
        );

        Ok(report)
    }

    /// Stored ids when a row exists, otherwise compute and store them now.
    ///
    /// A stored row is returned as-is even if the configured limits changed
    /// after it was written.
    pub async fn get_cached(
        &self,
        listing: &ListingRecord,
    ) -> Result<ProximityIds, ProximityError> {
        let existing = self
            .cache
            .find(listing.id)
            .await
            .map_err(ProximityError::Persistence)?;

        if let Some(record) = existing {
            counter!(METRIC_HIT).increment(1);
            debug!(target = SOURCE, listing_id = listing.id, "proximity cache hit");
            return Ok(record.ids());
        }

        counter!(METRIC_MISS).increment(1);
        debug!(target = SOURCE, listing_id = listing.id, "proximity cache miss");

        let limits = self.load_limits().await?;
        let record = self.compute_for_listing(listing, limits).await?;
        Ok(record.ids())
    }

    /// Drop the row for one listing. Returns whether a row existed.
    pub async fn invalidate(&self, listing_id: i64) -> Result<bool, ProximityError> {
        let removed = self
            .cache
            .delete(listing_id)
            .await
            .map_err(ProximityError::Persistence)?;

        if removed {
            counter!(METRIC_INVALIDATED).increment(1);
            info!(target = SOURCE, listing_id, "proximity cache row invalidated");
        }
        Ok(removed)
    }

    /// Drop every row. Returns how many were removed.
    pub async fn invalidate_all(&self) -> Result<u64, ProximityError> {
        let removed = self
            .cache
            .delete_all()
            .await
            .map_err(ProximityError::Persistence)?;

        counter!(METRIC_INVALIDATED).increment(removed);
        info!(target = SOURCE, removed, "proximity cache cleared");
        Ok(removed)
    }

    pub async fn cached_count(&self) -> Result<u64, ProximityError> {
        self.cache.count().await.map_err(ProximityError::Persistence)
    }
}
