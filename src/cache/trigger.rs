//! Proximity cache trigger.
//!
//! Mutation services call into the trigger after a successful write. The
//! trigger turns the mutation into an event, logs it and applies the matching
//! invalidation synchronously.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::application::proximity::{ProximityCacheService, ProximityError};
use crate::domain::types::AmenityCategory;

use super::events::{Epoch, EventKind, InvalidationPlan, ProximityEvent};

const SOURCE: &str = "cache::trigger";

/// What a dispatch ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    Skipped,
    Listing { listing_id: i64, removed: bool },
    All { removed: u64 },
}

pub struct ProximityTrigger {
    cache: Arc<ProximityCacheService>,
    epoch_counter: AtomicU64,
}

impl ProximityTrigger {
    pub fn new(cache: Arc<ProximityCacheService>) -> Self {
        Self {
            cache,
            epoch_counter: AtomicU64::new(0),
        }
    }

    fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Apply the invalidation for `kind`.
    pub async fn dispatch(&self, kind: EventKind) -> Result<Invalidation, ProximityError> {
        let event = ProximityEvent::new(kind, self.next_epoch());
        let plan = kind.plan();

        debug!(
            target = SOURCE,
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = kind.as_str(),
            plan = ?plan,
            "proximity event received"
        );

        let outcome = match plan {
            InvalidationPlan::Nothing => Invalidation::Skipped,
            InvalidationPlan::Listing(listing_id) => Invalidation::Listing {
                listing_id,
                removed: self.cache.invalidate(listing_id).await?,
            },
            InvalidationPlan::All => Invalidation::All {
                removed: self.cache.invalidate_all().await?,
            },
        };

        info!(
            target = SOURCE,
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = kind.as_str(),
            outcome = ?outcome,
            "proximity event applied"
        );

        Ok(outcome)
    }

    pub async fn listing_created(&self, listing_id: i64) -> Result<Invalidation, ProximityError> {
        self.dispatch(EventKind::ListingCreated { listing_id }).await
    }

    pub async fn listing_updated(&self, listing_id: i64) -> Result<Invalidation, ProximityError> {
        self.dispatch(EventKind::ListingUpdated { listing_id }).await
    }

    pub async fn listing_deleted(&self, listing_id: i64) -> Result<Invalidation, ProximityError> {
        self.dispatch(EventKind::ListingDeleted { listing_id }).await
    }

    pub async fn amenity_created(
        &self,
        category: AmenityCategory,
        id: i64,
    ) -> Result<Invalidation, ProximityError> {
        self.dispatch(EventKind::AmenityCreated { category, id })
            .await
    }

    pub async fn amenity_updated(
        &self,
        category: AmenityCategory,
        id: i64,
    ) -> Result<Invalidation, ProximityError> {
        self.dispatch(EventKind::AmenityUpdated { category, id })
            .await
    }

    pub async fn amenity_deleted(
        &self,
        category: AmenityCategory,
        id: i64,
    ) -> Result<Invalidation, ProximityError> {
        self.dispatch(EventKind::AmenityDeleted { category, id })
            .await
    }

    pub fn cache(&self) -> &Arc<ProximityCacheService> {
        &self.cache
    }
}
