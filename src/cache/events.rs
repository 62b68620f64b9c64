//! Mutation events that affect the proximity cache.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::AmenityCategory;

/// Monotonic sequence number assigned by the trigger.
///
/// Only used to order log lines emitted by concurrent requests.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct ProximityEvent {
    /// Unique identifier, logged with every line the dispatch emits.
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl ProximityEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ListingCreated { listing_id: i64 },
    ListingUpdated { listing_id: i64 },
    /// The cache row goes with the listing through the foreign key cascade.
    ListingDeleted { listing_id: i64 },
    AmenityCreated { category: AmenityCategory, id: i64 },
    AmenityUpdated { category: AmenityCategory, id: i64 },
    AmenityDeleted { category: AmenityCategory, id: i64 },
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ListingCreated { .. } => "listing_created",
            EventKind::ListingUpdated { .. } => "listing_updated",
            EventKind::ListingDeleted { .. } => "listing_deleted",
            EventKind::AmenityCreated { .. } => "amenity_created",
            EventKind::AmenityUpdated { .. } => "amenity_updated",
            EventKind::AmenityDeleted { .. } => "amenity_deleted",
        }
    }

    /// What the cache has to do in response to this mutation.
    pub fn plan(&self) -> InvalidationPlan {
        match *self {
            EventKind::ListingCreated { .. } | EventKind::ListingDeleted { .. } => {
                InvalidationPlan::Nothing
            }
            EventKind::ListingUpdated { listing_id } => InvalidationPlan::Listing(listing_id),
            EventKind::AmenityCreated { category, .. }
            | EventKind::AmenityUpdated { category, .. }
            | EventKind::AmenityDeleted { category, .. } => {
                if category.is_proximity_cached() {
                    InvalidationPlan::All
                } else {
                    InvalidationPlan::Nothing
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationPlan {
    Nothing,
    Listing(i64),
    /// Any store change can reorder the nearest set of every listing.
    All,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_lifecycle_only_invalidates_on_update() {
        assert_eq!(
            EventKind::ListingCreated { listing_id: 1 }.plan(),
            InvalidationPlan::Nothing
        );
        assert_eq!(
            EventKind::ListingUpdated { listing_id: 1 }.plan(),
            InvalidationPlan::Listing(1)
        );
        assert_eq!(
            EventKind::ListingDeleted { listing_id: 1 }.plan(),
            InvalidationPlan::Nothing
        );
    }

    #[test]
    fn store_changes_clear_everything() {
        for category in [AmenityCategory::Grocery, AmenityCategory::Clothing] {
            for kind in [
                EventKind::AmenityCreated { category, id: 1 },
                EventKind::AmenityUpdated { category, id: 1 },
                EventKind::AmenityDeleted { category, id: 1 },
            ] {
                assert_eq!(kind.plan(), InvalidationPlan::All, "{}", kind.as_str());
            }
        }
    }

    #[test]
    fn uncached_categories_are_ignored() {
        for category in AmenityCategory::ALL
            .into_iter()
            .filter(|c| !c.is_proximity_cached())
        {
            assert_eq!(
                EventKind::AmenityUpdated { category, id: 3 }.plan(),
                InvalidationPlan::Nothing
            );
        }
    }
}
