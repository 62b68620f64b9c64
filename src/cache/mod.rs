//! Proximity cache invalidation.
//!
//! Listing and amenity writes go through the admin services, which hand the
//! mutation to [`ProximityTrigger`]. The trigger decides between three
//! outcomes:
//!
//! - nothing to do (listing created or deleted, uncached amenity category)
//! - drop the row of one listing (listing updated)
//! - drop every row (grocery or clothing store created, updated or deleted)
//!
//! Dropped rows are recomputed on the next read.

mod events;
mod trigger;

pub use events::{Epoch, EventKind, InvalidationPlan, ProximityEvent};
pub use trigger::{Invalidation, ProximityTrigger};
