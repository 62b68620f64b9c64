//! Per-listing nearest-amenity records.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::{
    entities::DisplayConfigRecord,
    error::DomainError,
    types::AmenityCategory,
};

/// How many nearest ids to keep per cached category.
///
/// Loaded once per request or batch from the display configuration and passed
/// down by value; nothing below the service boundary reads configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProximityLimits {
    pub grocery: u32,
    pub clothing: u32,
}

impl fmt::Display for ProximityLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  closest grocery stores per listing:  {}", self.grocery)?;
        writeln!(f, "  closest clothing stores per listing: {}", self.clothing)
    }
}

impl ProximityLimits {
    pub fn for_category(&self, category: AmenityCategory) -> u32 {
        match category {
            AmenityCategory::Grocery => self.grocery,
            AmenityCategory::Clothing => self.clothing,
            _ => 0,
        }
    }
}

impl TryFrom<&DisplayConfigRecord> for ProximityLimits {
    type Error = DomainError;

    fn try_from(config: &DisplayConfigRecord) -> Result<Self, Self::Error> {
        let grocery = u32::try_from(config.closest_grocery_stores).map_err(|_| {
            DomainError::invariant("closest_grocery_stores must not be negative")
        })?;
        let clothing = u32::try_from(config.closest_clothing_stores).map_err(|_| {
            DomainError::invariant("closest_clothing_stores must not be negative")
        })?;
        Ok(Self { grocery, clothing })
    }
}

/// Cached nearest ids for one listing.
///
/// Both lists are ordered nearest-first. The row only exists while it is
/// fresh; invalidation deletes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityCacheRecord {
    pub listing_id: i64,
    pub grocery_ids: Vec<i64>,
    pub clothing_ids: Vec<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub computed_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ProximityCacheRecord {
    pub fn ids(&self) -> ProximityIds {
        ProximityIds {
            grocery_ids: self.grocery_ids.clone(),
            clothing_ids: self.clothing_ids.clone(),
        }
    }
}

/// Read-side view handed to callers of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProximityIds {
    pub grocery_ids: Vec<i64>,
    pub clothing_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_follow_display_config() {
        let config = DisplayConfigRecord {
            closest_grocery_stores: 3,
            closest_clothing_stores: 0,
            ..Default::default()
        };
        let limits = ProximityLimits::try_from(&config).expect("valid limits");
        assert_eq!(limits.for_category(AmenityCategory::Grocery), 3);
        assert_eq!(limits.for_category(AmenityCategory::Clothing), 0);
        assert_eq!(limits.for_category(AmenityCategory::Park), 0);
    }

    #[test]
    fn negative_counts_are_rejected() {
        let config = DisplayConfigRecord {
            closest_grocery_stores: -1,
            ..Default::default()
        };
        assert!(ProximityLimits::try_from(&config).is_err());
    }

    #[test]
    fn limits_render_one_line_per_category() {
        let limits = ProximityLimits {
            grocery: 20,
            clothing: 5,
        };
        assert_eq!(
            limits.to_string(),
            "  closest grocery stores per listing:  20\n  closest clothing stores per listing: 5\n"
        );
    }
}
