//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::{AmenityCategory, GeoPoint};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    pub id: i64,
    pub title: String,
    pub price: i64,
    pub size_sqm: i32,
    /// Missing for listings imported without a geocode.
    pub location: Option<GeoPoint>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingImageRecord {
    pub id: i64,
    pub listing_id: i64,
    pub url: String,
    pub title: Option<String>,
    pub sort_order: i32,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmenityRecord {
    pub id: i64,
    pub category: AmenityCategory,
    pub name: String,
    pub location: GeoPoint,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One row of a k-nearest answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmenityDistance {
    pub id: i64,
    pub distance_m: f64,
}

/// One row of a within-radius answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyAmenity {
    pub id: i64,
    pub name: String,
    pub distance_m: f64,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayConfigRecord {
    pub max_listings: i32,
    pub closest_grocery_stores: i32,
    pub closest_clothing_stores: i32,
    pub max_grocery_stores: i32,
    pub max_clothing_stores: i32,
    pub max_metro_stations: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Default for DisplayConfigRecord {
    fn default() -> Self {
        Self {
            max_listings: 100,
            closest_grocery_stores: 20,
            closest_clothing_stores: 20,
            max_grocery_stores: 200,
            max_clothing_stores: 200,
            max_metro_stations: 100,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyAmenityConfigRecord {
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
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl NearbyAmenityConfigRecord {
    pub fn is_enabled(&self, category: AmenityCategory) -> bool {
        match category {
            AmenityCategory::MetroStation => self.enable_metro,
            AmenityCategory::MetrobusStation => self.enable_metrobus,
            AmenityCategory::BusStop => self.enable_bus,
            AmenityCategory::TaxiStand => self.enable_taxi,
            AmenityCategory::Grocery => self.enable_grocery,
            AmenityCategory::Clothing => self.enable_clothing,
            AmenityCategory::Mall => self.enable_malls,
            AmenityCategory::Park => self.enable_parks,
            AmenityCategory::School => self.enable_schools,
        }
    }
}

impl Default for NearbyAmenityConfigRecord {
    fn default() -> Self {
        Self {
            radius_m: 5000,
            max_results: 10,
            enable_metro: true,
            enable_metrobus: true,
            enable_bus: true,
            enable_taxi: true,
            enable_grocery: true,
            enable_clothing: true,
            enable_malls: true,
            enable_parks: true,
            enable_schools: true,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Search window of one amenity layer in the nearest-distance enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSearch {
    pub enabled: bool,
    pub radius_m: i32,
    pub max_results: i32,
}

impl LayerSearch {
    const fn new(enabled: bool, radius_m: i32, max_results: i32) -> Self {
        Self {
            enabled,
            radius_m,
            max_results,
        }
    }
}

/// Which layers the nearest-distance enrichment measures, and how far it looks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapGenerationConfigRecord {
    pub metro: LayerSearch,
    pub metrobus: LayerSearch,
    pub bus: LayerSearch,
    pub grocery: LayerSearch,
    pub clothing: LayerSearch,
    pub malls: LayerSearch,
    pub parks: LayerSearch,
    pub taxi: LayerSearch,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl MapGenerationConfigRecord {
    /// Layers in the order they are measured.
    pub const LAYERS: [AmenityCategory; 8] = [
        AmenityCategory::MetroStation,
        AmenityCategory::MetrobusStation,
        AmenityCategory::BusStop,
        AmenityCategory::Grocery,
        AmenityCategory::Clothing,
        AmenityCategory::Mall,
        AmenityCategory::Park,
        AmenityCategory::TaxiStand,
    ];

    /// Settings for `category`; schools are not a distance layer.
    pub fn layer(&self, category: AmenityCategory) -> Option<LayerSearch> {
        match category {
            AmenityCategory::MetroStation => Some(self.metro),
            AmenityCategory::MetrobusStation => Some(self.metrobus),
            AmenityCategory::BusStop => Some(self.bus),
            AmenityCategory::Grocery => Some(self.grocery),
            AmenityCategory::Clothing => Some(self.clothing),
            AmenityCategory::Mall => Some(self.malls),
            AmenityCategory::Park => Some(self.parks),
            AmenityCategory::TaxiStand => Some(self.taxi),
            AmenityCategory::School => None,
        }
    }
}

impl Default for MapGenerationConfigRecord {
    fn default() -> Self {
        Self {
            metro: LayerSearch::new(true, 1500, 6),
            metrobus: LayerSearch::new(true, 2000, 6),
            bus: LayerSearch::new(false, 600, 8),
            grocery: LayerSearch::new(true, 600, 6),
            clothing: LayerSearch::new(true, 1200, 6),
            malls: LayerSearch::new(true, 2000, 6),
            parks: LayerSearch::new(true, 1500, 8),
            taxi: LayerSearch::new(false, 800, 10),
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}
