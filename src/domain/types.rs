//! Shared domain enumerations and value types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Amenity collections held by the spatial store. Each category lives in its
/// own table; ids are only unique within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmenityCategory {
    Grocery,
    Clothing,
    MetroStation,
    BusStop,
    MetrobusStation,
    TaxiStand,
    Mall,
    Park,
    School,
}

impl AmenityCategory {
    pub const ALL: [AmenityCategory; 9] = [
        AmenityCategory::MetroStation,
        AmenityCategory::MetrobusStation,
        AmenityCategory::BusStop,
        AmenityCategory::TaxiStand,
        AmenityCategory::Grocery,
        AmenityCategory::Clothing,
        AmenityCategory::Mall,
        AmenityCategory::Park,
        AmenityCategory::School,
    ];

    /// Categories whose nearest ids are persisted per listing.
    pub const CACHED: [AmenityCategory; 2] = [AmenityCategory::Grocery, AmenityCategory::Clothing];

    pub fn as_str(self) -> &'static str {
        match self {
            AmenityCategory::Grocery => "grocery",
            AmenityCategory::Clothing => "clothing",
            AmenityCategory::MetroStation => "metro_station",
            AmenityCategory::BusStop => "bus_stop",
            AmenityCategory::MetrobusStation => "metrobus_station",
            AmenityCategory::TaxiStand => "taxi_stand",
            AmenityCategory::Mall => "mall",
            AmenityCategory::Park => "park",
            AmenityCategory::School => "school",
        }
    }

    /// Backing table. Only ever interpolated from this fixed set.
    pub fn table_name(self) -> &'static str {
        match self {
            AmenityCategory::Grocery => "grocery_stores",
            AmenityCategory::Clothing => "clothing_stores",
            AmenityCategory::MetroStation => "metro_stations",
            AmenityCategory::BusStop => "bus_stops",
            AmenityCategory::MetrobusStation => "metrobus_stations",
            AmenityCategory::TaxiStand => "taxi_stands",
            AmenityCategory::Mall => "malls",
            AmenityCategory::Park => "parks",
            AmenityCategory::School => "schools",
        }
    }

    /// Key used in nearby lookup payloads.
    pub fn nearby_key(self) -> &'static str {
        match self {
            AmenityCategory::Grocery => "grocery",
            AmenityCategory::Clothing => "clothing",
            AmenityCategory::MetroStation => "metro",
            AmenityCategory::BusStop => "bus",
            AmenityCategory::MetrobusStation => "metrobus",
            AmenityCategory::TaxiStand => "taxi",
            AmenityCategory::Mall => "malls",
            AmenityCategory::Park => "parks",
            AmenityCategory::School => "schools",
        }
    }

    pub fn is_proximity_cached(self) -> bool {
        Self::CACHED.contains(&self)
    }
}

impl fmt::Display for AmenityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AmenityCategory {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "grocery" => Ok(AmenityCategory::Grocery),
            "clothing" => Ok(AmenityCategory::Clothing),
            "metro_station" | "metro" => Ok(AmenityCategory::MetroStation),
            "bus_stop" | "bus" => Ok(AmenityCategory::BusStop),
            "metrobus_station" | "metrobus" => Ok(AmenityCategory::MetrobusStation),
            "taxi_stand" | "taxi" => Ok(AmenityCategory::TaxiStand),
            "mall" | "malls" => Ok(AmenityCategory::Mall),
            "park" | "parks" => Ok(AmenityCategory::Park),
            "school" | "schools" => Ok(AmenityCategory::School),
            other => Err(DomainError::validation(format!(
                "unknown amenity category `{other}`"
            ))),
        }
    }
}

/// WGS84 point. Longitude first, matching GeoJSON coordinate order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Result<Self, DomainError> {
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(DomainError::validation(format!(
                "longitude {lon} is outside [-180, 180]"
            )));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(DomainError::validation(format!(
                "latitude {lat} is outside [-90, 90]"
            )));
        }
        Ok(Self { lon, lat })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_aliases_resolve() {
        assert_eq!(
            AmenityCategory::try_from("metro").unwrap(),
            AmenityCategory::MetroStation
        );
        assert_eq!(
            AmenityCategory::try_from("taxi_stand").unwrap(),
            AmenityCategory::TaxiStand
        );
        assert!(AmenityCategory::try_from("pharmacy").is_err());
    }

    #[test]
    fn every_category_round_trips_through_as_str() {
        for category in AmenityCategory::ALL {
            assert_eq!(AmenityCategory::try_from(category.as_str()).unwrap(), category);
            assert_eq!(
                AmenityCategory::try_from(category.nearby_key()).unwrap(),
                category
            );
        }
    }

    #[test]
    fn only_stores_are_proximity_cached() {
        let cached: Vec<_> = AmenityCategory::ALL
            .into_iter()
            .filter(|c| c.is_proximity_cached())
            .collect();
        assert_eq!(
            cached,
            vec![AmenityCategory::Grocery, AmenityCategory::Clothing]
        );
    }

    #[test]
    fn geo_point_rejects_out_of_range() {
        assert!(GeoPoint::new(28.97, 41.01).is_ok());
        assert!(GeoPoint::new(181.0, 41.0).is_err());
        assert!(GeoPoint::new(29.0, -91.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 41.0).is_err());
    }
}
