//! On-demand amenity lookup around an arbitrary point.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use futures::future::try_join_all;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::application::repos::{ConfigRepo, RepoError, SpatialRepo};
use crate::domain::entities::NearbyAmenity;
use crate::domain::error::DomainError;
use crate::domain::types::{AmenityCategory, GeoPoint};

const SOURCE: &str = "application::nearby::NearbyService";
const SUMMARY_ENTRIES: usize = 5;

static COORDINATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d{1,3}(?:\.\d+)?)[ ,]+(-?\d{1,3}(?:\.\d+)?)").expect("valid regex")
});

#[derive(Debug, Error)]
pub enum NearbyError {
    #[error("provide a location via `location` or `q`")]
    MissingInput,
    #[error("could not find coordinates in `{0}`")]
    UnparsableLocation(String),
    #[error(transparent)]
    InvalidCoordinates(#[from] DomainError),
    #[error("nearby config unavailable: {0}")]
    Config(#[source] RepoError),
    #[error("{category} lookup failed")]
    SpatialQuery {
        category: AmenityCategory,
        source: RepoError,
    },
}

/// Where the coordinates of a lookup came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Coordinates,
    MapsLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyLookup {
    pub query: String,
    pub source: LocationSource,
    pub location: LatLng,
    pub radius_m: u32,
    pub max_results: u32,
    /// Keyed by [`AmenityCategory::nearby_key`]; disabled categories are absent.
    pub results: BTreeMap<&'static str, Vec<NearbyAmenity>>,
    pub summary: BTreeMap<&'static str, String>,
}

/// Extract a point from `"lat, lon"`, `"lat lon"` or a maps link whose `q`
/// parameter holds coordinates.
pub fn parse_location(raw: &str) -> Result<(GeoPoint, LocationSource), NearbyError> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Err(NearbyError::MissingInput);
    }

    let maps_query = Url::parse(cleaned).ok().and_then(|url| {
        url.query_pairs()
            .find(|(key, _)| key == "q")
            .map(|(_, value)| value.into_owned())
    });
    let (candidate, source) = match maps_query {
        Some(q) => (q, LocationSource::MapsLink),
        None => (cleaned.to_string(), LocationSource::Coordinates),
    };

    let captures = COORDINATES
        .captures(&candidate)
        .ok_or_else(|| NearbyError::UnparsableLocation(cleaned.to_string()))?;
    let lat: f64 = captures[1]
        .parse()
        .map_err(|_| NearbyError::UnparsableLocation(cleaned.to_string()))?;
    let lon: f64 = captures[2]
        .parse()
        .map_err(|_| NearbyError::UnparsableLocation(cleaned.to_string()))?;

    Ok((GeoPoint::new(lon, lat)?, source))
}

/// Positive overrides win; anything else falls back to the configured value.
fn positive_or(value: Option<i64>, default: i32) -> u32 {
    value
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or_else(|| u32::try_from(default.max(1)).unwrap_or(1))
}

fn name_and_distance(amenity: &NearbyAmenity) -> String {
    format!("{}, {}m", amenity.name, amenity.distance_m.round() as i64)
}

fn closest_and_farthest(entries: &[NearbyAmenity]) -> Option<String> {
    let closest = entries.first()?;
    let farthest = entries.last()?;
    Some(format!(
        "Closest: {} | Farthest: {}",
        name_and_distance(closest),
        name_and_distance(farthest)
    ))
}

/// One-line text rendering of the nearest few results of a category.
pub fn summarize(category: AmenityCategory, results: &[NearbyAmenity]) -> Option<String> {
    let entries = &results[..results.len().min(SUMMARY_ENTRIES)];
    if entries.is_empty() {
        return None;
    }
    let listed = || {
        entries
            .iter()
            .map(name_and_distance)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let line = match category {
        AmenityCategory::MetroStation => format!("Metro (5): {}", listed()),
        AmenityCategory::MetrobusStation => format!("Metrobus (5): {}", listed()),
        AmenityCategory::BusStop => format!("Bus stations (5): {}", closest_and_farthest(entries)?),
        AmenityCategory::TaxiStand => format!("Taxi stops: {}", closest_and_farthest(entries)?),
        AmenityCategory::Grocery => format!("Grocery (5): {}", listed()),
        AmenityCategory::Clothing => format!("Clothing (5): {}", listed()),
        AmenityCategory::Mall => format!("Malls: {}", listed()),
        AmenityCategory::Park => format!("Parks: {}", listed()),
        AmenityCategory::School => format!("Schools: {}", listed()),
    };
    Some(line)
}

#[derive(Clone)]
pub struct NearbyService {
    spatial: Arc<dyn SpatialRepo>,
    config: Arc<dyn ConfigRepo>,
}

impl NearbyService {
    pub fn new(spatial: Arc<dyn SpatialRepo>, config: Arc<dyn ConfigRepo>) -> Self {
        Self { spatial, config }
    }

    pub async fn lookup(
        &self,
        input: &str,
        radius_override: Option<i64>,
        max_override: Option<i64>,
    ) -> Result<NearbyLookup, NearbyError> {
        let (point, source) = parse_location(input)?;
        let config = self
            .config
            .load_nearby_config()
            .await
            .map_err(NearbyError::Config)?;
        let radius_m = positive_or(radius_override, config.radius_m);
        let max_results = positive_or(max_override, config.max_results);

        info!(
            target = SOURCE,
            input,
            source = ?source,
            radius_m,
            max_results,
            "nearby lookup"
        );

        let enabled: Vec<AmenityCategory> = AmenityCategory::ALL
            .into_iter()
            .filter(|category| config.is_enabled(*category))
            .collect();

        let lookups = enabled.iter().map(|&category| async move {
            self.spatial
                .within_radius(category, point, f64::from(radius_m), max_results)
                .await
                .map(|rows| (category, rows))
                .map_err(|source| NearbyError::SpatialQuery { category, source })
        });
        let per_category = try_join_all(lookups).await?;

        let mut results = BTreeMap::new();
        let mut summary = BTreeMap::new();
        for (category, rows) in per_category {
            if let Some(line) = summarize(category, &rows) {
                summary.insert(category.nearby_key(), line);
            }
            results.insert(category.nearby_key(), rows);
        }

        Ok(NearbyLookup {
            query: input.trim().to_string(),
            source,
            location: LatLng {
                lat: round6(point.lat),
                lng: round6(point.lon),
            },
            radius_m,
            max_results,
            results,
            summary,
        })
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
