//! Distance in meters from a listing to the nearest amenity of each layer.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::{
    entities::MapGenerationConfigRecord, error::DomainError, types::AmenityCategory,
};

/// An enabled layer with its validated search window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceLayer {
    pub category: AmenityCategory,
    pub radius_m: f64,
    pub max_results: u32,
}

impl DistanceLayer {
    /// Enabled layers of `config` in measurement order. Disabled layers are
    /// left out and never validated.
    pub fn enabled(config: &MapGenerationConfigRecord) -> Result<Vec<Self>, DomainError> {
        let mut layers = Vec::new();
        for category in MapGenerationConfigRecord::LAYERS {
            let Some(search) = config.layer(category) else {
                continue;
            };
            if !search.enabled {
                continue;
            }
            if search.radius_m < 0 {
                return Err(DomainError::invariant(format!(
                    "{category} radius must not be negative"
                )));
            }
            let max_results = u32::try_from(search.max_results).map_err(|_| {
                DomainError::invariant(format!("{category} max results must not be negative"))
            })?;
            layers.push(Self {
                category,
                radius_m: f64::from(search.radius_m),
                max_results,
            });
        }
        Ok(layers)
    }
}

/// Nearest distance for one layer. `None` when nothing lies inside the
/// layer's radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerDistance {
    pub category: AmenityCategory,
    pub distance_m: Option<f64>,
}

impl LayerDistance {
    /// Key in the serialized map, e.g. `metro_m`.
    pub fn key(&self) -> String {
        format!("{}_m", self.category.nearby_key())
    }
}

/// Stored nearest distances of one listing. Only layers enabled at compute
/// time are present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestDistances {
    pub listing_id: i64,
    #[serde(serialize_with = "serialize_layers")]
    pub distances: Vec<LayerDistance>,
    #[serde(with = "time::serde::rfc3339")]
    pub computed_at: OffsetDateTime,
}

impl NearestDistances {
    pub fn get(&self, category: AmenityCategory) -> Option<Option<f64>> {
        self.distances
            .iter()
            .find(|layer| layer.category == category)
            .map(|layer| layer.distance_m)
    }
}

fn serialize_layers<S: serde::Serializer>(
    layers: &[LayerDistance],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(layers.len()))?;
    for layer in layers {
        map.serialize_entry(&layer.key(), &layer.distance_m)?;
    }
    map.end()
}
