use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{ConfigRepo, RepoError},
    domain::entities::{
        DisplayConfigRecord, LayerSearch, MapGenerationConfigRecord, NearbyAmenityConfigRecord,
    },
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct DisplayConfigRow {
    max_listings: i32,
    closest_grocery_stores: i32,
    closest_clothing_stores: i32,
    max_grocery_stores: i32,
    max_clothing_stores: i32,
    max_metro_stations: i32,
    updated_at: OffsetDateTime,
}

impl From<DisplayConfigRow> for DisplayConfigRecord {
    fn from(row: DisplayConfigRow) -> Self {
        Self {
            max_listings: row.max_listings,
            closest_grocery_stores: row.closest_grocery_stores,
            closest_clothing_stores: row.closest_clothing_stores,
            max_grocery_stores: row.max_grocery_stores,
            max_clothing_stores: row.max_clothing_stores,
            max_metro_stations: row.max_metro_stations,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NearbyConfigRow {
    radius_m: i32,
    max_results: i32,
    enable_metro: bool,
    enable_metrobus: bool,
    enable_bus: bool,
    enable_taxi: bool,
    enable_grocery: bool,
    enable_clothing: bool,
    enable_malls: bool,
    enable_parks: bool,
    enable_schools: bool,
    updated_at: OffsetDateTime,
}

impl From<NearbyConfigRow> for NearbyAmenityConfigRecord {
    fn from(row: NearbyConfigRow) -> Self {
        Self {
            radius_m: row.radius_m,
            max_results: row.max_results,
            enable_metro: row.enable_metro,
            enable_metrobus: row.enable_metrobus,
            enable_bus: row.enable_bus,
            enable_taxi: row.enable_taxi,
            enable_grocery: row.enable_grocery,
            enable_clothing: row.enable_clothing,
            enable_malls: row.enable_malls,
            enable_parks: row.enable_parks,
            enable_schools: row.enable_schools,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MapGenerationConfigRow {
    enable_metro: bool,
    radius_metro: i32,
    max_metro: i32,
    enable_metrobus: bool,
    radius_metrobus: i32,
    max_metrobus: i32,
    enable_bus: bool,
    radius_bus: i32,
    max_bus: i32,
    enable_grocery: bool,
    radius_grocery: i32,
    max_grocery: i32,
    enable_clothing: bool,
    radius_clothing: i32,
    max_clothing: i32,
    enable_malls: bool,
    radius_malls: i32,
    max_malls: i32,
    enable_parks: bool,
    radius_parks: i32,
    max_parks: i32,
    enable_taxi: bool,
    radius_taxi: i32,
    max_taxi: i32,
    updated_at: OffsetDateTime,
}

fn layer(enabled: bool, radius_m: i32, max_results: i32) -> LayerSearch {
    LayerSearch {
        enabled,
        radius_m,
        max_results,
    }
}

impl From<MapGenerationConfigRow> for MapGenerationConfigRecord {
    fn from(row: MapGenerationConfigRow) -> Self {
        Self {
            metro: layer(row.enable_metro, row.radius_metro, row.max_metro),
            metrobus: layer(row.enable_metrobus, row.radius_metrobus, row.max_metrobus),
            bus: layer(row.enable_bus, row.radius_bus, row.max_bus),
            grocery: layer(row.enable_grocery, row.radius_grocery, row.max_grocery),
            clothing: layer(row.enable_clothing, row.radius_clothing, row.max_clothing),
            malls: layer(row.enable_malls, row.radius_malls, row.max_malls),
            parks: layer(row.enable_parks, row.radius_parks, row.max_parks),
            taxi: layer(row.enable_taxi, row.radius_taxi, row.max_taxi),
            updated_at: row.updated_at,
        }
    }
}

/// Column stems of `map_generation_config`, in bind order.
const MAP_LAYERS: [&str; 8] = [
    "metro", "metrobus", "bus", "grocery", "clothing", "malls", "parks", "taxi",
];

fn map_generation_columns() -> String {
    let mut columns: Vec<String> = MAP_LAYERS
        .iter()
        .flat_map(|stem| {
            [
                format!("enable_{stem}"),
                format!("radius_{stem}"),
                format!("max_{stem}"),
            ]
        })
        .collect();
    columns.push("updated_at".to_string());
    columns.join(", ")
}

const DISPLAY_COLUMNS: &str = "max_listings, closest_grocery_stores, closest_clothing_stores, \
    max_grocery_stores, max_clothing_stores, max_metro_stations, updated_at";

const NEARBY_COLUMNS: &str = "radius_m, max_results, enable_metro, enable_metrobus, enable_bus, \
    enable_taxi, enable_grocery, enable_clothing, enable_malls, enable_parks, enable_schools, \
    updated_at";

#[async_trait]
impl ConfigRepo for PostgresRepositories {
    async fn load_display_config(&self) -> Result<DisplayConfigRecord, RepoError> {
        // Column defaults carry the initial values.
        sqlx::query("INSERT INTO display_config (id) VALUES (1) ON CONFLICT (id) DO NOTHING")
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let sql = format!("SELECT {DISPLAY_COLUMNS} FROM display_config WHERE id = 1");
        let row = sqlx::query_as::<_, DisplayConfigRow>(&sql)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(DisplayConfigRecord::from(row))
    }

    async fn upsert_display_config(
        &self,
        config: DisplayConfigRecord,
    ) -> Result<DisplayConfigRecord, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO display_config (
                id,
                max_listings,
                closest_grocery_stores,
                closest_clothing_stores,
                max_grocery_stores,
                max_clothing_stores,
                max_metro_stations,
                updated_at
            ) VALUES (1, $1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                max_listings = EXCLUDED.max_listings,
                closest_grocery_stores = EXCLUDED.closest_grocery_stores,
                closest_clothing_stores = EXCLUDED.closest_clothing_stores,
                max_grocery_stores = EXCLUDED.max_grocery_stores,
                max_clothing_stores = EXCLUDED.max_clothing_stores,
                max_metro_stations = EXCLUDED.max_metro_stations,
                updated_at = EXCLUDED.updated_at
            RETURNING {DISPLAY_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, DisplayConfigRow>(&sql)
            .bind(config.max_listings)
            .bind(config.closest_grocery_stores)
            .bind(config.closest_clothing_stores)
            .bind(config.max_grocery_stores)
            .bind(config.max_clothing_stores)
            .bind(config.max_metro_stations)
            .bind(config.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(DisplayConfigRecord::from(row))
    }

    async fn load_nearby_config(&self) -> Result<NearbyAmenityConfigRecord, RepoError> {
        sqlx::query(
            "INSERT INTO nearby_amenity_config (id) VALUES (1) ON CONFLICT (id) DO NOTHING",
        )
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let sql = format!("SELECT {NEARBY_COLUMNS} FROM nearby_amenity_config WHERE id = 1");
        let row = sqlx::query_as::<_, NearbyConfigRow>(&sql)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(NearbyAmenityConfigRecord::from(row))
    }

    async fn upsert_nearby_config(
        &self,
        config: NearbyAmenityConfigRecord,
    ) -> Result<NearbyAmenityConfigRecord, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO nearby_amenity_config (
                id,
                radius_m,
                max_results,
                enable_metro,
                enable_metrobus,
                enable_bus,
                enable_taxi,
                enable_grocery,
                enable_clothing,
                enable_malls,
                enable_parks,
                enable_schools,
                updated_at
            ) VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                radius_m = EXCLUDED.radius_m,
                max_results = EXCLUDED.max_results,
                enable_metro = EXCLUDED.enable_metro,
                enable_metrobus = EXCLUDED.enable_metrobus,
                enable_bus = EXCLUDED.enable_bus,
                enable_taxi = EXCLUDED.enable_taxi,
                enable_grocery = EXCLUDED.enable_grocery,
                enable_clothing = EXCLUDED.enable_clothing,
                enable_malls = EXCLUDED.enable_malls,
                enable_parks = EXCLUDED.enable_parks,
                enable_schools = EXCLUDED.enable_schools,
                updated_at = EXCLUDED.updated_at
            RETURNING {NEARBY_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, NearbyConfigRow>(&sql)
            .bind(config.radius_m)
            .bind(config.max_results)
            .bind(config.enable_metro)
            .bind(config.enable_metrobus)
            .bind(config.enable_bus)
            .bind(config.enable_taxi)
            .bind(config.enable_grocery)
            .bind(config.enable_clothing)
            .bind(config.enable_malls)
            .bind(config.enable_parks)
            .bind(config.enable_schools)
            .bind(config.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(NearbyAmenityConfigRecord::from(row))
    }

    async fn load_map_generation_config(&self) -> Result<MapGenerationConfigRecord, RepoError> {
        sqlx::query(
            "INSERT INTO map_generation_config (id) VALUES (1) ON CONFLICT (id) DO NOTHING",
        )
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let sql = format!(
            "SELECT {} FROM map_generation_config WHERE id = 1",
            map_generation_columns()
        );
        let row = sqlx::query_as::<_, MapGenerationConfigRow>(&sql)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(MapGenerationConfigRecord::from(row))
    }

    async fn upsert_map_generation_config(
        &self,
        config: MapGenerationConfigRecord,
    ) -> Result<MapGenerationConfigRecord, RepoError> {
        let columns = map_generation_columns();
        let placeholders: Vec<String> = (1..=columns.split(", ").count())
            .map(|index| format!("${index}"))
            .collect();
        let assignments: Vec<String> = columns
            .split(", ")
            .map(|column| format!("{column} = EXCLUDED.{column}"))
            .collect();
        let sql = format!(
            "INSERT INTO map_generation_config (id, {columns}) VALUES (1, {}) \
             ON CONFLICT (id) DO UPDATE SET {} RETURNING {columns}",
            placeholders.join(", "),
            assignments.join(", ")
        );

        let mut query = sqlx::query_as::<_, MapGenerationConfigRow>(&sql);
        for search in [
            config.metro,
            config.metrobus,
            config.bus,
            config.grocery,
            config.clothing,
            config.malls,
            config.parks,
            config.taxi,
        ] {
            query = query
                .bind(search.enabled)
                .bind(search.radius_m)
                .bind(search.max_results);
        }
        let row = query
            .bind(config.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(MapGenerationConfigRecord::from(row))
    }
}
