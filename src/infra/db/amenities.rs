use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{
        AmenitiesWriteRepo, CreateAmenityParams, RepoError, SpatialRepo, UpdateAmenityParams,
    },
    domain::{
        entities::{AmenityDistance, AmenityRecord, NearbyAmenity},
        types::{AmenityCategory, GeoPoint},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

// Table names come from `AmenityCategory::table_name`, never from input.

#[derive(sqlx::FromRow)]
struct DistanceRow {
    id: i64,
    distance_m: f64,
}

#[derive(sqlx::FromRow)]
struct NearbyRow {
    id: i64,
    name: String,
    distance_m: f64,
    lon: f64,
    lat: f64,
}

impl From<NearbyRow> for NearbyAmenity {
    fn from(row: NearbyRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            distance_m: row.distance_m,
            lat: row.lat,
            lng: row.lon,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AmenityRow {
    id: i64,
    name: String,
    lon: f64,
    lat: f64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl AmenityRow {
    fn into_record(self, category: AmenityCategory) -> AmenityRecord {
        AmenityRecord {
            id: self.id,
            category,
            name: self.name,
            location: GeoPoint {
                lon: self.lon,
                lat: self.lat,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const AMENITY_COLUMNS: &str = "id, name, \
    ST_X(location::geometry) AS lon, ST_Y(location::geometry) AS lat, \
    created_at, updated_at";

fn nearby_sql(category: AmenityCategory, radius_filter: bool) -> String {
    let (filter, limit) = if radius_filter {
        ("WHERE ST_DWithin(location, origin.geog, $3)", "$4")
    } else {
        ("", "$3")
    };
    format!(
        r#"
        WITH origin AS (
            SELECT ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography AS geog
        )
        SELECT id,
               name,
               ST_Distance(location, origin.geog) AS distance_m,
               ST_X(location::geometry) AS lon,
               ST_Y(location::geometry) AS lat
        FROM {table}, origin
        {filter}
        ORDER BY distance_m, id
        LIMIT {limit}
        "#,
        table = category.table_name(),
    )
}

#[async_trait]
impl SpatialRepo for PostgresRepositories {
    async fn nearest(
        &self,
        category: AmenityCategory,
        point: GeoPoint,
        k: u32,
    ) -> Result<Vec<AmenityDistance>, RepoError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"
            SELECT id,
                   ST_Distance(location, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography)
                       AS distance_m
            FROM {table}
            ORDER BY distance_m, id
            LIMIT $3
            "#,
            table = category.table_name(),
        );
        let rows = sqlx::query_as::<_, DistanceRow>(&sql)
            .bind(point.lon)
            .bind(point.lat)
            .bind(i64::from(k))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| AmenityDistance {
                id: row.id,
                distance_m: row.distance_m,
            })
            .collect())
    }

    async fn within_radius(
        &self,
        category: AmenityCategory,
        point: GeoPoint,
        radius_m: f64,
        limit: u32,
    ) -> Result<Vec<NearbyAmenity>, RepoError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let sql = nearby_sql(category, true);
        let rows = sqlx::query_as::<_, NearbyRow>(&sql)
            .bind(point.lon)
            .bind(point.lat)
            .bind(radius_m)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(NearbyAmenity::from).collect())
    }

    async fn closest(
        &self,
        category: AmenityCategory,
        point: GeoPoint,
    ) -> Result<Option<NearbyAmenity>, RepoError> {
        let sql = nearby_sql(category, false);
        let row = sqlx::query_as::<_, NearbyRow>(&sql)
            .bind(point.lon)
            .bind(point.lat)
            .bind(1_i64)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(NearbyAmenity::from))
    }
}

#[async_trait]
impl AmenitiesWriteRepo for PostgresRepositories {
    async fn find_amenity(
        &self,
        category: AmenityCategory,
        id: i64,
    ) -> Result<Option<AmenityRecord>, RepoError> {
        let sql = format!(
            "SELECT {AMENITY_COLUMNS} FROM {table} WHERE id = $1",
            table = category.table_name()
        );
        let row = sqlx::query_as::<_, AmenityRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|row| row.into_record(category)))
    }

    async fn create_amenity(
        &self,
        params: CreateAmenityParams,
    ) -> Result<AmenityRecord, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO {table} (name, location)
            VALUES ($1, ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography)
            RETURNING {AMENITY_COLUMNS}
            "#,
            table = params.category.table_name()
        );
        let row = sqlx::query_as::<_, AmenityRow>(&sql)
            .bind(&params.name)
            .bind(params.location.lon)
            .bind(params.location.lat)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into_record(params.category))
    }

    async fn update_amenity(
        &self,
        params: UpdateAmenityParams,
    ) -> Result<AmenityRecord, RepoError> {
        let sql = format!(
            r#"
            UPDATE {table}
            SET name = $2,
                location = ST_SetSRID(ST_MakePoint($3, $4), 4326)::geography,
                updated_at = now()
            WHERE id = $1
            RETURNING {AMENITY_COLUMNS}
            "#,
            table = params.category.table_name()
        );
        let row = sqlx::query_as::<_, AmenityRow>(&sql)
            .bind(params.id)
            .bind(&params.name)
            .bind(params.location.lon)
            .bind(params.location.lat)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(|row| row.into_record(params.category))
            .ok_or(RepoError::NotFound)
    }

    async fn delete_amenity(&self, category: AmenityCategory, id: i64) -> Result<(), RepoError> {
        let sql = format!("DELETE FROM {table} WHERE id = $1", table = category.table_name());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
