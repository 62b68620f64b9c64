use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{
        CreateListingParams, ListingsRepo, ListingsWriteRepo, RepoError, UpdateListingParams,
    },
    domain::entities::{ListingImageRecord, ListingRecord},
};

use super::{PostgresRepositories, map_sqlx_error, util::point_from_columns};

const LISTING_COLUMNS: &str = "id, title, price, size_sqm, \
    ST_X(location::geometry) AS lon, ST_Y(location::geometry) AS lat, \
    created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: i64,
    title: String,
    price: i64,
    size_sqm: i32,
    lon: Option<f64>,
    lat: Option<f64>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ListingRow> for ListingRecord {
    fn from(row: ListingRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            price: row.price,
            size_sqm: row.size_sqm,
            location: point_from_columns(row.lon, row.lat),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ListingImageRow {
    id: i64,
    listing_id: i64,
    url: String,
    title: Option<String>,
    sort_order: i32,
    is_primary: bool,
}

impl From<ListingImageRow> for ListingImageRecord {
    fn from(row: ListingImageRow) -> Self {
        Self {
            id: row.id,
            listing_id: row.listing_id,
            url: row.url,
            title: row.title,
            sort_order: row.sort_order,
            is_primary: row.is_primary,
        }
    }
}

#[async_trait]
impl ListingsRepo for PostgresRepositories {
    async fn list_listings(&self, limit: Option<u32>) -> Result<Vec<ListingRecord>, RepoError> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings ORDER BY id LIMIT $1");
        let rows = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(limit.map(i64::from))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ListingRecord::from).collect())
    }

    async fn find_listing(&self, id: i64) -> Result<Option<ListingRecord>, RepoError> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1");
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ListingRecord::from))
    }

    async fn list_images(&self, listing_id: i64) -> Result<Vec<ListingImageRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ListingImageRow>(
            r#"
            SELECT id, listing_id, url, title, sort_order, is_primary
            FROM listing_images
            WHERE listing_id = $1
            ORDER BY is_primary DESC, sort_order, id
            "#,
        )
        .bind(listing_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ListingImageRecord::from).collect())
    }
}

#[async_trait]
impl ListingsWriteRepo for PostgresRepositories {
    async fn create_listing(
        &self,
        params: CreateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO listings (title, price, size_sqm, location)
            VALUES (
                $1, $2, $3,
                CASE WHEN $4::float8 IS NULL THEN NULL
                     ELSE ST_SetSRID(ST_MakePoint($4, $5), 4326)::geography END
            )
            RETURNING {LISTING_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(params.title)
            .bind(params.price)
            .bind(params.size_sqm)
            .bind(params.location.map(|p| p.lon))
            .bind(params.location.map(|p| p.lat))
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(ListingRecord::from(row))
    }

    async fn update_listing(
        &self,
        params: UpdateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let sql = format!(
            r#"
            UPDATE listings
            SET title = $2,
                price = $3,
                size_sqm = $4,
                location = CASE WHEN $5::float8 IS NULL THEN NULL
                                ELSE ST_SetSRID(ST_MakePoint($5, $6), 4326)::geography END,
                updated_at = now()
            WHERE id = $1
            RETURNING {LISTING_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(params.id)
            .bind(params.title)
            .bind(params.price)
            .bind(params.size_sqm)
            .bind(params.location.map(|p| p.lon))
            .bind(params.location.map(|p| p.lat))
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ListingRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_listing(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
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
