use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{ProximityCacheRepo, RepoError, UpsertOutcome},
    domain::proximity::ProximityCacheRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ProximityCacheRow {
    listing_id: i64,
    grocery_ids: Vec<i64>,
    clothing_ids: Vec<i64>,
    computed_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ProximityCacheRow> for ProximityCacheRecord {
    fn from(row: ProximityCacheRow) -> Self {
        Self {
            listing_id: row.listing_id,
            grocery_ids: row.grocery_ids,
            clothing_ids: row.clothing_ids,
            computed_at: row.computed_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    row: ProximityCacheRow,
    inserted: bool,
}

#[async_trait]
impl ProximityCacheRepo for PostgresRepositories {
    async fn find(&self, listing_id: i64) -> Result<Option<ProximityCacheRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProximityCacheRow>(
            r#"
            SELECT listing_id, grocery_ids, clothing_ids, computed_at, updated_at
            FROM proximity_cache
            WHERE listing_id = $1
            "#,
        )
        .bind(listing_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProximityCacheRecord::from))
    }

    async fn upsert(
        &self,
        listing_id: i64,
        grocery_ids: &[i64],
        clothing_ids: &[i64],
    ) -> Result<UpsertOutcome, RepoError> {
        // computed_at keeps the first computation time; updated_at moves on
        // every write. `xmax = 0` holds only for freshly inserted tuples.
        let row = sqlx::query_as::<_, UpsertRow>(
            r#"
            INSERT INTO proximity_cache (listing_id, grocery_ids, clothing_ids)
            VALUES ($1, $2, $3)
            ON CONFLICT (listing_id) DO UPDATE SET
                grocery_ids = EXCLUDED.grocery_ids,
                clothing_ids = EXCLUDED.clothing_ids,
                updated_at = now()
            RETURNING listing_id,
                      grocery_ids,
                      clothing_ids,
                      computed_at,
                      updated_at,
                      (xmax = 0) AS inserted
            "#,
        )
        .bind(listing_id)
        .bind(grocery_ids)
        .bind(clothing_ids)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(UpsertOutcome {
            record: ProximityCacheRecord::from(row.row),
            created: row.inserted,
        })
    }

    async fn delete(&self, listing_id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM proximity_cache WHERE listing_id = $1")
            .bind(listing_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM proximity_cache")
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM proximity_cache")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }
}
