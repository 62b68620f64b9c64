use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{NearestDistanceRepo, RepoError},
    domain::{
        distances::{LayerDistance, NearestDistances},
        types::AmenityCategory,
    },
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct LayerDistanceRow {
    layer: String,
    distance_m: Option<f64>,
    computed_at: OffsetDateTime,
}

fn sorted(mut distances: Vec<LayerDistance>) -> Vec<LayerDistance> {
    distances.sort_by_key(|layer| layer.category);
    distances
}

#[async_trait]
impl NearestDistanceRepo for PostgresRepositories {
    async fn replace_distances(
        &self,
        listing_id: i64,
        distances: &[LayerDistance],
    ) -> Result<NearestDistances, RepoError> {
        let computed_at = OffsetDateTime::now_utc();
        let layers: Vec<String> = distances
            .iter()
            .map(|layer| layer.category.as_str().to_string())
            .collect();
        let values: Vec<Option<f64>> = distances.iter().map(|layer| layer.distance_m).collect();

        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM listing_nearest_distances WHERE listing_id = $1")
            .bind(listing_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO listing_nearest_distances (listing_id, layer, distance_m, computed_at)
            SELECT $1, layer, distance_m, $4
            FROM UNNEST($2::TEXT[], $3::DOUBLE PRECISION[]) AS t(layer, distance_m)
            "#,
        )
        .bind(listing_id)
        .bind(&layers)
        .bind(&values)
        .bind(computed_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(NearestDistances {
            listing_id,
            distances: sorted(distances.to_vec()),
            computed_at,
        })
    }

    async fn find_distances(
        &self,
        listing_id: i64,
    ) -> Result<Option<NearestDistances>, RepoError> {
        let rows = sqlx::query_as::<_, LayerDistanceRow>(
            r#"
            SELECT layer, distance_m, computed_at
            FROM listing_nearest_distances
            WHERE listing_id = $1
            "#,
        )
        .bind(listing_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let Some(computed_at) = rows.iter().map(|row| row.computed_at).max() else {
            return Ok(None);
        };

        let distances = rows
            .into_iter()
            .map(|row| {
                let category = AmenityCategory::try_from(row.layer.as_str()).map_err(|err| {
                    RepoError::Integrity {
                        message: err.to_string(),
                    }
                })?;
                Ok(LayerDistance {
                    category,
                    distance_m: row.distance_m,
                })
            })
            .collect::<Result<Vec<_>, RepoError>>()?;

        Ok(Some(NearestDistances {
            listing_id,
            distances: sorted(distances),
            computed_at,
        }))
    }
}
