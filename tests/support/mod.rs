#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use konut::application::distances::NearestDistanceService;
use konut::application::proximity::ProximityCacheService;
use konut::application::repos::{
    AmenitiesWriteRepo, ConfigRepo, CreateAmenityParams, CreateListingParams, HealthRepo,
    ListingsRepo, ListingsWriteRepo, NearestDistanceRepo, ProximityCacheRepo, RepoError,
    SpatialRepo, UpdateAmenityParams, UpdateListingParams, UpsertOutcome,
};
use konut::domain::distances::{LayerDistance, NearestDistances};
use konut::domain::entities::{
    AmenityDistance, AmenityRecord, DisplayConfigRecord, ListingImageRecord, ListingRecord,
    MapGenerationConfigRecord, NearbyAmenity, NearbyAmenityConfigRecord,
};
use konut::domain::proximity::ProximityCacheRecord;
use konut::domain::types::{AmenityCategory, GeoPoint};

const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Taksim square; every fixture point is placed relative to it.
pub const ORIGIN: GeoPoint = GeoPoint {
    lon: 28.9869,
    lat: 41.0369,
};

pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Point `meters` due north of `base`. Exact under the haversine metric.
pub fn north_of(base: GeoPoint, meters: f64) -> GeoPoint {
    GeoPoint {
        lon: base.lon,
        lat: base.lat + (meters / EARTH_RADIUS_M).to_degrees(),
    }
}

#[derive(Default)]
struct State {
    listings: BTreeMap<i64, ListingRecord>,
    images: Vec<ListingImageRecord>,
    amenities: BTreeMap<(AmenityCategory, i64), AmenityRecord>,
    display: Option<DisplayConfigRecord>,
    nearby: Option<NearbyAmenityConfigRecord>,
    map_generation: Option<MapGenerationConfigRecord>,
    cache: BTreeMap<i64, ProximityCacheRecord>,
    distances: BTreeMap<i64, NearestDistances>,
    next_listing_id: i64,
    next_amenity_id: BTreeMap<AmenityCategory, i64>,
}

/// In-memory stand-in for every repository trait.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    failing_category: std::sync::Mutex<Option<AmenityCategory>>,
    fail_upserts: std::sync::atomic::AtomicBool,
    pub nearest_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn add_listing(&self, id: i64, location: Option<GeoPoint>) -> ListingRecord {
        let now = OffsetDateTime::now_utc();
        let record = ListingRecord {
            id,
            title: format!("Listing {id}"),
            price: 1_000_000 + id,
            size_sqm: 90,
            location,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().await;
        state.next_listing_id = state.next_listing_id.max(id);
        state.listings.insert(id, record.clone());
        record
    }

    pub async fn add_image(&self, listing_id: i64, id: i64, url: &str, is_primary: bool) {
        self.state.lock().await.images.push(ListingImageRecord {
            id,
            listing_id,
            url: url.to_string(),
            title: None,
            sort_order: 0,
            is_primary,
        });
    }

    pub async fn add_amenity(
        &self,
        category: AmenityCategory,
        id: i64,
        name: &str,
        location: GeoPoint,
    ) -> AmenityRecord {
        let now = OffsetDateTime::now_utc();
        let record = AmenityRecord {
            id,
            category,
            name: name.to_string(),
            location,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().await;
        let next = state.next_amenity_id.entry(category).or_insert(0);
        *next = (*next).max(id);
        state.amenities.insert((category, id), record.clone());
        record
    }

    pub async fn set_display(&self, config: DisplayConfigRecord) {
        self.state.lock().await.display = Some(config);
    }

    pub async fn set_nearby(&self, config: NearbyAmenityConfigRecord) {
        self.state.lock().await.nearby = Some(config);
    }

    pub async fn set_map_generation(&self, config: MapGenerationConfigRecord) {
        self.state.lock().await.map_generation = Some(config);
    }

    /// Backdate a listing so it sorts behind fresher ones.
    pub async fn set_updated_at(&self, listing_id: i64, updated_at: OffsetDateTime) {
        if let Some(listing) = self.state.lock().await.listings.get_mut(&listing_id) {
            listing.updated_at = updated_at;
        }
    }

    pub async fn stored_distances(&self, listing_id: i64) -> Option<NearestDistances> {
        self.state.lock().await.distances.get(&listing_id).cloned()
    }

    pub async fn cached(&self, listing_id: i64) -> Option<ProximityCacheRecord> {
        self.state.lock().await.cache.get(&listing_id).cloned()
    }

    pub async fn cache_len(&self) -> usize {
        self.state.lock().await.cache.len()
    }

    /// Make every spatial query against `category` fail.
    pub fn fail_category(&self, category: Option<AmenityCategory>) {
        if let Ok(mut slot) = self.failing_category.lock() {
            *slot = category;
        }
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn nearest_calls(&self) -> usize {
        self.nearest_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    fn check_category(&self, category: AmenityCategory) -> Result<(), RepoError> {
        let failing = self
            .failing_category
            .lock()
            .map(|slot| *slot)
            .unwrap_or(None);
        if failing == Some(category) {
            return Err(RepoError::Timeout);
        }
        Ok(())
    }

    async fn ranked(&self, category: AmenityCategory, point: GeoPoint) -> Vec<(f64, AmenityRecord)> {
        let state = self.state.lock().await;
        let mut rows: Vec<(f64, AmenityRecord)> = state
            .amenities
            .values()
            .filter(|amenity| amenity.category == category)
            .map(|amenity| (haversine_m(point, amenity.location), amenity.clone()))
            .collect();
        rows.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));
        rows
    }
}

fn nearby_row(distance_m: f64, amenity: AmenityRecord) -> NearbyAmenity {
    NearbyAmenity {
        id: amenity.id,
        name: amenity.name,
        distance_m,
        lat: amenity.location.lat,
        lng: amenity.location.lon,
    }
}

#[async_trait]
impl ListingsRepo for MemoryStore {
    async fn list_listings(&self, limit: Option<u32>) -> Result<Vec<ListingRecord>, RepoError> {
        let state = self.state.lock().await;
        let take = limit.map(|value| value as usize).unwrap_or(usize::MAX);
        Ok(state.listings.values().take(take).cloned().collect())
    }

    async fn find_listing(&self, id: i64) -> Result<Option<ListingRecord>, RepoError> {
        Ok(self.state.lock().await.listings.get(&id).cloned())
    }

    async fn list_images(&self, listing_id: i64) -> Result<Vec<ListingImageRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut images: Vec<ListingImageRecord> = state
            .images
            .iter()
            .filter(|image| image.listing_id == listing_id)
            .cloned()
            .collect();
        images.sort_by(|a, b| {
            b.is_primary
                .cmp(&a.is_primary)
                .then(a.sort_order.cmp(&b.sort_order))
                .then(a.id.cmp(&b.id))
        });
        Ok(images)
    }
}

#[async_trait]
impl ListingsWriteRepo for MemoryStore {
    async fn create_listing(
        &self,
        params: CreateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let mut state = self.state.lock().await;
        state.next_listing_id += 1;
        let record = ListingRecord {
            id: state.next_listing_id,
            title: params.title,
            price: params.price,
            size_sqm: params.size_sqm,
            location: params.location,
            created_at: now,
            updated_at: now,
        };
        state.listings.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_listing(
        &self,
        params: UpdateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = state.listings.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        record.title = params.title;
        record.price = params.price;
        record.size_sqm = params.size_sqm;
        record.location = params.location;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn delete_listing(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        state.listings.remove(&id).ok_or(RepoError::NotFound)?;
        // Mirrors ON DELETE CASCADE.
        state.cache.remove(&id);
        state.distances.remove(&id);
        state.images.retain(|image| image.listing_id != id);
        Ok(())
    }
}

#[async_trait]
impl SpatialRepo for MemoryStore {
    async fn nearest(
        &self,
        category: AmenityCategory,
        point: GeoPoint,
        k: u32,
    ) -> Result<Vec<AmenityDistance>, RepoError> {
        self.nearest_calls.fetch_add(1, Ordering::SeqCst);
        self.check_category(category)?;
        Ok(self
            .ranked(category, point)
            .await
            .into_iter()
            .take(k as usize)
            .map(|(distance_m, amenity)| AmenityDistance {
                id: amenity.id,
                distance_m,
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
        self.check_category(category)?;
        Ok(self
            .ranked(category, point)
            .await
            .into_iter()
            .filter(|(distance_m, _)| *distance_m <= radius_m)
            .take(limit as usize)
            .map(|(distance_m, amenity)| nearby_row(distance_m, amenity))
            .collect())
    }

    async fn closest(
        &self,
        category: AmenityCategory,
        point: GeoPoint,
    ) -> Result<Option<NearbyAmenity>, RepoError> {
        self.check_category(category)?;
        Ok(self
            .ranked(category, point)
            .await
            .into_iter()
            .next()
            .map(|(distance_m, amenity)| nearby_row(distance_m, amenity)))
    }
}

#[async_trait]
impl AmenitiesWriteRepo for MemoryStore {
    async fn find_amenity(
        &self,
        category: AmenityCategory,
        id: i64,
    ) -> Result<Option<AmenityRecord>, RepoError> {
        Ok(self.state.lock().await.amenities.get(&(category, id)).cloned())
    }

    async fn create_amenity(
        &self,
        params: CreateAmenityParams,
    ) -> Result<AmenityRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let mut state = self.state.lock().await;
        let next = state.next_amenity_id.entry(params.category).or_insert(0);
        *next += 1;
        let record = AmenityRecord {
            id: *next,
            category: params.category,
            name: params.name,
            location: params.location,
            created_at: now,
            updated_at: now,
        };
        state
            .amenities
            .insert((record.category, record.id), record.clone());
        Ok(record)
    }

    async fn update_amenity(
        &self,
        params: UpdateAmenityParams,
    ) -> Result<AmenityRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = state
            .amenities
            .get_mut(&(params.category, params.id))
            .ok_or(RepoError::NotFound)?;
        record.name = params.name;
        record.location = params.location;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn delete_amenity(&self, category: AmenityCategory, id: i64) -> Result<(), RepoError> {
        self.state
            .lock()
            .await
            .amenities
            .remove(&(category, id))
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ConfigRepo for MemoryStore {
    async fn load_display_config(&self) -> Result<DisplayConfigRecord, RepoError> {
        let mut state = self.state.lock().await;
        Ok(state.display.get_or_insert_with(Default::default).clone())
    }

    async fn upsert_display_config(
        &self,
        config: DisplayConfigRecord,
    ) -> Result<DisplayConfigRecord, RepoError> {
        self.state.lock().await.display = Some(config.clone());
        Ok(config)
    }

    async fn load_nearby_config(&self) -> Result<NearbyAmenityConfigRecord, RepoError> {
        let mut state = self.state.lock().await;
        Ok(state.nearby.get_or_insert_with(Default::default).clone())
    }

    async fn upsert_nearby_config(
        &self,
        config: NearbyAmenityConfigRecord,
    ) -> Result<NearbyAmenityConfigRecord, RepoError> {
        self.state.lock().await.nearby = Some(config.clone());
        Ok(config)
    }

    async fn load_map_generation_config(&self) -> Result<MapGenerationConfigRecord, RepoError> {
        let mut state = self.state.lock().await;
        Ok(state.map_generation.get_or_insert_with(Default::default).clone())
    }

    async fn upsert_map_generation_config(
        &self,
        config: MapGenerationConfigRecord,
    ) -> Result<MapGenerationConfigRecord, RepoError> {
        self.state.lock().await.map_generation = Some(config.clone());
        Ok(config)
    }
}

#[async_trait]
impl NearestDistanceRepo for MemoryStore {
    async fn replace_distances(
        &self,
        listing_id: i64,
        distances: &[LayerDistance],
    ) -> Result<NearestDistances, RepoError> {
        let mut state = self.state.lock().await;
        if !state.listings.contains_key(&listing_id) {
            return Err(RepoError::Integrity {
                message: format!("listing {listing_id} does not exist"),
            });
        }

        let mut layers = distances.to_vec();
        layers.sort_by_key(|layer| layer.category);
        let record = NearestDistances {
            listing_id,
            distances: layers,
            computed_at: OffsetDateTime::now_utc(),
        };
        state.distances.insert(listing_id, record.clone());
        Ok(record)
    }

    async fn find_distances(
        &self,
        listing_id: i64,
    ) -> Result<Option<NearestDistances>, RepoError> {
        Ok(self
            .state
            .lock()
            .await
            .distances
            .get(&listing_id)
            .filter(|record| !record.distances.is_empty())
            .cloned())
    }
}

#[async_trait]
impl ProximityCacheRepo for MemoryStore {
    async fn find(&self, listing_id: i64) -> Result<Option<ProximityCacheRecord>, RepoError> {
        Ok(self.state.lock().await.cache.get(&listing_id).cloned())
    }

    async fn upsert(
        &self,
        listing_id: i64,
        grocery_ids: &[i64],
        clothing_ids: &[i64],
    ) -> Result<UpsertOutcome, RepoError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("disk full"));
        }

        let now = OffsetDateTime::now_utc();
        let mut state = self.state.lock().await;
        if !state.listings.contains_key(&listing_id) {
            return Err(RepoError::Integrity {
                message: format!("listing {listing_id} does not exist"),
            });
        }

        let created = !state.cache.contains_key(&listing_id);
        let computed_at = state
            .cache
            .get(&listing_id)
            .map(|row| row.computed_at)
            .unwrap_or(now);
        let record = ProximityCacheRecord {
            listing_id,
            grocery_ids: grocery_ids.to_vec(),
            clothing_ids: clothing_ids.to_vec(),
            computed_at,
            updated_at: now,
        };
        state.cache.insert(listing_id, record.clone());
        Ok(UpsertOutcome { record, created })
    }

    async fn delete(&self, listing_id: i64) -> Result<bool, RepoError> {
        Ok(self.state.lock().await.cache.remove(&listing_id).is_some())
    }

    async fn delete_all(&self) -> Result<u64, RepoError> {
        let mut state = self.state.lock().await;
        let removed = state.cache.len() as u64;
        state.cache.clear();
        Ok(removed)
    }

    async fn count(&self) -> Result<u64, RepoError> {
        Ok(self.state.lock().await.cache.len() as u64)
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub fn proximity_service(store: &Arc<MemoryStore>) -> Arc<ProximityCacheService> {
    Arc::new(ProximityCacheService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    ))
}

pub fn distance_service(store: &Arc<MemoryStore>) -> Arc<NearestDistanceService> {
    Arc::new(NearestDistanceService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    ))
}

pub fn display_with_limits(grocery: i32, clothing: i32) -> DisplayConfigRecord {
    DisplayConfigRecord {
        closest_grocery_stores: grocery,
        closest_clothing_stores: clothing,
        ..DisplayConfigRecord::default()
    }
}
