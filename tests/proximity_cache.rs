mod support;

use std::num::NonZeroUsize;

use konut::application::proximity::{MAX_BATCH_CONCURRENCY, ProximityError};
use konut::domain::types::AmenityCategory;

use support::{MemoryStore, ORIGIN, display_with_limits, north_of, proximity_service};

async fn seed_stores(store: &MemoryStore) {
    store
        .add_amenity(AmenityCategory::Grocery, 1, "Migros", north_of(ORIGIN, 100.0))
        .await;
    store
        .add_amenity(AmenityCategory::Grocery, 2, "A101", north_of(ORIGIN, 300.0))
        .await;
    store
        .add_amenity(AmenityCategory::Grocery, 3, "BIM", north_of(ORIGIN, 50.0))
        .await;
    store
        .add_amenity(AmenityCategory::Clothing, 10, "LC Waikiki", north_of(ORIGIN, 700.0))
        .await;
    store
        .add_amenity(AmenityCategory::Clothing, 11, "Koton", north_of(ORIGIN, 200.0))
        .await;
}

#[tokio::test]
async fn two_nearest_groceries_are_ordered_by_distance() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    store.set_display(display_with_limits(2, 2)).await;
    let listing = store.add_listing(1, Some(ORIGIN)).await;
    let service = proximity_service(&store);

    let limits = service.load_limits().await.expect("limits");
    let record = service
        .compute_for_listing(&listing, limits)
        .await
        .expect("computed");

    assert_eq!(record.grocery_ids, vec![3, 1]);
    assert_eq!(record.clothing_ids, vec![11, 10]);
}

#[tokio::test]
async fn lists_are_truncated_to_available_stores() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    store.set_display(display_with_limits(20, 20)).await;
    let listing = store.add_listing(1, Some(ORIGIN)).await;
    let service = proximity_service(&store);

    let ids = service.get_cached(&listing).await.expect("ids");

    assert_eq!(ids.grocery_ids, vec![3, 1, 2]);
    assert_eq!(ids.clothing_ids, vec![11, 10]);
}

#[tokio::test]
async fn zero_limit_stores_empty_lists() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    store.set_display(display_with_limits(0, 1)).await;
    let listing = store.add_listing(1, Some(ORIGIN)).await;
    let service = proximity_service(&store);

    let ids = service.get_cached(&listing).await.expect("ids");

    assert!(ids.grocery_ids.is_empty());
    assert_eq!(ids.clothing_ids, vec![11]);
    assert_eq!(store.cache_len().await, 1);
}

#[tokio::test]
async fn recomputing_unchanged_data_is_idempotent() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    let listing = store.add_listing(1, Some(ORIGIN)).await;
    let service = proximity_service(&store);
    let limits = service.load_limits().await.expect("limits");

    let first = service
        .compute_for_listing(&listing, limits)
        .await
        .expect("first");
    let second = service
        .compute_for_listing(&listing, limits)
        .await
        .expect("second");

    assert_eq!(first.grocery_ids, second.grocery_ids);
    assert_eq!(first.clothing_ids, second.clothing_ids);
    assert_eq!(first.computed_at, second.computed_at);
    assert_eq!(store.cache_len().await, 1);
}

#[tokio::test]
async fn miss_computes_once_then_hits() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    let listing = store.add_listing(1, Some(ORIGIN)).await;
    let service = proximity_service(&store);

    let first = service.get_cached(&listing).await.expect("miss");
    assert_eq!(store.upsert_calls(), 1);
    assert_eq!(store.nearest_calls(), 2);

    let second = service.get_cached(&listing).await.expect("hit");
    assert_eq!(first, second);
    assert_eq!(store.upsert_calls(), 1);
    assert_eq!(store.nearest_calls(), 2);
}

#[tokio::test]
async fn stored_row_is_served_after_limits_change() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    store.set_display(display_with_limits(3, 2)).await;
    let listing = store.add_listing(1, Some(ORIGIN)).await;
    let service = proximity_service(&store);

    service.get_cached(&listing).await.expect("computed");
    store.set_display(display_with_limits(1, 1)).await;

    let ids = service.get_cached(&listing).await.expect("hit");
    assert_eq!(ids.grocery_ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn invalidate_forces_exactly_one_recompute() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    let listing = store.add_listing(1, Some(ORIGIN)).await;
    let service = proximity_service(&store);
    service.get_cached(&listing).await.expect("computed");

    assert!(service.invalidate(1).await.expect("invalidate"));
    assert!(!service.invalidate(1).await.expect("second invalidate"));
    assert!(store.cached(1).await.is_none());

    service.get_cached(&listing).await.expect("recomputed");
    service.get_cached(&listing).await.expect("hit");
    assert_eq!(store.upsert_calls(), 2);
}

#[tokio::test]
async fn invalidate_all_leaves_no_rows() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    for id in 1..=3 {
        store.add_listing(id, Some(north_of(ORIGIN, id as f64 * 10.0))).await;
    }
    let service = proximity_service(&store);
    let report = service
        .compute_all(NonZeroUsize::MIN)
        .await
        .expect("batch");
    assert_eq!(report.successful, 3);

    let removed = service.invalidate_all().await.expect("clear");

    assert_eq!(removed, 3);
    assert_eq!(service.cached_count().await.expect("count"), 0);
}

#[tokio::test]
async fn missing_location_writes_nothing() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    let listing = store.add_listing(7, None).await;
    let service = proximity_service(&store);

    let err = service.get_cached(&listing).await.expect_err("no point");

    assert!(matches!(
        err,
        ProximityError::MissingLocation { listing_id: 7 }
    ));
    assert_eq!(store.cache_len().await, 0);
    assert_eq!(store.nearest_calls(), 0);
}

#[tokio::test]
async fn spatial_failure_keeps_previous_row() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    let listing = store.add_listing(1, Some(ORIGIN)).await;
    let service = proximity_service(&store);
    let limits = service.load_limits().await.expect("limits");
    let before = service
        .compute_for_listing(&listing, limits)
        .await
        .expect("computed");

    store.fail_category(Some(AmenityCategory::Clothing));
    let err = service
        .compute_for_listing(&listing, limits)
        .await
        .expect_err("clothing down");

    assert!(matches!(
        err,
        ProximityError::SpatialQuery {
            category: AmenityCategory::Clothing,
            ..
        }
    ));
    assert_eq!(store.cached(1).await.expect("row kept"), before);
}

#[tokio::test]
async fn batch_reports_failures_by_listing() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    for id in 1..=5 {
        let location = (id != 3).then(|| north_of(ORIGIN, id as f64 * 25.0));
        store.add_listing(id, location).await;
    }
    let service = proximity_service(&store);

    let concurrency = NonZeroUsize::new(4).expect("non-zero");
    let report = service.compute_all(concurrency).await.expect("batch");

    assert_eq!(report.total, 5);
    assert_eq!(report.successful, 4);
    assert_eq!(report.failed, 1);
    assert!(report.has_failures());
    assert_eq!(report.errors, vec!["listing 3: listing has no location"]);
    assert_eq!(store.cache_len().await, 4);
    assert!(store.cached(3).await.is_none());
}

#[tokio::test]
async fn batch_over_empty_listing_table_succeeds() {
    let store = MemoryStore::new();
    let service = proximity_service(&store);

    let report = service
        .compute_all(NonZeroUsize::MIN)
        .await
        .expect("batch");

    assert_eq!(report.total, 0);
    assert_eq!(report.successful, 0);
    assert!(!report.has_failures());
}

#[tokio::test]
async fn storage_failure_surfaces_as_persistence_error() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    let listing = store.add_listing(1, Some(ORIGIN)).await;
    store.fail_upserts(true);
    let service = proximity_service(&store);

    let err = service.get_cached(&listing).await.expect_err("write fails");

    assert!(matches!(err, ProximityError::Persistence(_)));
    assert_eq!(store.cache_len().await, 0);
}

#[tokio::test]
async fn negative_display_limit_is_rejected() {
    let store = MemoryStore::new();
    store.set_display(display_with_limits(-1, 20)).await;
    let service = proximity_service(&store);

    let err = service.load_limits().await.expect_err("negative k");

    assert!(matches!(err, ProximityError::InvalidConfig(_)));
}

#[tokio::test]
async fn concurrent_misses_store_one_row_with_identical_ids() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    let listing = store.add_listing(1, Some(ORIGIN)).await;
    let service = proximity_service(&store);

    let (first, second) = tokio::join!(service.get_cached(&listing), service.get_cached(&listing));

    let first = first.expect("first reader");
    let second = second.expect("second reader");
    assert_eq!(first, second);
    assert_eq!(first.grocery_ids, vec![3, 1, 2]);
    assert_eq!(store.cache_len().await, 1);
}

#[tokio::test]
async fn batch_runs_on_a_spawned_task() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    for id in 1..=3 {
        store.add_listing(id, Some(north_of(ORIGIN, id as f64 * 20.0))).await;
    }
    let service = proximity_service(&store);

    let handle = tokio::spawn(async move {
        service
            .compute_all(NonZeroUsize::new(2).expect("non-zero"))
            .await
    });
    let report = handle.await.expect("task joined").expect("batch");

    assert_eq!(report.successful, 3);
    assert_eq!(store.cache_len().await, 3);
}

#[tokio::test]
async fn batch_concurrency_is_capped() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    store.add_listing(1, Some(ORIGIN)).await;
    let service = proximity_service(&store);

    let requested = NonZeroUsize::new(10_000).expect("non-zero");
    let report = service.compute_all(requested).await.expect("batch");

    assert_eq!(report.concurrency, MAX_BATCH_CONCURRENCY);
    assert_eq!(report.successful, 1);
}

#[tokio::test]
async fn batch_summary_lists_failures() {
    let store = MemoryStore::new();
    seed_stores(&store).await;
    store.set_display(display_with_limits(2, 1)).await;
    store.add_listing(1, Some(ORIGIN)).await;
    store.add_listing(2, None).await;
    let service = proximity_service(&store);

    let report = service.compute_all(NonZeroUsize::MIN).await.expect("batch");
    let summary = report.to_string();

    assert_eq!(report.limits.grocery, 2);
    assert_eq!(report.limits.clothing, 1);
    assert!(summary.starts_with("Proximity recompute finished in "));
    assert!(summary.contains("  listings:   2\n"));
    assert!(summary.contains("  successful: 1\n"));
    assert!(summary.contains("  failed:     1\n"));
    assert!(summary.ends_with("    - listing 2: listing has no location\n"));
}
