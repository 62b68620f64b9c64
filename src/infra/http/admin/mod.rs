mod amenities;
mod cache;
mod config;
mod distances;
mod health;
mod listings;
mod state;

pub use state::AdminState;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use super::middleware::{log_responses, set_request_context};

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/listings", post(listings::create_listing))
        .route(
            "/admin/listings/{id}",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route("/admin/amenities/{category}", post(amenities::create_amenity))
        .route(
            "/admin/amenities/{category}/{id}",
            get(amenities::get_amenity)
                .put(amenities::update_amenity)
                .delete(amenities::delete_amenity),
        )
        .route("/admin/proximity", delete(cache::invalidate_all))
        .route("/admin/proximity/recompute", post(cache::recompute))
        .route("/admin/proximity/{listing_id}", delete(cache::invalidate_listing))
        .route(
            "/admin/config/display",
            get(config::get_display).put(config::put_display),
        )
        .route(
            "/admin/config/nearby",
            get(config::get_nearby).put(config::put_nearby),
        )
        .route(
            "/admin/config/map-generation",
            get(config::get_map_generation).put(config::put_map_generation),
        )
        .route("/admin/distances/update", post(distances::update))
        .route("/_health/db", get(health::admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}
