//! Application services for the administrative surface.

pub mod amenities;
pub mod config;
pub mod listings;

pub use amenities::AdminAmenityService;
pub use config::AdminConfigService;
pub use listings::AdminListingService;
