use std::sync::Arc;

use crate::application::admin::{AdminAmenityService, AdminConfigService, AdminListingService};
use crate::application::distances::NearestDistanceService;
use crate::application::proximity::ProximityCacheService;
use crate::application::repos::HealthRepo;

#[derive(Clone)]
pub struct AdminState {
    pub listings: Arc<AdminListingService>,
    pub amenities: Arc<AdminAmenityService>,
    pub config: Arc<AdminConfigService>,
    pub proximity: Arc<ProximityCacheService>,
    pub distances: Arc<NearestDistanceService>,
    pub health: Arc<dyn HealthRepo>,
}
