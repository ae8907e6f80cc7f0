use std::sync::Arc;

use reserva_core::policy::BookingPolicy;
use reserva_core::repository::{AvailabilityRepository, BookingRepository, ResourceRepository};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub resources: Arc<dyn ResourceRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub schedules: Arc<dyn AvailabilityRepository>,
    pub auth: AuthConfig,
    pub policy: BookingPolicy,
}
