pub mod app_config;
pub mod availability_repo;
pub mod booking_repo;
pub mod database;
pub mod resource_repo;

pub use availability_repo::PgAvailabilityRepository;
pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use resource_repo::PgResourceRepository;
