pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod redis_repo;

pub use app_config::Config;
pub use booking_repo::{PgBookingRepository, PgTripRepository};
pub use database::DbClient;
pub use redis_repo::RedisClient;
