pub mod airport_repo;
pub mod app_config;
pub mod crew_repo;
pub mod database;
pub mod fleet_repo;
pub mod flight_repo;
pub mod order_repo;
pub mod paging;
pub mod redis_repo;
pub mod route_repo;
pub mod user_repo;

pub use database::DbClient;
pub use redis_repo::RedisClient;
