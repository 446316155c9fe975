use std::sync::Arc;

use skyport_core::repository::{BookingRepository, FlightRepository};
use skyport_store::airport_repo::AirportRepository;
use skyport_store::crew_repo::CrewRepository;
use skyport_store::fleet_repo::FleetRepository;
use skyport_store::flight_repo::PostgresFlightRepository;
use skyport_store::order_repo::PostgresOrderRepository;
use skyport_store::route_repo::RouteRepository;
use skyport_store::user_repo::UserRepository;
use skyport_store::{DbClient, RedisClient};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub access_seconds: u64,
    pub refresh_seconds: u64,
}

#[derive(Clone)]
pub struct RateLimit {
    pub requests: i64,
    pub window_seconds: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbClient>,
    pub redis: Arc<RedisClient>,
    pub airports: Arc<AirportRepository>,
    pub fleet: Arc<FleetRepository>,
    pub crew: Arc<CrewRepository>,
    pub routes: Arc<RouteRepository>,
    pub flights: Arc<PostgresFlightRepository>,
    pub orders: Arc<PostgresOrderRepository>,
    pub flight_repo: Arc<dyn FlightRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub users: Arc<UserRepository>,
    pub auth: AuthConfig,
    pub cache_ttl_seconds: u64,
    pub rate_limit: RateLimit,
}

impl AppState {
    pub fn new(db: Arc<DbClient>, redis: Arc<RedisClient>, auth: AuthConfig, cache_ttl_seconds: u64, rate_limit: RateLimit) -> Self {
        let pool = db.pool.clone();
        let flights = Arc::new(PostgresFlightRepository::new(pool.clone()));
        let orders = Arc::new(PostgresOrderRepository::new(pool.clone()));

        Self {
            airports: Arc::new(AirportRepository::new(pool.clone())),
            fleet: Arc::new(FleetRepository::new(pool.clone())),
            crew: Arc::new(CrewRepository::new(pool.clone())),
            routes: Arc::new(RouteRepository::new(pool.clone())),
            flight_repo: flights.clone(),
            booking_repo: orders.clone(),
            flights,
            orders,
            users: Arc::new(UserRepository::new(pool)),
            db,
            redis,
            auth,
            cache_ttl_seconds,
            rate_limit,
        }
    }
}
