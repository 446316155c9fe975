use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Longest great-circle distance between two airports is under 20,000 km.
pub const MAX_ROUTE_DISTANCE_KM: i32 = 20_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub source_id: Uuid,
    pub destination_id: Uuid,
    pub distance_km: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub route_id: Uuid,
    pub airplane_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn validate_route(source_id: Uuid, destination_id: Uuid, distance_km: i32) -> CoreResult<()> {
    if source_id == destination_id {
        return Err(CoreError::ValidationError(
            "Source and destination airports cannot be the same".to_string(),
        ));
    }
    if distance_km <= 0 {
        return Err(CoreError::ValidationError(
            "Distance must be positive".to_string(),
        ));
    }
    if distance_km > MAX_ROUTE_DISTANCE_KM {
        return Err(CoreError::ValidationError(format!(
            "Distance cannot exceed {} km",
            MAX_ROUTE_DISTANCE_KM
        )));
    }
    Ok(())
}

pub fn validate_flight_times(
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
) -> CoreResult<()> {
    if arrival_time <= departure_time {
        return Err(CoreError::ValidationError(
            "Arrival time must be after departure time".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn route_rejects_self_loop() {
        let a = Uuid::new_v4();
        assert!(validate_route(a, a, 500).is_err());
    }

    #[test]
    fn route_rejects_out_of_range_distance() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(validate_route(a, b, 0).is_err());
        assert!(validate_route(a, b, 20_001).is_err());
        assert!(validate_route(a, b, 20_000).is_ok());
    }

    #[test]
    fn flight_arrival_must_follow_departure() {
        let departure = Utc::now();
        assert!(validate_flight_times(departure, departure).is_err());
        assert!(validate_flight_times(departure, departure - Duration::hours(1)).is_err());
        assert!(validate_flight_times(departure, departure + Duration::hours(2)).is_ok());
    }
}
