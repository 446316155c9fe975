use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{fleet::Airplane, CoreError, CoreResult};

/// Bookings close this long before departure; later requests are refused
/// because the passenger cannot realistically board.
pub const BOARDING_CUTOFF_MINUTES: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub order_id: Uuid,
    pub row: i32,
    pub seat: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn seat_number(&self) -> String {
        format!("{}-{}", self.row, self.seat)
    }
}

/// One seat requested as part of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatRequest {
    pub flight_id: Uuid,
    pub row: i32,
    pub seat: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub tickets: Vec<SeatRequest>,
}

pub fn validate_seat_position(row: i32, seat: i32, airplane: &Airplane) -> CoreResult<()> {
    for (value, max_value, field) in [
        (row, airplane.rows, "row"),
        (seat, airplane.seats_in_row, "seat"),
    ] {
        if !(1..=max_value).contains(&value) {
            return Err(CoreError::ValidationError(format!(
                "{} must be between 1 and {}",
                field, max_value
            )));
        }
    }
    Ok(())
}

pub fn validate_departure_window(
    departure_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if departure_time <= now {
        return Err(CoreError::ValidationError(
            "Cannot create ticket. Flight has already departed".to_string(),
        ));
    }
    if departure_time <= now + Duration::minutes(BOARDING_CUTOFF_MINUTES) {
        return Err(CoreError::ValidationError(format!(
            "Flight departs in less than {} minutes; not enough time to board",
            BOARDING_CUTOFF_MINUTES
        )));
    }
    Ok(())
}

/// Pre-flight checks for a whole order: positions within the seat grid and
/// no duplicate seat inside the request itself. Cross-request duplicates
/// are left to the database constraint.
pub fn validate_seat_requests(requests: &[SeatRequest], airplane: &Airplane) -> CoreResult<()> {
    if requests.is_empty() {
        return Err(CoreError::ValidationError(
            "An order must contain at least one ticket".to_string(),
        ));
    }
    for (i, req) in requests.iter().enumerate() {
        validate_seat_position(req.row, req.seat, airplane)?;
        for other in &requests[..i] {
            if other.flight_id == req.flight_id && other.row == req.row && other.seat == req.seat {
                return Err(CoreError::SeatTaken {
                    row: req.row,
                    seat: req.seat,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airplane() -> Airplane {
        Airplane {
            id: Uuid::new_v4(),
            name: "A320".to_string(),
            rows: 30,
            seats_in_row: 6,
            airplane_type_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn seat_position_must_fit_the_grid() {
        let plane = airplane();
        assert!(validate_seat_position(1, 1, &plane).is_ok());
        assert!(validate_seat_position(30, 6, &plane).is_ok());
        assert!(validate_seat_position(0, 1, &plane).is_err());
        assert!(validate_seat_position(31, 1, &plane).is_err());
        assert!(validate_seat_position(1, 7, &plane).is_err());
    }

    #[test]
    fn departed_flights_refuse_tickets() {
        let now = Utc::now();
        assert!(validate_departure_window(now - Duration::hours(1), now).is_err());
    }

    #[test]
    fn boarding_cutoff_applies() {
        let now = Utc::now();
        assert!(validate_departure_window(now + Duration::minutes(5), now).is_err());
        assert!(validate_departure_window(now + Duration::minutes(11), now).is_ok());
    }

    #[test]
    fn duplicate_seat_within_request_is_rejected() {
        let plane = airplane();
        let flight_id = Uuid::new_v4();
        let requests = vec![
            SeatRequest { flight_id, row: 3, seat: 4 },
            SeatRequest { flight_id, row: 3, seat: 4 },
        ];
        assert!(matches!(
            validate_seat_requests(&requests, &plane),
            Err(CoreError::SeatTaken { row: 3, seat: 4 })
        ));
    }

    #[test]
    fn empty_order_is_rejected() {
        assert!(validate_seat_requests(&[], &airplane()).is_err());
    }

    #[test]
    fn seat_number_formats_row_dash_seat() {
        let ticket = Ticket {
            id: Uuid::new_v4(),
            flight_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            row: 12,
            seat: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(ticket.seat_number(), "12-3");
    }
}
